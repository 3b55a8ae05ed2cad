use async_graphql::dynamic::TypeRef;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use super::{BuildField, ResolveField, describe, resolved_field, scalar, shared_form};
use crate::gql::error::{GqlError, input_error, type_error};
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Node, Record, Resolved};
use crate::gql::schema::Catalog;
use crate::source::DataSource;
use crate::tpl::{DatetimeField, FieldKind};

const FORM: &str = "DatetimeField";

/// Whether a string is an RFC 3339 datetime, a local datetime, or a plain date.
fn is_datetime(value: &str) -> bool {
	DateTime::parse_from_rfc3339(value).is_ok()
		|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
		|| NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn coerce(raw: &JsonValue) -> Result<String, GqlError> {
	match raw {
		JsonValue::String(s) if is_datetime(s) => Ok(s.clone()),
		v => Err(type_error(FieldKind::Datetime, v)),
	}
}

impl BuildField for DatetimeField {
	fn form(&self, reg: &mut TypeRegistry, _: &Catalog) -> Result<String, GqlError> {
		shared_form(reg, self.kind(), FORM, |obj| {
			obj.field(resolved_field("dateFormat", TypeRef::named(TypeRef::STRING)))
				.field(resolved_field("timeFormat", TypeRef::named(TypeRef::STRING)))
		})
	}

	fn value_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(TypeRef::STRING))
	}

	fn input_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(TypeRef::STRING))
	}
}

#[async_trait::async_trait]
impl ResolveField for DatetimeField {
	fn field(&self) -> Record {
		describe(FORM, &self.name, self.label(), self.kind(), self.config.required)
			.with("dateFormat", Node::optional_string(self.config.date_format.as_deref()))
			.with("timeFormat", Node::optional_string(self.config.time_format.as_deref()))
	}

	async fn value(&self, raw: Option<&JsonValue>, _: &dyn DataSource) -> Result<Resolved, GqlError> {
		scalar(raw, |v| coerce(v).map(Node::string))
	}

	async fn input(&self, raw: &JsonValue, _: &dyn DataSource) -> Result<JsonValue, GqlError> {
		match raw {
			JsonValue::String(s) if !is_datetime(s) => {
				Err(input_error(format!("`{s}` is not a valid date for `{}`", self.name)))
			}
			v => Ok(v.clone()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::MemoryDataSource;
	use crate::tpl::DatetimeConfig;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("2024-03-01T10:00:00Z")]
	#[case("2024-03-01T10:00:00+02:00")]
	#[case("2024-03-01T10:00:00")]
	#[case("2024-03-01")]
	fn accepts_dates(#[case] value: &str) {
		assert!(is_datetime(value));
	}

	#[rstest]
	#[case("yesterday")]
	#[case("2024-13-01")]
	#[case("01/03/2024")]
	fn rejects_other_strings(#[case] value: &str) {
		assert!(!is_datetime(value));
	}

	#[tokio::test]
	async fn invalid_dates_fail_on_read_and_write() {
		let ds = MemoryDataSource::new();
		let field = DatetimeField {
			name: "published".into(),
			label: None,
			config: DatetimeConfig {
				date_format: Some("YYYY-MM-DD".into()),
				..Default::default()
			},
		};
		let err = field.value(Some(&json!("soon")), &ds).await.unwrap_err();
		assert!(matches!(err, GqlError::TypeError { target: FieldKind::Datetime, .. }));
		let err = field.input(&json!("soon"), &ds).await.unwrap_err();
		assert!(matches!(err, GqlError::InputError(_)));
		assert_eq!(field.input(&json!("2024-03-01"), &ds).await.unwrap(), json!("2024-03-01"));
	}
}
