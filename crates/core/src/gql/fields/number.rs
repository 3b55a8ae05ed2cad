use async_graphql::dynamic::TypeRef;
use serde_json::Value as JsonValue;

use super::{BuildField, ResolveField, describe, resolved_field, scalar, shared_form};
use crate::gql::error::{GqlError, type_error};
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Node, Record, Resolved};
use crate::gql::schema::Catalog;
use crate::source::DataSource;
use crate::tpl::{FieldKind, NumberField};

const FORM: &str = "NumberField";

fn coerce(raw: &JsonValue) -> Result<f64, GqlError> {
	let n = match raw {
		JsonValue::Number(n) => n.as_f64(),
		JsonValue::String(s) => s.trim().parse::<f64>().ok(),
		_ => None,
	};
	n.filter(|n| n.is_finite()).ok_or_else(|| type_error(FieldKind::Number, raw))
}

impl BuildField for NumberField {
	fn form(&self, reg: &mut TypeRegistry, _: &Catalog) -> Result<String, GqlError> {
		shared_form(reg, self.kind(), FORM, |obj| {
			obj.field(resolved_field("min", TypeRef::named(TypeRef::FLOAT)))
				.field(resolved_field("max", TypeRef::named(TypeRef::FLOAT)))
				.field(resolved_field("step", TypeRef::named(TypeRef::FLOAT)))
		})
	}

	fn value_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(TypeRef::FLOAT))
	}

	fn input_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(TypeRef::FLOAT))
	}
}

#[async_trait::async_trait]
impl ResolveField for NumberField {
	fn field(&self) -> Record {
		describe(FORM, &self.name, self.label(), self.kind(), self.config.required)
			.with("min", Node::optional_float(self.config.min))
			.with("max", Node::optional_float(self.config.max))
			.with("step", Node::optional_float(self.config.step))
	}

	async fn value(&self, raw: Option<&JsonValue>, _: &dyn DataSource) -> Result<Resolved, GqlError> {
		scalar(raw, |v| coerce(v).map(Node::float))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(json!(3), 3.0)]
	#[case(json!(2.5), 2.5)]
	#[case(json!("7"), 7.0)]
	#[case(json!(" -1.25 "), -1.25)]
	fn accepts_numbers_and_numeric_strings(#[case] raw: JsonValue, #[case] expected: f64) {
		assert_eq!(coerce(&raw).unwrap(), expected);
	}

	#[rstest]
	#[case(json!("seven"))]
	#[case(json!("NaN"))]
	#[case(json!(true))]
	#[case(json!([1]))]
	fn rejects_anything_else(#[case] raw: JsonValue) {
		assert!(matches!(coerce(&raw), Err(GqlError::TypeError { target: FieldKind::Number, .. })));
	}
}
