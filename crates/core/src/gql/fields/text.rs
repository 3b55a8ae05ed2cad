use async_graphql::Value as GqlValue;
use async_graphql::dynamic::TypeRef;
use serde_json::Value as JsonValue;

use super::{BuildField, ResolveField, coerce_string, describe, scalar, shared_form};
use crate::gql::error::GqlError;
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Node, Record, Resolved};
use crate::gql::schema::Catalog;
use crate::source::DataSource;
use crate::tpl::{FileField, TextField, TextareaField};

// Kinds stored and exposed as a single string
macro_rules! string_field {
	($ty:ident, $form:literal) => {
		impl BuildField for $ty {
			fn form(&self, reg: &mut TypeRegistry, _: &Catalog) -> Result<String, GqlError> {
				shared_form(reg, self.kind(), $form, |obj| obj)
			}

			fn value_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
				Ok(TypeRef::named(TypeRef::STRING))
			}

			fn input_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
				Ok(TypeRef::named(TypeRef::STRING))
			}
		}

		#[async_trait::async_trait]
		impl ResolveField for $ty {
			fn field(&self) -> Record {
				describe($form, &self.name, self.label(), self.kind(), self.config.required)
			}

			async fn value(
				&self,
				raw: Option<&JsonValue>,
				_: &dyn DataSource,
			) -> Result<Resolved, GqlError> {
				let kind = self.kind();
				scalar(raw, |v| Ok(Node::Scalar(GqlValue::String(coerce_string(kind, v)?))))
			}
		}
	};
}

string_field!(TextField, "TextField");
string_field!(TextareaField, "TextareaField");
string_field!(FileField, "FileField");

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::MemoryDataSource;
	use crate::tpl::{Field, FieldConfig};
	use serde_json::json;

	#[tokio::test]
	async fn numbers_read_as_text() {
		let ds = MemoryDataSource::new();
		let field = TextField {
			name: "code".into(),
			label: None,
			config: FieldConfig::default(),
		};
		let res = field.value(Some(&json!(1234)), &ds).await.unwrap();
		assert!(matches!(res, Resolved::Value(Node::Scalar(GqlValue::String(s))) if s == "1234"));
	}

	#[test]
	fn file_fields_announce_an_image_component() {
		let field: Field =
			serde_json::from_value(json!({ "type": "file", "name": "cover", "label": "Cover" }))
				.unwrap();
		let record = field.field();
		assert_eq!(record.typename.as_deref(), Some("FileField"));
		let Some(Resolved::Value(Node::Scalar(GqlValue::String(component)))) =
			record.get("component")
		else {
			panic!("expected a component");
		};
		assert_eq!(component, "image");
	}
}
