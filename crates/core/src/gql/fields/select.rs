use async_graphql::Value as GqlValue;
use async_graphql::dynamic::TypeRef;
use serde_json::Value as JsonValue;

use super::reference::{options, reference, reference_type, section_of};
use super::{BuildField, ResolveField, coerce_string, describe, resolved_field, scalar, shared_form};
use crate::gql::error::GqlError;
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Node, Record, Resolved};
use crate::gql::schema::Catalog;
use crate::source::DataSource;
use crate::tpl::SelectField;

const FORM: &str = "SelectField";

impl BuildField for SelectField {
	fn form(&self, reg: &mut TypeRegistry, _: &Catalog) -> Result<String, GqlError> {
		shared_form(reg, self.kind(), FORM, |obj| {
			obj.field(resolved_field("options", TypeRef::named_nn_list(TypeRef::STRING)))
		})
	}

	fn value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		if self.config.source.is_reference() {
			let name = reference_type(reg, cat, section_of(&self.config.source))?;
			Ok(TypeRef::named(name))
		} else {
			Ok(TypeRef::named(TypeRef::STRING))
		}
	}

	fn input_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(TypeRef::STRING))
	}
}

#[async_trait::async_trait]
impl ResolveField for SelectField {
	fn field(&self) -> Record {
		describe(FORM, &self.name, self.label(), self.kind(), self.config.required)
			.with("options", options(&self.config))
	}

	async fn value(&self, raw: Option<&JsonValue>, _: &dyn DataSource) -> Result<Resolved, GqlError> {
		let kind = self.kind();
		let is_reference = self.config.source.is_reference();
		let section = section_of(&self.config.source);
		scalar(raw, |v| {
			let value = coerce_string(kind, v)?;
			if is_reference {
				Ok(Node::Object(reference(value, section)))
			} else {
				Ok(Node::Scalar(GqlValue::String(value)))
			}
		})
	}
}
