use async_graphql::dynamic::TypeRef;
use serde_json::Value as JsonValue;

use super::{BuildField, ResolveField, describe, scalar, shared_form};
use crate::gql::error::{GqlError, type_error};
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Node, Record, Resolved};
use crate::gql::schema::Catalog;
use crate::source::DataSource;
use crate::tpl::{BooleanField, FieldKind};

const FORM: &str = "BooleanField";

fn coerce(raw: &JsonValue) -> Result<bool, GqlError> {
	match raw {
		JsonValue::Bool(b) => Ok(*b),
		JsonValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
		JsonValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
		v => Err(type_error(FieldKind::Boolean, v)),
	}
}

impl BuildField for BooleanField {
	fn form(&self, reg: &mut TypeRegistry, _: &Catalog) -> Result<String, GqlError> {
		shared_form(reg, self.kind(), FORM, |obj| obj)
	}

	fn value_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(TypeRef::BOOLEAN))
	}

	fn input_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(TypeRef::BOOLEAN))
	}
}

#[async_trait::async_trait]
impl ResolveField for BooleanField {
	fn field(&self) -> Record {
		describe(FORM, &self.name, self.label(), self.kind(), self.config.required)
	}

	async fn value(&self, raw: Option<&JsonValue>, _: &dyn DataSource) -> Result<Resolved, GqlError> {
		scalar(raw, |v| coerce(v).map(Node::boolean))
	}
}
