use async_graphql::dynamic::{Type, TypeRef};
use serde_json::Value as JsonValue;

use super::{BuildField, Flavor, ResolveField, describe, descriptor, resolved_field};
use crate::gql::error::{GqlError, input_error, type_error};
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Node, Record, Resolved, resolve_form, resolve_input, resolve_values};
use crate::gql::schema::{Catalog, form_fields_union, input_type, values_type};
use crate::source::DataSource;
use crate::tpl::{FieldKind, GroupField, GroupListField, Shape};

fn form(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	shape: Shape<'_>,
	suffix: &str,
) -> Result<String, GqlError> {
	let name = format!("{}{suffix}", shape.base_name());
	reg.build(name.clone(), format!("{suffix}:{}", shape.origin()), |reg| {
		let union = form_fields_union(reg, cat, shape)?;
		Ok(Type::Object(
			descriptor(&name).field(resolved_field("fields", TypeRef::named_nn_list_nn(union))),
		))
	})
}

fn describe_group(shape: Shape<'_>, kind: FieldKind, suffix: &str) -> Record {
	let mut record =
		describe(format!("{}{suffix}", shape.base_name()), shape.name, shape.label, kind, false);
	if let Some(fields) = resolve_form(shape).fields.shift_remove("fields") {
		record.insert("fields", fields);
	}
	record
}

async fn object(
	kind: FieldKind,
	shape: Shape<'_>,
	raw: &JsonValue,
	ds: &dyn DataSource,
	flavor: Flavor,
) -> Result<Node, GqlError> {
	match raw {
		JsonValue::Object(map) => Ok(Node::Object(resolve_values(shape, map, ds, flavor).await)),
		v => Err(type_error(kind, v)),
	}
}

async fn input(
	shape: Shape<'_>,
	raw: &JsonValue,
	ds: &dyn DataSource,
) -> Result<JsonValue, GqlError> {
	match raw {
		JsonValue::Object(map) => Ok(JsonValue::Object(resolve_input(shape, map, ds).await?)),
		JsonValue::Null => Ok(JsonValue::Null),
		_ => Err(input_error(format!("`{}` expects an object", shape.name))),
	}
}

async fn group(
	field: &GroupField,
	raw: Option<&JsonValue>,
	ds: &dyn DataSource,
	flavor: Flavor,
) -> Result<Resolved, GqlError> {
	match raw {
		None | Some(JsonValue::Null) => Ok(Resolved::Value(Node::Null)),
		Some(v) => Ok(Resolved::Value(object(field.kind(), field.shape(), v, ds, flavor).await?)),
	}
}

async fn group_list(
	field: &GroupListField,
	raw: Option<&JsonValue>,
	ds: &dyn DataSource,
	flavor: Flavor,
) -> Result<Resolved, GqlError> {
	let items = match raw {
		None | Some(JsonValue::Null) => return Ok(Resolved::Value(Node::Null)),
		Some(JsonValue::Array(items)) => items,
		Some(v) => return Err(type_error(field.kind(), v)),
	};
	let mut out = Vec::with_capacity(items.len());
	for item in items {
		out.push(object(field.kind(), field.shape(), item, ds, flavor).await?);
	}
	Ok(Resolved::Value(Node::List(out)))
}

impl BuildField for GroupField {
	fn form(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<String, GqlError> {
		form(reg, cat, self.shape(), "GroupField")
	}

	fn value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(values_type(reg, cat, self.shape(), Flavor::Data)?))
	}

	fn initial_value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(values_type(reg, cat, self.shape(), Flavor::InitialValues)?))
	}

	fn input_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named(input_type(reg, cat, self.shape())?))
	}
}

#[async_trait::async_trait]
impl ResolveField for GroupField {
	fn field(&self) -> Record {
		describe_group(self.shape(), self.kind(), "GroupField")
	}

	async fn value(&self, raw: Option<&JsonValue>, ds: &dyn DataSource) -> Result<Resolved, GqlError> {
		group(self, raw, ds, Flavor::Data).await
	}

	async fn initial_value(
		&self,
		raw: Option<&JsonValue>,
		ds: &dyn DataSource,
	) -> Result<Resolved, GqlError> {
		group(self, raw, ds, Flavor::InitialValues).await
	}

	async fn input(&self, raw: &JsonValue, ds: &dyn DataSource) -> Result<JsonValue, GqlError> {
		input(self.shape(), raw, ds).await
	}
}

impl BuildField for GroupListField {
	fn form(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<String, GqlError> {
		form(reg, cat, self.shape(), "GroupListField")
	}

	fn value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named_nn_list(values_type(reg, cat, self.shape(), Flavor::Data)?))
	}

	fn initial_value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named_nn_list(values_type(reg, cat, self.shape(), Flavor::InitialValues)?))
	}

	fn input_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named_nn_list(input_type(reg, cat, self.shape())?))
	}
}

#[async_trait::async_trait]
impl ResolveField for GroupListField {
	fn field(&self) -> Record {
		describe_group(self.shape(), self.kind(), "GroupListField")
	}

	async fn value(&self, raw: Option<&JsonValue>, ds: &dyn DataSource) -> Result<Resolved, GqlError> {
		group_list(self, raw, ds, Flavor::Data).await
	}

	async fn initial_value(
		&self,
		raw: Option<&JsonValue>,
		ds: &dyn DataSource,
	) -> Result<Resolved, GqlError> {
		group_list(self, raw, ds, Flavor::InitialValues).await
	}

	async fn input(&self, raw: &JsonValue, ds: &dyn DataSource) -> Result<JsonValue, GqlError> {
		let JsonValue::Array(items) = raw else {
			return Err(input_error(format!("`{}` expects a list", self.name)));
		};
		let mut out = Vec::with_capacity(items.len());
		for item in items {
			out.push(input(self.shape(), item, ds).await?);
		}
		Ok(JsonValue::Array(out))
	}
}
