//! The build and resolve operations of every field kind.
//!
//! Each kind contributes a form descriptor type, a Data type, an
//! InitialValues type and an Input type to the schema ([`BuildField`]), and
//! the matching operations which turn stored values into result nodes and
//! submitted input into persisted values ([`ResolveField`]).

mod blocks;
mod boolean;
mod datetime;
mod group;
mod list;
mod number;
mod reference;
mod select;
mod text;

pub(crate) use reference::{document_union, reference, reference_type, section_union};

use async_graphql::Value as GqlValue;
use async_graphql::dynamic::{self, Object, Type, TypeRef};
use serde_json::Value as JsonValue;

use super::error::{GqlError, type_error};
use super::registry::TypeRegistry;
use super::resolve::{Node, Record, Resolved, field_resolver};
use super::schema::Catalog;
use crate::source::DataSource;
use crate::tpl::{Field, FieldKind};

/// Which of the two value shapes of a template is being built or resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
	Data,
	InitialValues,
}

impl Flavor {
	/// The suffix of the type names generated for this flavor.
	pub fn suffix(self) -> &'static str {
		match self {
			Flavor::Data => "Data",
			Flavor::InitialValues => "InitialValues",
		}
	}

	/// The prefix of the registry origins of types generated for this flavor.
	pub fn origin(self) -> &'static str {
		match self {
			Flavor::Data => "data",
			Flavor::InitialValues => "initial-values",
		}
	}
}

/// The schema side of a field kind.
pub trait BuildField {
	/// Registers the form descriptor type, returning its name.
	fn form(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<String, GqlError>;

	fn value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError>;

	fn initial_value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		self.value_type(reg, cat)
	}

	fn input_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError>;
}

/// The request side of a field kind.
#[async_trait::async_trait]
pub trait ResolveField: Send + Sync {
	/// The form descriptor of this field.
	fn field(&self) -> Record;

	/// Interprets a stored value.
	async fn value(&self, raw: Option<&JsonValue>, ds: &dyn DataSource)
	-> Result<Resolved, GqlError>;

	async fn initial_value(
		&self,
		raw: Option<&JsonValue>,
		ds: &dyn DataSource,
	) -> Result<Resolved, GqlError> {
		self.value(raw, ds).await
	}

	/// Prepares a submitted value for persistence.
	async fn input(&self, raw: &JsonValue, _ds: &dyn DataSource) -> Result<JsonValue, GqlError> {
		Ok(raw.clone())
	}
}

macro_rules! dispatch {
	($field:expr, $f:ident => $e:expr) => {
		match $field {
			Field::Text($f) => $e,
			Field::Textarea($f) => $e,
			Field::Select($f) => $e,
			Field::Boolean($f) => $e,
			Field::Datetime($f) => $e,
			Field::Number($f) => $e,
			Field::File($f) => $e,
			Field::ImageGallery($f) => $e,
			Field::TagList($f) => $e,
			Field::List($f) => $e,
			Field::FieldGroup($f) => $e,
			Field::FieldGroupList($f) => $e,
			Field::Blocks($f) => $e,
		}
	};
}

impl BuildField for Field {
	fn form(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<String, GqlError> {
		dispatch!(self, f => f.form(reg, cat))
	}

	fn value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		dispatch!(self, f => f.value_type(reg, cat))
	}

	fn initial_value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		dispatch!(self, f => f.initial_value_type(reg, cat))
	}

	fn input_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		dispatch!(self, f => f.input_type(reg, cat))
	}
}

#[async_trait::async_trait]
impl ResolveField for Field {
	fn field(&self) -> Record {
		dispatch!(self, f => f.field())
	}

	async fn value(
		&self,
		raw: Option<&JsonValue>,
		ds: &dyn DataSource,
	) -> Result<Resolved, GqlError> {
		dispatch!(self, f => f.value(raw, ds).await)
	}

	async fn initial_value(
		&self,
		raw: Option<&JsonValue>,
		ds: &dyn DataSource,
	) -> Result<Resolved, GqlError> {
		dispatch!(self, f => f.initial_value(raw, ds).await)
	}

	async fn input(&self, raw: &JsonValue, ds: &dyn DataSource) -> Result<JsonValue, GqlError> {
		dispatch!(self, f => f.input(raw, ds).await)
	}
}

/// An object field resolved by looking its name up in the parent record.
pub(crate) fn resolved_field(name: impl Into<String>, ty: impl Into<TypeRef>) -> dynamic::Field {
	let name = name.into();
	dynamic::Field::new(name.clone(), ty, field_resolver(name))
}

/// The object type of a form descriptor, with the members every descriptor carries.
pub(crate) fn descriptor(type_name: &str) -> Object {
	Object::new(type_name)
		.field(resolved_field("name", TypeRef::named_nn(TypeRef::STRING)))
		.field(resolved_field("label", TypeRef::named_nn(TypeRef::STRING)))
		.field(resolved_field("component", TypeRef::named_nn(TypeRef::STRING)))
		.field(resolved_field("required", TypeRef::named_nn(TypeRef::BOOLEAN)))
}

/// Registers a descriptor type shared by every field of one kind.
pub(crate) fn shared_form(
	reg: &mut TypeRegistry,
	kind: FieldKind,
	type_name: &str,
	extend: impl FnOnce(Object) -> Object,
) -> Result<String, GqlError> {
	reg.build(type_name, format!("form:{kind}"), |_| Ok(Type::Object(extend(descriptor(type_name)))))
}

/// The descriptor record of a field.
pub(crate) fn describe(
	typename: impl Into<String>,
	name: &str,
	label: &str,
	kind: FieldKind,
	required: bool,
) -> Record {
	Record::typed(typename)
		.with("name", Node::string(name))
		.with("label", Node::string(label))
		.with("component", Node::string(kind.component()))
		.with("required", Node::boolean(required))
}

/// Interprets a scalar value, treating a missing or null value as null.
pub(crate) fn scalar(
	raw: Option<&JsonValue>,
	convert: impl FnOnce(&JsonValue) -> Result<Node, GqlError>,
) -> Result<Resolved, GqlError> {
	match raw {
		None | Some(JsonValue::Null) => Ok(Resolved::Value(Node::Null)),
		Some(v) => convert(v).map(Resolved::Value),
	}
}

/// Reads a string, accepting numbers and booleans in their printed form.
pub(crate) fn coerce_string(kind: FieldKind, raw: &JsonValue) -> Result<String, GqlError> {
	match raw {
		JsonValue::String(s) => Ok(s.clone()),
		JsonValue::Number(n) => Ok(n.to_string()),
		JsonValue::Bool(b) => Ok(b.to_string()),
		v => Err(type_error(kind, v)),
	}
}

/// Reads a list of strings. Null entries are kept as null.
pub(crate) fn coerce_strings(kind: FieldKind, raw: &JsonValue) -> Result<Node, GqlError> {
	let JsonValue::Array(items) = raw else {
		return Err(type_error(kind, raw));
	};
	let mut out = Vec::with_capacity(items.len());
	for item in items {
		out.push(match item {
			JsonValue::Null => Node::Null,
			v => Node::Scalar(GqlValue::String(coerce_string(kind, v)?)),
		});
	}
	Ok(Node::List(out))
}

/// Reads the plain paths of a reference list.
pub(crate) fn paths(kind: FieldKind, raw: &JsonValue) -> Result<Vec<String>, GqlError> {
	let JsonValue::Array(items) = raw else {
		return Err(type_error(kind, raw));
	};
	items.iter().map(|v| coerce_string(kind, v)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(json!("hello"), "hello")]
	#[case(json!(42), "42")]
	#[case(json!(1.5), "1.5")]
	#[case(json!(true), "true")]
	fn strings_accept_scalars(#[case] raw: JsonValue, #[case] expected: &str) {
		assert_eq!(coerce_string(FieldKind::Text, &raw).unwrap(), expected);
	}

	#[rstest]
	#[case(json!({ "a": 1 }))]
	#[case(json!(["a"]))]
	fn strings_reject_containers(#[case] raw: JsonValue) {
		let err = coerce_string(FieldKind::Text, &raw).unwrap_err();
		assert!(matches!(err, GqlError::TypeError { target: FieldKind::Text, .. }));
	}

	#[test]
	fn string_lists_require_arrays() {
		let node = coerce_strings(FieldKind::TagList, &json!(["a", 1, null])).unwrap();
		let Node::List(items) = node else {
			panic!("expected a list");
		};
		assert_eq!(items.len(), 3);
		assert!(matches!(items[2], Node::Null));
		let err = coerce_strings(FieldKind::TagList, &json!("a, b")).unwrap_err();
		assert!(matches!(err, GqlError::TypeError { target: FieldKind::TagList, .. }));
	}

	#[test]
	fn missing_scalars_are_null() {
		let res = scalar(None, |_| unreachable!()).unwrap();
		assert!(matches!(res, Resolved::Value(Node::Null)));
		let res = scalar(Some(&JsonValue::Null), |_| unreachable!()).unwrap();
		assert!(matches!(res, Resolved::Value(Node::Null)));
	}

	#[test]
	fn flavors_name_their_types() {
		assert_eq!(Flavor::Data.suffix(), "Data");
		assert_eq!(Flavor::InitialValues.suffix(), "InitialValues");
		assert_eq!(Flavor::InitialValues.origin(), "initial-values");
	}
}
