use std::sync::Arc;

use async_graphql::{ErrorExtensionValues, ServerError, Value as GqlValue};
use async_graphql::dynamic::indexmap::IndexMap;
use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use futures::future::try_join_all;
use serde_json::{Map, Value as JsonValue};

use super::error::{GqlError, input_error, internal_error, resolver_error};
use super::fields::{Flavor, ResolveField};
use crate::cnf::BODY_FIELD;
use crate::source::{DataSource, DocumentArgs};
use crate::tpl::{Field, Shape, camel_case};

/// A resolved value in a request's result tree.
#[derive(Debug)]
pub enum Node {
	Null,
	Scalar(GqlValue),
	List(Vec<Node>),
	Object(Record),
}

/// An object in the result tree, keyed by GraphQL field name.
///
/// `typename` is set on records which are resolved through a union, so the
/// executor can select the concrete member.
#[derive(Debug, Default)]
pub struct Record {
	pub typename: Option<String>,
	pub fields: IndexMap<String, Resolved>,
}

/// The value stored under a record field.
#[derive(Debug)]
pub enum Resolved {
	/// A value which is already known
	Value(Node),
	/// A value which is only loaded when the field is selected
	Deferred(Deferred),
	/// A stored value which could not be interpreted, reported on the field alone
	Failed(GqlError),
}

/// A reference to data which has not been loaded yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Deferred {
	/// The document named by the `path` argument of the root field
	Initial,
	/// A single referenced document
	Single(DocumentArgs),
	/// A list of referenced documents, loaded concurrently
	Many(Vec<DocumentArgs>),
	/// The forms of the templates allowed in a blocks field, keyed by template
	Templates(Vec<String>),
	/// The document paths of a section, or of every section
	Listing(Option<String>),
}

impl Node {
	pub fn string(value: impl Into<String>) -> Self {
		Node::Scalar(GqlValue::String(value.into()))
	}

	pub fn strings<I, S>(values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Node::List(values.into_iter().map(Node::string).collect())
	}

	pub fn boolean(value: bool) -> Self {
		Node::Scalar(GqlValue::Boolean(value))
	}

	/// A float, or null when the value has no JSON representation.
	pub fn float(value: f64) -> Self {
		match serde_json::Number::from_f64(value) {
			Some(n) => Node::Scalar(GqlValue::Number(n)),
			None => Node::Null,
		}
	}

	pub fn optional_string(value: Option<&str>) -> Self {
		value.map(Node::string).unwrap_or(Node::Null)
	}

	pub fn optional_float(value: Option<f64>) -> Self {
		value.map(Node::float).unwrap_or(Node::Null)
	}

	fn as_field_value(&self) -> Option<FieldValue<'_>> {
		match self {
			Node::Null => None,
			Node::Scalar(v) => Some(FieldValue::value(v.clone())),
			Node::List(items) => Some(FieldValue::list(
				items.iter().map(|n| n.as_field_value().unwrap_or(FieldValue::value(GqlValue::Null))),
			)),
			Node::Object(record) => {
				let value = FieldValue::borrowed_any(record);
				Some(match &record.typename {
					Some(ty) => value.with_type(ty.clone()),
					None => value,
				})
			}
		}
	}

	fn into_field_value<'a>(self) -> Option<FieldValue<'a>> {
		match self {
			Node::Null => None,
			Node::Scalar(v) => Some(FieldValue::value(v)),
			Node::List(items) => Some(FieldValue::list(
				items
					.into_iter()
					.map(|n| n.into_field_value().unwrap_or(FieldValue::value(GqlValue::Null))),
			)),
			Node::Object(record) => {
				let ty = record.typename.clone();
				let value = FieldValue::owned_any(record);
				Some(match ty {
					Some(ty) => value.with_type(ty),
					None => value,
				})
			}
		}
	}
}

impl Record {
	pub fn new() -> Self {
		Self::default()
	}

	/// A record resolved through a union as the member `typename`.
	pub fn typed(typename: impl Into<String>) -> Self {
		Record {
			typename: Some(typename.into()),
			fields: IndexMap::new(),
		}
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<Resolved>) -> Self {
		self.insert(key, value);
		self
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Resolved>) {
		self.fields.insert(key.into(), value.into());
	}

	pub fn get(&self, key: &str) -> Option<&Resolved> {
		self.fields.get(key)
	}
}

impl From<Record> for Node {
	fn from(record: Record) -> Self {
		Node::Object(record)
	}
}

impl From<Node> for Resolved {
	fn from(node: Node) -> Self {
		Resolved::Value(node)
	}
}

impl From<Record> for Resolved {
	fn from(record: Record) -> Self {
		Resolved::Value(Node::Object(record))
	}
}

impl From<Deferred> for Resolved {
	fn from(deferred: Deferred) -> Self {
		Resolved::Deferred(deferred)
	}
}

/// The request-scoped data source, taking precedence over the schema's own.
pub(crate) struct RequestSource(pub(crate) Arc<dyn DataSource>);

pub(crate) fn source(ctx: &ResolverContext<'_>) -> Result<Arc<dyn DataSource>, GqlError> {
	if let Some(RequestSource(ds)) = ctx.data_opt::<RequestSource>() {
		return Ok(ds.clone());
	}
	ctx.data::<Arc<dyn DataSource>>()
		.cloned()
		.map_err(|_| internal_error("no data source is attached to the schema"))
}

/// Reports an error on the field being resolved, which resolves to null.
///
/// The error carries the field's position and response path, so siblings
/// keep their values.
pub(crate) fn field_error<'v>(
	ctx: &ResolverContext<'_>,
	err: &GqlError,
) -> Option<FieldValue<'v>> {
	debug!("Reporting a field error: {err}");
	let mut extensions = ErrorExtensionValues::default();
	extensions.set("code", err.code().to_owned());
	let mut error = ServerError::new(err.to_string(), Some(ctx.item.pos));
	error.extensions = Some(extensions);
	ctx.add_error(ctx.set_error_path(error));
	None
}

/// Turns the outcome of a nullable field into its value, reporting failures
/// on the field itself.
pub(crate) fn field_result<'v>(
	ctx: &ResolverContext<'_>,
	res: Result<Node, GqlError>,
) -> Option<FieldValue<'v>> {
	match res {
		Ok(node) => node.into_field_value(),
		Err(e) => field_error(ctx, &e),
	}
}

/// The resolver shared by every generated object field.
///
/// Looks the field up in the parent record: known values are passed
/// through, deferred values are loaded now. Every field which can fail
/// is nullable, and fails alone.
pub(crate) fn field_resolver(
	name: String,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
	move |ctx: ResolverContext| {
		let name = name.clone();
		FieldFuture::new(async move {
			let parent = ctx.parent_value;
			let record =
				parent.downcast_ref::<Record>().ok_or_else(|| internal_error("failed to downcast"))?;
			match record.get(&name) {
				None => Ok(None),
				Some(Resolved::Value(node)) => Ok(node.as_field_value()),
				Some(Resolved::Failed(e)) => Ok(field_error(&ctx, e)),
				Some(Resolved::Deferred(deferred)) => {
					let ds = source(&ctx)?;
					let res = resolve_deferred(&ctx, ds.as_ref(), deferred).await;
					Ok(field_result(&ctx, res))
				}
			}
		})
	}
}

/// Wraps a computed node as the result of a root field.
pub(crate) fn into_field_value<'a>(node: Node) -> Option<FieldValue<'a>> {
	node.into_field_value()
}

pub(crate) async fn resolve_deferred(
	ctx: &ResolverContext<'_>,
	ds: &dyn DataSource,
	deferred: &Deferred,
) -> Result<Node, GqlError> {
	match deferred {
		Deferred::Initial => {
			let path = ctx
				.args
				.get("path")
				.and_then(|v| v.string().ok().map(str::to_owned))
				.ok_or_else(|| resolver_error("the `path` argument is required"))?;
			load_document(ds, &DocumentArgs::new(path)).await
		}
		Deferred::Single(args) => load_document(ds, args).await,
		Deferred::Many(documents) => {
			let documents = try_join_all(documents.iter().map(|a| load_document(ds, a))).await?;
			Ok(Node::List(documents))
		}
		Deferred::Templates(slugs) => {
			let mut record = Record::new();
			for template in ds.get_templates(slugs).await? {
				record.insert(camel_case(&template.name), resolve_form(template.shape()));
			}
			Ok(Node::Object(record))
		}
		Deferred::Listing(section) => {
			let paths = ds.get_documents_for_section(section.as_deref()).await?;
			Ok(Node::strings(paths))
		}
	}
}

/// Loads a document and builds its form, data and initial values.
pub(crate) async fn load_document(
	ds: &dyn DataSource,
	args: &DocumentArgs,
) -> Result<Node, GqlError> {
	let path = &args.relative_path;
	debug!("Loading document {path}");
	let template = ds.get_template_for_document(args).await?;
	let document = ds.get_data(args).await?;
	let mut data = document.data;
	data.insert(BODY_FIELD.to_owned(), JsonValue::String(document.content));
	let shape = template.shape();
	let record = Record::typed(format!("{}Document", template.base_name()))
		.with("path", Node::string(path.as_str()))
		.with("form", resolve_form(shape))
		.with("data", resolve_values(shape, &data, ds, Flavor::Data).await)
		.with("initialValues", resolve_values(shape, &data, ds, Flavor::InitialValues).await);
	Ok(Node::Object(record))
}

/// Builds the form of a template or group.
pub(crate) fn resolve_form(shape: Shape<'_>) -> Record {
	let fields = shape.all_fields().map(|f| Node::Object(f.field())).collect();
	Record::new()
		.with("name", Node::string(shape.name))
		.with("label", Node::string(shape.label))
		.with("fields", Node::List(fields))
}

/// Builds the Data or InitialValues record of a template or group.
///
/// A field whose stored value cannot be interpreted fails on its own; the
/// rest of the record still resolves.
pub(crate) async fn resolve_values(
	shape: Shape<'_>,
	data: &Map<String, JsonValue>,
	ds: &dyn DataSource,
	flavor: Flavor,
) -> Record {
	let mut record = Record::new();
	if shape.root {
		record.insert(crate::cnf::TEMPLATE_FIELD, Node::string(shape.base_name()));
	}
	for field in shape.all_fields() {
		let raw = data.get(field.name());
		let res = match flavor {
			Flavor::Data => field.value(raw, ds).await,
			Flavor::InitialValues => field.initial_value(raw, ds).await,
		};
		let value = match res {
			Ok(v) => v,
			Err(e) => {
				debug!("Failed to resolve `{}` in {}: {e}", field.name(), shape.origin());
				Resolved::Failed(e)
			}
		};
		record.insert(field.name(), value);
	}
	record
}

/// Converts the input of a template or group into the map to persist.
pub(crate) async fn resolve_input(
	shape: Shape<'_>,
	input: &Map<String, JsonValue>,
	ds: &dyn DataSource,
) -> Result<Map<String, JsonValue>, GqlError> {
	let mut out = Map::new();
	for (key, value) in input {
		if value.is_null() {
			continue;
		}
		let field = find_field(shape, key)?;
		out.insert(key.clone(), field.input(value, ds).await?);
	}
	Ok(out)
}

fn find_field<'a>(shape: Shape<'a>, name: &str) -> Result<&'a Field, GqlError> {
	shape
		.all_fields()
		.find(|f| f.name() == name)
		.ok_or_else(|| input_error(format!("`{}` has no field named `{name}`", shape.name)))
}
