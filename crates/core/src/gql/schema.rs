use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use async_graphql::dynamic::{
	Field, FieldFuture, InputObject, InputValue, Object, ResolverContext, Schema, Type, TypeRef,
	Union,
};

use super::error::{GqlError, schema_error};
use super::fields::{
	BuildField, Flavor, document_union, reference, reference_type, resolved_field, section_union,
};
use super::mutation::{add_document, update_document};
use super::registry::TypeRegistry;
use super::resolve::{
	Deferred, Node, Record, field_result, into_field_value, resolve_deferred, source,
};
use crate::cnf::{
	BODY_FIELD, DOCUMENT_INPUT, GRAPHQL_MAX_COMPLEXITY, GRAPHQL_MAX_DEPTH, MAX_NESTING_DEPTH,
	TEMPLATE_FIELD,
};
use crate::source::DataSource;
use crate::tpl::{
	Field as TemplateField, Section, Shape, Source, Template, camel_case, is_valid_name, pascal_case,
};

/// The templates and sections a schema is built from.
///
/// Every template reachable from a blocks field is fetched up front, so the
/// build itself never waits on the data source.
#[derive(Debug)]
pub struct Catalog {
	templates: BTreeMap<String, Template>,
	sections: Vec<Section>,
}

impl Catalog {
	pub async fn load(ds: &dyn DataSource) -> Result<Self, GqlError> {
		let mut templates: BTreeMap<String, Template> = ds
			.get_templates_for_section(None)
			.await?
			.into_iter()
			.map(|t| (t.name.clone(), t))
			.collect();
		let mut missing = BTreeSet::new();
		for template in templates.values() {
			block_templates(template.shape(), &mut missing);
		}
		missing.retain(|slug| !templates.contains_key(slug));
		while !missing.is_empty() {
			let slugs: Vec<String> = std::mem::take(&mut missing).into_iter().collect();
			trace!("Prefetching block templates {slugs:?}");
			let fetched = ds
				.get_templates(&slugs)
				.await
				.map_err(|e| schema_error(format!("a blocks field cannot be resolved: {e}")))?;
			for template in fetched {
				block_templates(template.shape(), &mut missing);
				templates.insert(template.name.clone(), template);
			}
			missing.retain(|slug| !templates.contains_key(slug));
		}
		let sections = ds.get_sections_settings().await?;
		Ok(Catalog {
			templates,
			sections,
		})
	}

	pub fn templates(&self) -> impl Iterator<Item = &Template> {
		self.templates.values()
	}

	pub fn template(&self, slug: &str) -> Result<&Template, GqlError> {
		self.templates
			.get(slug)
			.ok_or_else(|| schema_error(format!("the template `{slug}` does not exist")))
	}

	pub fn sections(&self) -> &[Section] {
		&self.sections
	}

	pub fn section(&self, name: &str) -> Result<&Section, GqlError> {
		self.sections
			.iter()
			.find(|s| s.matches(name))
			.ok_or_else(|| schema_error(format!("the section `{name}` does not exist")))
	}

	pub fn section_templates(&self, name: &str) -> Result<Vec<&Template>, GqlError> {
		self.section(name)?.templates.iter().map(|slug| self.template(slug)).collect()
	}

	/// Rejects definitions which cannot be turned into a schema.
	pub fn validate(&self) -> Result<(), GqlError> {
		if self.templates.is_empty() {
			return Err(schema_error("no templates found"));
		}
		for template in self.templates.values() {
			self.validate_shape(template.shape())?;
		}
		for section in &self.sections {
			if let Some(name) = &section.name {
				if !is_valid_name(&pascal_case(name)) {
					return Err(schema_error(format!("the section name `{name}` is not usable")));
				}
			}
			for slug in &section.templates {
				self.template(slug)?;
			}
		}
		Ok(())
	}

	fn validate_shape(&self, shape: Shape<'_>) -> Result<(), GqlError> {
		if shape.depth() > *MAX_NESTING_DEPTH {
			return Err(schema_error(format!(
				"`{}` is nested deeper than {} groups",
				shape.origin(),
				*MAX_NESTING_DEPTH
			)));
		}
		if !is_valid_name(&shape.base_name()) {
			return Err(schema_error(format!("`{}` does not produce a valid type name", shape.origin())));
		}
		let mut seen = HashSet::new();
		for field in shape.fields {
			let name = field.name();
			if !is_valid_name(name) {
				return Err(schema_error(format!("`{name}` in `{}` is not a valid field name", shape.origin())));
			}
			if name == BODY_FIELD || name == TEMPLATE_FIELD {
				return Err(schema_error(format!("`{name}` in `{}` is a reserved name", shape.origin())));
			}
			if !seen.insert(name) {
				return Err(schema_error(format!("`{name}` is defined twice in `{}`", shape.origin())));
			}
			match field {
				TemplateField::FieldGroup(group) => {
					if group.fields.is_empty() {
						return Err(schema_error(format!("the group `{}` has no fields", group.name)));
					}
					self.validate_shape(group.shape())?;
				}
				TemplateField::FieldGroupList(group) => {
					if group.fields.is_empty() {
						return Err(schema_error(format!("the group list `{}` has no fields", group.name)));
					}
					self.validate_shape(group.shape())?;
				}
				TemplateField::Blocks(blocks) => {
					if blocks.template_types.is_empty() {
						return Err(schema_error(format!("the blocks `{}` allow no templates", blocks.name)));
					}
					for slug in &blocks.template_types {
						self.template(slug)?;
					}
				}
				TemplateField::Select(select) => self.validate_source(&select.config.source)?,
				TemplateField::List(list) => self.validate_source(&list.config.source)?,
				_ => {}
			}
		}
		Ok(())
	}

	fn validate_source(&self, source: &Source) -> Result<(), GqlError> {
		if let Source::Pages {
			section,
		} = source
		{
			if self.section(section)?.templates.is_empty() {
				return Err(schema_error(format!("the section `{section}` allows no templates")));
			}
		}
		Ok(())
	}
}

/// Collects the template slugs referenced by blocks fields in a shape and its groups.
fn block_templates(shape: Shape<'_>, out: &mut BTreeSet<String>) {
	for field in shape.fields {
		match field {
			TemplateField::Blocks(blocks) => out.extend(blocks.template_types.iter().cloned()),
			TemplateField::FieldGroup(group) => block_templates(group.shape(), out),
			TemplateField::FieldGroupList(group) => block_templates(group.shape(), out),
			_ => {}
		}
	}
}

/// Registers `<Base>FormFieldsUnion` over the descriptors of a shape.
pub(crate) fn form_fields_union(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	shape: Shape<'_>,
) -> Result<String, GqlError> {
	let name = format!("{}FormFieldsUnion", shape.base_name());
	reg.build(name.clone(), format!("form-fields:{}", shape.origin()), |reg| {
		let mut members: Vec<String> = Vec::new();
		for field in shape.all_fields() {
			let ty = field.form(reg, cat)?;
			if !members.contains(&ty) {
				members.push(ty);
			}
		}
		let mut union = Union::new(&name);
		for member in members {
			union = union.possible_type(member);
		}
		Ok(Type::Union(union))
	})
}

/// Registers `<Base>Form`.
pub(crate) fn form_type(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	shape: Shape<'_>,
) -> Result<String, GqlError> {
	let name = format!("{}Form", shape.base_name());
	reg.build(name.clone(), format!("form:{}", shape.origin()), |reg| {
		let union = form_fields_union(reg, cat, shape)?;
		Ok(Type::Object(
			Object::new(&name)
				.field(resolved_field("name", TypeRef::named_nn(TypeRef::STRING)))
				.field(resolved_field("label", TypeRef::named_nn(TypeRef::STRING)))
				.field(resolved_field("fields", TypeRef::named_nn_list_nn(union))),
		))
	})
}

/// Registers `<Base>Data` or `<Base>InitialValues`.
pub(crate) fn values_type(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	shape: Shape<'_>,
	flavor: Flavor,
) -> Result<String, GqlError> {
	let name = format!("{}{}", shape.base_name(), flavor.suffix());
	reg.build(name.clone(), format!("{}:{}", flavor.origin(), shape.origin()), |reg| {
		let mut obj = Object::new(&name);
		if shape.root {
			obj = obj.field(resolved_field(TEMPLATE_FIELD, TypeRef::named_nn(TypeRef::STRING)));
		}
		for field in shape.all_fields() {
			let ty = match flavor {
				Flavor::Data => field.value_type(reg, cat)?,
				Flavor::InitialValues => field.initial_value_type(reg, cat)?,
			};
			obj = obj.field(resolved_field(field.name(), ty));
		}
		Ok(Type::Object(obj))
	})
}

/// Registers `<Base>Input`.
pub(crate) fn input_type(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	shape: Shape<'_>,
) -> Result<String, GqlError> {
	let name = format!("{}Input", shape.base_name());
	reg.build(name.clone(), format!("input:{}", shape.origin()), |reg| {
		let mut input = InputObject::new(&name);
		for field in shape.all_fields() {
			input = input.field(InputValue::new(field.name(), field.input_type(reg, cat)?));
		}
		Ok(Type::InputObject(input))
	})
}

/// Registers `<Base>Document`, and through it every type of the template.
pub(crate) fn document_type(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	template: &Template,
) -> Result<String, GqlError> {
	let shape = template.shape();
	let name = format!("{}Document", template.base_name());
	reg.build(name.clone(), format!("document:{}", shape.origin()), |reg| {
		let form = form_type(reg, cat, shape)?;
		let data = values_type(reg, cat, shape, Flavor::Data)?;
		let initial = values_type(reg, cat, shape, Flavor::InitialValues)?;
		Ok(Type::Object(
			Object::new(&name)
				.description(format!("A document written with the `{}` template", template.name))
				.field(resolved_field("path", TypeRef::named_nn(TypeRef::STRING)))
				.field(resolved_field("form", TypeRef::named_nn(form)))
				.field(resolved_field("data", TypeRef::named_nn(data)))
				.field(resolved_field("initialValues", TypeRef::named_nn(initial))),
		))
	})
}

fn document_input(reg: &mut TypeRegistry, cat: &Catalog) -> Result<String, GqlError> {
	reg.build(DOCUMENT_INPUT, "input:documents", |reg| {
		let mut input = InputObject::new(DOCUMENT_INPUT)
			.description("The data of a document, keyed by its template. Exactly one key must be set.");
		for template in cat.templates() {
			let ty = input_type(reg, cat, template.shape())?;
			input = input.field(InputValue::new(camel_case(&template.name), TypeRef::named(ty)));
		}
		Ok(Type::InputObject(input))
	})
}

fn section_type(reg: &mut TypeRegistry) -> Result<String, GqlError> {
	reg.build("Section", "sections", |_| {
		Ok(Type::Object(
			Object::new("Section")
				.field(resolved_field("name", TypeRef::named(TypeRef::STRING)))
				.field(resolved_field("label", TypeRef::named_nn(TypeRef::STRING)))
				.field(resolved_field("path", TypeRef::named_nn(TypeRef::STRING)))
				.field(resolved_field("templates", TypeRef::named_nn_list_nn(TypeRef::STRING))),
		))
	})
}

fn section_record(section: &Section) -> Record {
	Record::new()
		.with("name", Node::optional_string(section.name.as_deref()))
		.with("label", Node::string(section.label()))
		.with("path", Node::string(&section.path))
		.with("templates", Node::strings(section.templates.iter().cloned()))
}

fn optional_arg(ctx: &ResolverContext<'_>, name: &str) -> Result<Option<String>, async_graphql::Error> {
	match ctx.args.get(name) {
		Some(v) if !v.is_null() => Ok(Some(v.string()?.to_owned())),
		_ => Ok(None),
	}
}

/// Builds the schema for the templates and sections of a data source.
pub async fn generate_schema(source_ds: &Arc<dyn DataSource>) -> Result<Schema, GqlError> {
	let catalog = Catalog::load(source_ds.as_ref()).await?;
	catalog.validate()?;

	trace!(
		templates = catalog.templates.len(),
		sections = catalog.sections.len(),
		"generating schema"
	);

	let mut reg = TypeRegistry::new();
	let documents = document_union(&mut reg, &catalog)?;
	for section in catalog.sections() {
		match &section.name {
			Some(name) if !section.templates.is_empty() => {
				section_union(&mut reg, &catalog, name)?;
			}
			_ => {}
		}
	}
	let reference_name = reference_type(&mut reg, &catalog, None)?;
	let section_name = section_type(&mut reg)?;
	let input_name = document_input(&mut reg, &catalog)?;
	let tags: Arc<BTreeMap<String, String>> =
		Arc::new(catalog.templates().map(|t| (camel_case(&t.name), t.name.clone())).collect());

	let query = Object::new("Query")
		.field(
			Field::new("document", TypeRef::named(&documents), |ctx| {
				FieldFuture::new(async move {
					let ds = source(&ctx)?;
					let res = resolve_deferred(&ctx, ds.as_ref(), &Deferred::Initial).await;
					Ok(field_result(&ctx, res))
				})
			})
			.description("Loads a single document by its path")
			.argument(InputValue::new("path", TypeRef::named(TypeRef::STRING))),
		)
		.field(
			Field::new("documentList", TypeRef::named_nn_list_nn(&reference_name), |ctx| {
				FieldFuture::new(async move {
					let ds = source(&ctx)?;
					let section = optional_arg(&ctx, "section")?;
					let paths = ds.get_documents_for_section(section.as_deref()).await?;
					let list = paths
						.into_iter()
						.map(|p| Node::Object(reference(p, section.as_deref())))
						.collect();
					Ok(into_field_value(Node::List(list)))
				})
			})
			.description("Lists the documents of a section, or of every section")
			.argument(InputValue::new("section", TypeRef::named(TypeRef::STRING))),
		)
		.field(Field::new("sections", TypeRef::named_nn_list_nn(&section_name), |ctx| {
			FieldFuture::new(async move {
				let ds = source(&ctx)?;
				let sections = ds.get_sections_settings().await?;
				let list = sections.iter().map(|s| Node::Object(section_record(s))).collect();
				Ok(into_field_value(Node::List(list)))
			})
		}));

	let mutation = Object::new("Mutation")
		.field(
			Field::new("updateDocument", TypeRef::named(&documents), move |ctx| {
				let tags = tags.clone();
				FieldFuture::new(async move {
					let ds = source(&ctx)?;
					let path = ctx.args.try_get("path")?.string()?.to_owned();
					let params = ctx.args.try_get("params")?.as_value().clone().into_json()?;
					let res = update_document(ds.as_ref(), &path, &params, &tags).await;
					Ok(field_result(&ctx, res))
				})
			})
			.description("Replaces the data of a document")
			.argument(InputValue::new("path", TypeRef::named_nn(TypeRef::STRING)))
			.argument(InputValue::new("params", TypeRef::named_nn(&input_name))),
		)
		.field(
			Field::new("addDocument", TypeRef::named(&documents), |ctx| {
				FieldFuture::new(async move {
					let ds = source(&ctx)?;
					let path = ctx.args.try_get("path")?.string()?.to_owned();
					let template = ctx.args.try_get("template")?.string()?.to_owned();
					let section = optional_arg(&ctx, "section")?;
					let res = add_document(ds.as_ref(), &path, &template, section).await;
					Ok(field_result(&ctx, res))
				})
			})
			.description("Creates an empty document for a template")
			.argument(InputValue::new("path", TypeRef::named_nn(TypeRef::STRING)))
			.argument(InputValue::new("template", TypeRef::named_nn(TypeRef::STRING)))
			.argument(InputValue::new("section", TypeRef::named(TypeRef::STRING))),
		);

	trace!("registering {} generated types", reg.len());

	let mut schema = Schema::build("Query", Some("Mutation"), None).register(query).register(mutation);
	for ty in reg.into_types()? {
		schema = schema.register(ty);
	}

	schema
		.data(source_ds.clone())
		.limit_depth(*GRAPHQL_MAX_DEPTH)
		.limit_complexity(*GRAPHQL_MAX_COMPLEXITY)
		.finish()
		.map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::err::Error;
	use crate::source::{AddArgs, Document, DocumentArgs, MemoryDataSource, UpdateArgs};
	use serde_json::json;

	async fn build(ds: MemoryDataSource) -> Result<Schema, GqlError> {
		let ds: Arc<dyn DataSource> = Arc::new(ds);
		generate_schema(&ds).await
	}

	fn assert_schema_error(res: Result<Schema, GqlError>, needle: &str) {
		match res {
			Err(GqlError::SchemaError(msg)) => assert!(msg.contains(needle), "{msg}"),
			Err(e) => panic!("unexpected error: {e}"),
			Ok(_) => panic!("expected the schema to be rejected"),
		}
	}

	#[tokio::test]
	async fn empty_sources_are_rejected() {
		assert_schema_error(build(MemoryDataSource::new()).await, "no templates");
	}

	#[tokio::test]
	async fn empty_groups_are_rejected() {
		let ds = MemoryDataSource::new().with_template(json!({
			"name": "post",
			"fields": [{ "type": "field_group", "name": "meta", "fields": [] }]
		}));
		assert_schema_error(build(ds).await, "has no fields");
	}

	#[tokio::test]
	async fn empty_blocks_are_rejected() {
		let ds = MemoryDataSource::new().with_template(json!({
			"name": "page",
			"fields": [{ "type": "blocks", "name": "sections", "template_types": [] }]
		}));
		assert_schema_error(build(ds).await, "allow no templates");
	}

	#[tokio::test]
	async fn unknown_block_templates_are_rejected() {
		let ds = MemoryDataSource::new().with_template(json!({
			"name": "page",
			"fields": [{ "type": "blocks", "name": "sections", "template_types": ["hero"] }]
		}));
		assert_schema_error(build(ds).await, "blocks field");
	}

	#[tokio::test]
	async fn unknown_sections_are_rejected() {
		let ds = MemoryDataSource::new().with_template(json!({
			"name": "post",
			"fields": [{ "type": "select", "name": "author",
				"config": { "source": { "type": "pages", "section": "authors" } } }]
		}));
		assert_schema_error(build(ds).await, "section `authors`");
	}

	#[tokio::test]
	async fn invalid_and_reserved_names_are_rejected() {
		let ds = MemoryDataSource::new()
			.with_template(json!({ "name": "post", "fields": [{ "type": "text", "name": "hero-title" }] }));
		assert_schema_error(build(ds).await, "not a valid field name");
		let ds = MemoryDataSource::new()
			.with_template(json!({ "name": "post", "fields": [{ "type": "text", "name": "_body" }] }));
		assert_schema_error(build(ds).await, "reserved");
		let ds = MemoryDataSource::new().with_template(json!({ "name": "2col", "fields": [] }));
		assert_schema_error(build(ds).await, "valid type name");
	}

	#[tokio::test]
	async fn deep_nesting_is_rejected() {
		let mut group = json!({ "type": "text", "name": "leaf" });
		for depth in 0..=*MAX_NESTING_DEPTH {
			group = json!({ "type": "field_group", "name": format!("g{depth}"), "fields": [group] });
		}
		let ds = MemoryDataSource::new().with_template(json!({ "name": "deep", "fields": [group] }));
		assert_schema_error(build(ds).await, "nested deeper");
	}

	#[tokio::test]
	async fn self_referencing_blocks_terminate() {
		let ds = MemoryDataSource::new().with_template(json!({
			"name": "page",
			"fields": [{ "type": "blocks", "name": "children", "template_types": ["page"] }]
		}));
		let sdl = build(ds).await.unwrap().sdl();
		assert_eq!(sdl.matches("type PageData ").count(), 1, "{sdl}");
		assert!(sdl.contains("PageChildrenData"), "{sdl}");
	}

	/// Lists only the page template, leaving block templates to be fetched by slug.
	struct PagesOnly(MemoryDataSource);

	#[async_trait::async_trait]
	impl DataSource for PagesOnly {
		async fn get_templates_for_section(&self, _: Option<&str>) -> Result<Vec<Template>, Error> {
			Ok(vec![self.0.get_template("page").await?])
		}

		async fn get_template(&self, slug: &str) -> Result<Template, Error> {
			self.0.get_template(slug).await
		}

		async fn get_data(&self, args: &DocumentArgs) -> Result<Document, Error> {
			self.0.get_data(args).await
		}

		async fn get_template_for_document(&self, args: &DocumentArgs) -> Result<Template, Error> {
			self.0.get_template_for_document(args).await
		}

		async fn get_documents_for_section(&self, section: Option<&str>) -> Result<Vec<String>, Error> {
			self.0.get_documents_for_section(section).await
		}

		async fn get_sections_settings(&self) -> Result<Vec<Section>, Error> {
			self.0.get_sections_settings().await
		}

		async fn update_document(&self, args: UpdateArgs) -> Result<(), Error> {
			self.0.update_document(args).await
		}

		async fn add_document(&self, args: AddArgs) -> Result<(), Error> {
			self.0.add_document(args).await
		}
	}

	#[tokio::test]
	async fn block_templates_are_prefetched() {
		let ds = MemoryDataSource::new()
			.with_template(json!({
				"name": "page",
				"fields": [{ "type": "blocks", "name": "sections", "template_types": ["hero"] }]
			}))
			.with_template(json!({
				"name": "hero",
				"fields": [{ "type": "blocks", "name": "extras", "template_types": ["badge"] }]
			}))
			.with_template(json!({ "name": "badge", "fields": [{ "type": "text", "name": "text" }] }));
		let ds: Arc<dyn DataSource> = Arc::new(PagesOnly(ds));
		let catalog = Catalog::load(ds.as_ref()).await.unwrap();
		let names: Vec<_> = catalog.templates().map(|t| t.name.as_str()).collect();
		assert_eq!(names, vec!["badge", "hero", "page"]);
		let sdl = generate_schema(&ds).await.unwrap().sdl();
		assert!(sdl.contains("PageSectionsData"), "{sdl}");
		assert!(sdl.contains("type HeroExtrasBlocksField"), "{sdl}");
	}
}
