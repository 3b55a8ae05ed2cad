use async_graphql::dynamic::{InputObject, InputValue, Object, Type, TypeRef, Union};
use serde_json::Value as JsonValue;

use super::{BuildField, Flavor, ResolveField, describe, descriptor, resolved_field};
use crate::cnf::TEMPLATE_FIELD;
use crate::gql::error::{GqlError, input_error, resolver_error, type_error};
use crate::gql::mutation::single_tag;
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Deferred, Node, Record, Resolved, resolve_input, resolve_values};
use crate::gql::schema::{Catalog, form_type, input_type, values_type};
use crate::source::DataSource;
use crate::tpl::{BlocksField, camel_case, pascal_case};

impl BlocksField {
	fn origin(&self) -> String {
		self.namespace.join(".")
	}

	/// Finds the allowed template an item was stored with, by slug or by type name.
	fn template_for(&self, tag: &str) -> Option<&str> {
		self.template_types
			.iter()
			.find(|slug| *slug == tag || pascal_case(slug) == tag)
			.map(String::as_str)
	}

	fn values_union(
		&self,
		reg: &mut TypeRegistry,
		cat: &Catalog,
		flavor: Flavor,
	) -> Result<String, GqlError> {
		let name = format!("{}{}", self.base_name(), flavor.suffix());
		reg.build(name.clone(), format!("{}:{}", flavor.origin(), self.origin()), |reg| {
			let mut union = Union::new(&name);
			for slug in &self.template_types {
				let template = cat.template(slug)?;
				union = union.possible_type(values_type(reg, cat, template.shape(), flavor)?);
			}
			Ok(Type::Union(union))
		})
	}

	async fn items(
		&self,
		raw: Option<&JsonValue>,
		ds: &dyn DataSource,
		flavor: Flavor,
	) -> Result<Resolved, GqlError> {
		let items = match raw {
			None | Some(JsonValue::Null) => return Ok(Resolved::Value(Node::Null)),
			Some(JsonValue::Array(items)) => items,
			Some(v) => return Err(type_error(self.kind(), v)),
		};
		let mut out = Vec::with_capacity(items.len());
		for item in items {
			let JsonValue::Object(map) = item else {
				return Err(type_error(self.kind(), item));
			};
			let tag = map
				.get(TEMPLATE_FIELD)
				.and_then(JsonValue::as_str)
				.ok_or_else(|| type_error(self.kind(), item))?;
			let slug = self.template_for(tag).ok_or_else(|| {
				resolver_error(format!("the template `{tag}` is not allowed in `{}`", self.name))
			})?;
			let template = ds.get_template(slug).await?;
			let mut record = resolve_values(template.shape(), map, ds, flavor).await;
			record.typename = Some(format!("{}{}", template.base_name(), flavor.suffix()));
			out.push(Node::Object(record));
		}
		Ok(Resolved::Value(Node::List(out)))
	}
}

impl BuildField for BlocksField {
	fn form(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<String, GqlError> {
		let base = self.base_name();
		let name = format!("{base}BlocksField");
		reg.build(name.clone(), format!("BlocksField:{}", self.origin()), |reg| {
			let templates_name = format!("{base}BlocksTemplates");
			let templates =
				reg.build(templates_name.clone(), format!("BlocksTemplates:{}", self.origin()), |reg| {
					let mut obj = Object::new(&templates_name);
					for slug in &self.template_types {
						let template = cat.template(slug)?;
						let form = form_type(reg, cat, template.shape())?;
						obj = obj.field(resolved_field(camel_case(slug), TypeRef::named(form)));
					}
					Ok(Type::Object(obj))
				})?;
			Ok(Type::Object(
				descriptor(&name).field(resolved_field("templates", TypeRef::named(templates))),
			))
		})
	}

	fn value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named_nn_list(self.values_union(reg, cat, Flavor::Data)?))
	}

	fn initial_value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named_nn_list(self.values_union(reg, cat, Flavor::InitialValues)?))
	}

	fn input_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		let name = format!("{}Input", self.base_name());
		let name = reg.build(name.clone(), format!("input:{}", self.origin()), |reg| {
			let mut input = InputObject::new(&name);
			for slug in &self.template_types {
				let template = cat.template(slug)?;
				let ty = input_type(reg, cat, template.shape())?;
				input = input.field(InputValue::new(camel_case(slug), TypeRef::named(ty)));
			}
			Ok(Type::InputObject(input))
		})?;
		Ok(TypeRef::named_nn_list(name))
	}
}

#[async_trait::async_trait]
impl ResolveField for BlocksField {
	fn field(&self) -> Record {
		describe(format!("{}BlocksField", self.base_name()), &self.name, self.label(), self.kind(), false)
			.with("templates", Deferred::Templates(self.template_types.clone()))
	}

	async fn value(&self, raw: Option<&JsonValue>, ds: &dyn DataSource) -> Result<Resolved, GqlError> {
		self.items(raw, ds, Flavor::Data).await
	}

	async fn initial_value(
		&self,
		raw: Option<&JsonValue>,
		ds: &dyn DataSource,
	) -> Result<Resolved, GqlError> {
		self.items(raw, ds, Flavor::InitialValues).await
	}

	async fn input(&self, raw: &JsonValue, ds: &dyn DataSource) -> Result<JsonValue, GqlError> {
		let JsonValue::Array(items) = raw else {
			return Err(input_error(format!("`{}` expects a list", self.name)));
		};
		let mut out = Vec::with_capacity(items.len());
		for item in items {
			let (key, value) = single_tag(item, &self.name)?;
			let slug = self
				.template_types
				.iter()
				.find(|slug| camel_case(slug) == key)
				.ok_or_else(|| input_error(format!("`{key}` is not a template of `{}`", self.name)))?;
			let JsonValue::Object(map) = value else {
				return Err(input_error(format!("`{key}` expects an object")));
			};
			let template = ds.get_template(slug).await?;
			let mut data = resolve_input(template.shape(), map, ds).await?;
			data.insert(TEMPLATE_FIELD.to_owned(), JsonValue::String(slug.clone()));
			out.push(JsonValue::Object(data));
		}
		Ok(JsonValue::Array(out))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::MemoryDataSource;
	use serde_json::json;

	fn blocks() -> BlocksField {
		BlocksField {
			name: "sections".into(),
			label: None,
			template_types: vec!["hero".into(), "call-to-action".into()],
			namespace: vec!["page".into(), "sections".into()],
		}
	}

	fn source() -> MemoryDataSource {
		MemoryDataSource::new()
			.with_template(json!({ "name": "hero", "fields": [{ "type": "text", "name": "headline" }] }))
			.with_template(json!({ "name": "call-to-action", "fields": [{ "type": "text", "name": "url" }] }))
	}

	#[test]
	fn items_match_by_slug_or_type_name() {
		let field = blocks();
		assert_eq!(field.template_for("hero"), Some("hero"));
		assert_eq!(field.template_for("CallToAction"), Some("call-to-action"));
		assert_eq!(field.template_for("footer"), None);
	}

	#[tokio::test]
	async fn items_are_tagged_with_their_member_type() {
		let ds = source();
		let raw = json!([
			{ "_template": "hero", "headline": "Hi" },
			{ "_template": "call-to-action", "url": "/go" }
		]);
		let res = blocks().initial_value(Some(&raw), &ds).await.unwrap();
		let Resolved::Value(Node::List(items)) = res else {
			panic!("expected a list of items");
		};
		let types: Vec<_> = items
			.iter()
			.map(|n| match n {
				Node::Object(r) => r.typename.clone().unwrap_or_default(),
				_ => String::new(),
			})
			.collect();
		assert_eq!(types, vec!["HeroInitialValues", "CallToActionInitialValues"]);
	}

	#[tokio::test]
	async fn items_without_a_template_are_rejected() {
		let ds = source();
		let err = blocks().value(Some(&json!([{ "headline": "Hi" }])), &ds).await.unwrap_err();
		assert!(matches!(err, GqlError::TypeError { .. }));
		let err = blocks().value(Some(&json!([{ "_template": "footer" }])), &ds).await.unwrap_err();
		assert!(matches!(err, GqlError::ResolverError(_)));
	}

	#[tokio::test]
	async fn tagged_input_is_stored_with_its_template() {
		let ds = source();
		let input = json!([{ "callToAction": { "url": "/go" } }, { "hero": { "headline": "Hi" } }]);
		let stored = blocks().input(&input, &ds).await.unwrap();
		assert_eq!(
			stored,
			json!([
				{ "url": "/go", "_template": "call-to-action" },
				{ "headline": "Hi", "_template": "hero" }
			])
		);
		let err = blocks()
			.input(&json!([{ "hero": { "headline": "Hi" }, "callToAction": { "url": "/" } }]), &ds)
			.await
			.unwrap_err();
		assert!(matches!(err, GqlError::InputError(_)));
	}
}
