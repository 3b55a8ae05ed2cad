//! Template and section definitions.
//!
//! Templates are loaded fresh for every schema build. Every template, and
//! every group nested inside it, carries a namespace: the chain of names
//! from the top-level template down to the group. Generated type names are
//! derived from this chain only, so two groups with the same field name in
//! different templates never share a type.

mod field;

pub use field::*;

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

static BODY: LazyLock<Field> = LazyLock::new(Field::body);

/// A declarative description of one content shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "TemplateDefinition")]
pub struct Template {
	pub name: String,
	pub label: String,
	pub fields: Vec<Field>,
	#[serde(skip_serializing)]
	pub namespace: Vec<String>,
}

#[derive(Deserialize)]
struct TemplateDefinition {
	name: String,
	#[serde(default)]
	label: Option<String>,
	#[serde(default)]
	fields: Vec<Field>,
}

impl From<TemplateDefinition> for Template {
	fn from(def: TemplateDefinition) -> Self {
		Template::new(def.name.clone(), def.label.unwrap_or(def.name), def.fields)
	}
}

impl Template {
	/// Creates a top-level template, assigning namespaces to nested groups.
	pub fn new(name: impl Into<String>, label: impl Into<String>, fields: Vec<Field>) -> Self {
		let name = name.into();
		let namespace = vec![name.clone()];
		let mut fields = fields;
		for field in fields.iter_mut() {
			field.assign_namespace(&namespace);
		}
		Template {
			name,
			label: label.into(),
			fields,
			namespace,
		}
	}

	/// Parses a template from its stored JSON representation.
	pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
		serde_json::from_value(value)
	}

	/// The base from which every type generated for this template is named.
	pub fn base_name(&self) -> String {
		type_name(&self.namespace)
	}

	pub fn shape(&self) -> Shape<'_> {
		Shape {
			name: &self.name,
			label: &self.label,
			namespace: &self.namespace,
			fields: &self.fields,
			root: true,
		}
	}
}

/// A borrowed view over anything with a namespace and a list of fields:
/// a template, or a group embedded inline in one.
#[derive(Clone, Copy, Debug)]
pub struct Shape<'a> {
	pub name: &'a str,
	pub label: &'a str,
	pub namespace: &'a [String],
	pub fields: &'a [Field],
	/// Whether this shape is a top-level template, which carries the document body.
	pub root: bool,
}

impl Shape<'_> {
	pub fn base_name(&self) -> String {
		type_name(self.namespace)
	}

	/// The namespace key used to identify this shape in the type registry.
	pub fn origin(&self) -> String {
		self.namespace.join(".")
	}
}

impl<'a> Shape<'a> {
	/// The declared fields, followed by the implicit body field on top-level templates.
	pub fn all_fields(self) -> impl Iterator<Item = &'a Field> {
		let body: Option<&'a Field> = if self.root {
			Some(&*BODY)
		} else {
			None
		};
		self.fields.iter().chain(body)
	}

	/// Nesting depth below the top-level template.
	pub fn depth(&self) -> usize {
		self.namespace.len().saturating_sub(1)
	}
}

impl GroupField {
	pub fn shape(&self) -> Shape<'_> {
		Shape {
			name: &self.name,
			label: self.label(),
			namespace: &self.namespace,
			fields: &self.fields,
			root: false,
		}
	}
}

impl GroupListField {
	pub fn shape(&self) -> Shape<'_> {
		Shape {
			name: &self.name,
			label: self.label(),
			namespace: &self.namespace,
			fields: &self.fields,
			root: false,
		}
	}
}

impl BlocksField {
	pub fn base_name(&self) -> String {
		type_name(&self.namespace)
	}
}

/// A directory of documents, and the templates allowed inside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub label: Option<String>,
	pub path: String,
	#[serde(default)]
	pub templates: Vec<String>,
}

impl Section {
	pub fn label(&self) -> &str {
		self.label.as_deref().or(self.name.as_deref()).unwrap_or(&self.path)
	}

	/// Whether a document path lives inside this section's directory.
	pub fn contains(&self, path: &str) -> bool {
		let dir = self.path.trim_end_matches('/');
		if dir.is_empty() {
			return true;
		}
		path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
	}

	pub fn matches(&self, name: &str) -> bool {
		self.name.as_deref() == Some(name)
	}
}

/// Joins a namespace into a PascalCase type name.
pub fn type_name(namespace: &[String]) -> String {
	namespace.iter().map(|n| pascal_case(n)).collect()
}

/// Converts a slug such as `call-to-action` or `call_to_action` into `CallToAction`.
pub fn pascal_case(value: &str) -> String {
	value
		.split(|c: char| !c.is_ascii_alphanumeric())
		.filter(|s| !s.is_empty())
		.map(|segment| {
			let mut chars = segment.chars();
			match chars.next() {
				Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
				None => String::new(),
			}
		})
		.collect()
}

/// Converts a slug into a camelCase GraphQL field name.
pub fn camel_case(value: &str) -> String {
	let pascal = pascal_case(value);
	let mut chars = pascal.chars();
	match chars.next() {
		Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
		None => String::new(),
	}
}

/// Whether a string is usable as a GraphQL name.
pub fn is_valid_name(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(c) if c == '_' || c.is_ascii_alphabetic() => {
			chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
		}
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn namespaces_follow_nested_groups() {
		let tpl = Template::from_json(json!({
			"name": "post",
			"fields": [
				{ "type": "text", "name": "title" },
				{ "type": "field_group", "name": "cta", "fields": [
					{ "type": "field_group_list", "name": "links", "fields": [
						{ "type": "text", "name": "url" }
					]}
				]},
				{ "type": "blocks", "name": "sections", "template_types": ["hero"] }
			]
		}))
		.unwrap();
		assert_eq!(tpl.label, "post");
		assert_eq!(tpl.base_name(), "Post");
		let Field::FieldGroup(cta) = &tpl.fields[1] else {
			panic!("expected a group");
		};
		assert_eq!(cta.namespace, vec!["post", "cta"]);
		assert_eq!(cta.shape().base_name(), "PostCta");
		let Field::FieldGroupList(links) = &cta.fields[0] else {
			panic!("expected a group list");
		};
		assert_eq!(links.shape().base_name(), "PostCtaLinks");
		assert_eq!(links.shape().origin(), "post.cta.links");
		let Field::Blocks(blocks) = &tpl.fields[2] else {
			panic!("expected blocks");
		};
		assert_eq!(blocks.base_name(), "PostSections");
	}

	#[test]
	fn same_group_in_different_templates_gets_distinct_names() {
		let group = json!({ "type": "field_group", "name": "cta", "fields": [{ "type": "text", "name": "label" }] });
		let post = Template::from_json(json!({ "name": "post", "fields": [group.clone()] })).unwrap();
		let page = Template::from_json(json!({ "name": "page", "fields": [group] })).unwrap();
		let name = |t: &Template| match &t.fields[0] {
			Field::FieldGroup(g) => g.shape().base_name(),
			_ => unreachable!(),
		};
		assert_eq!(name(&post), "PostCta");
		assert_eq!(name(&page), "PageCta");
	}

	#[test]
	fn body_is_appended_to_templates_only() {
		let tpl = Template::from_json(json!({
			"name": "post",
			"fields": [
				{ "type": "text", "name": "title" },
				{ "type": "field_group", "name": "cta", "fields": [{ "type": "text", "name": "url" }] }
			]
		}))
		.unwrap();
		let names: Vec<_> = tpl.shape().all_fields().map(Field::name).collect();
		assert_eq!(names, vec!["title", "cta", "_body"]);
		let Field::FieldGroup(cta) = &tpl.fields[1] else {
			panic!("expected a group");
		};
		let names: Vec<_> = cta.shape().all_fields().map(Field::name).collect();
		assert_eq!(names, vec!["url"]);
		assert_eq!(cta.shape().depth(), 1);
	}

	#[test]
	fn case_conversion() {
		assert_eq!(pascal_case("call-to-action"), "CallToAction");
		assert_eq!(pascal_case("hero_image"), "HeroImage");
		assert_eq!(pascal_case("myField"), "MyField");
		assert_eq!(camel_case("call-to-action"), "callToAction");
		assert_eq!(camel_case("Hero"), "hero");
	}

	#[test]
	fn valid_names() {
		assert!(is_valid_name("_body"));
		assert!(is_valid_name("title2"));
		assert!(!is_valid_name("2title"));
		assert!(!is_valid_name("hero-image"));
		assert!(!is_valid_name(""));
	}

	#[test]
	fn section_contains_paths() {
		let section = Section {
			name: Some("posts".into()),
			label: None,
			path: "content/posts/".into(),
			templates: vec!["post".into()],
		};
		assert!(section.contains("content/posts/a.md"));
		assert!(!section.contains("content/postsx/a.md"));
		assert!(!section.contains("content/authors/a.md"));
		assert_eq!(section.label(), "posts");
	}
}
