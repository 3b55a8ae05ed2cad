use async_graphql::dynamic::{Object, Type, TypeRef, Union};

use super::resolved_field;
use crate::cnf::DOCUMENT_UNION;
use crate::gql::error::GqlError;
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Deferred, Node, Record, Resolved};
use crate::gql::schema::{Catalog, document_type};
use crate::source::DocumentArgs;
use crate::tpl::{OptionsConfig, Source, Template, pascal_case};

/// Registers the union over the documents of every template.
pub(crate) fn document_union(reg: &mut TypeRegistry, cat: &Catalog) -> Result<String, GqlError> {
	let templates: Vec<&Template> = cat.templates().collect();
	reg.build(DOCUMENT_UNION, "documents", |reg| union_over(reg, cat, DOCUMENT_UNION, &templates))
}

/// Registers the union over the documents a section may hold.
pub(crate) fn section_union(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	section: &str,
) -> Result<String, GqlError> {
	let name = format!("{}DocumentUnion", pascal_case(section));
	let templates = cat.section_templates(section)?;
	reg.build(name.clone(), format!("section:{section}"), |reg| {
		union_over(reg, cat, &name, &templates)
	})
}

fn union_over(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	name: &str,
	templates: &[&Template],
) -> Result<Type, GqlError> {
	let mut union = Union::new(name);
	for template in templates {
		union = union.possible_type(document_type(reg, cat, template)?);
	}
	Ok(Type::Union(union))
}

fn union_for(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	section: Option<&str>,
) -> Result<String, GqlError> {
	match section {
		Some(section) => section_union(reg, cat, section),
		None => document_union(reg, cat),
	}
}

/// Registers `<Section>DocumentReference`, or `DocumentReference` when the
/// reference may point anywhere.
pub(crate) fn reference_type(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	section: Option<&str>,
) -> Result<String, GqlError> {
	let name = format!("{}DocumentReference", section.map(pascal_case).unwrap_or_default());
	let origin = format!("reference:{}", section.unwrap_or("*"));
	reg.build(name.clone(), origin, |reg| {
		let union = union_for(reg, cat, section)?;
		Ok(Type::Object(
			Object::new(&name)
				.field(resolved_field("path", TypeRef::named_nn(TypeRef::STRING)))
				.field(resolved_field("document", TypeRef::named(union))),
		))
	})
}

/// Registers `<Section>DocumentReferenceList`, or `DocumentReferenceList`.
pub(crate) fn reference_list_type(
	reg: &mut TypeRegistry,
	cat: &Catalog,
	section: Option<&str>,
) -> Result<String, GqlError> {
	let name = format!("{}DocumentReferenceList", section.map(pascal_case).unwrap_or_default());
	let origin = format!("reference-list:{}", section.unwrap_or("*"));
	reg.build(name.clone(), origin, |reg| {
		let union = union_for(reg, cat, section)?;
		Ok(Type::Object(
			Object::new(&name)
				.field(resolved_field("paths", TypeRef::named_nn_list_nn(TypeRef::STRING)))
				.field(resolved_field("documents", TypeRef::named_nn_list(union))),
		))
	})
}

/// The section a reference points into, if it is limited to one.
pub(crate) fn section_of(source: &Source) -> Option<&str> {
	match source {
		Source::Pages {
			section,
		} => Some(section),
		_ => None,
	}
}

/// A reference to one document, read from `section` when it is known.
pub(crate) fn reference(path: String, section: Option<&str>) -> Record {
	let args = DocumentArgs::new(path.clone()).in_section(section);
	Record::new().with("path", Node::string(path)).with("document", Deferred::Single(args))
}

pub(crate) fn reference_list(paths: Vec<String>, section: Option<&str>) -> Record {
	let documents =
		paths.iter().map(|p| DocumentArgs::new(p.as_str()).in_section(section)).collect();
	Record::new().with("paths", Node::strings(paths)).with("documents", Deferred::Many(documents))
}

/// The `options` of a select or list descriptor.
pub(crate) fn options(config: &OptionsConfig) -> Resolved {
	match &config.source {
		Source::Simple => Node::strings(config.options.clone()).into(),
		Source::Pages {
			section,
		} => Deferred::Listing(Some(section.clone())).into(),
		Source::Documents {
			paths,
		} => Node::strings(paths.clone()).into(),
	}
}
