use async_graphql::dynamic::TypeRef;
use serde_json::Value as JsonValue;

use super::reference::{options, reference_list, reference_list_type, section_of};
use super::{
	BuildField, ResolveField, coerce_strings, describe, paths, resolved_field, scalar, shared_form,
};
use crate::gql::error::GqlError;
use crate::gql::registry::TypeRegistry;
use crate::gql::resolve::{Node, Record, Resolved};
use crate::gql::schema::Catalog;
use crate::source::DataSource;
use crate::tpl::{ImageGalleryField, ListField, TagListField};

impl BuildField for ListField {
	fn form(&self, reg: &mut TypeRegistry, _: &Catalog) -> Result<String, GqlError> {
		shared_form(reg, self.kind(), "ListField", |obj| {
			obj.field(resolved_field("options", TypeRef::named_nn_list(TypeRef::STRING)))
		})
	}

	fn value_type(&self, reg: &mut TypeRegistry, cat: &Catalog) -> Result<TypeRef, GqlError> {
		if self.config.source.is_reference() {
			let name = reference_list_type(reg, cat, section_of(&self.config.source))?;
			Ok(TypeRef::named(name))
		} else {
			Ok(TypeRef::named_list(TypeRef::STRING))
		}
	}

	fn input_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
		Ok(TypeRef::named_list(TypeRef::STRING))
	}
}

#[async_trait::async_trait]
impl ResolveField for ListField {
	fn field(&self) -> Record {
		describe("ListField", &self.name, self.label(), self.kind(), self.config.required)
			.with("options", options(&self.config))
	}

	async fn value(&self, raw: Option<&JsonValue>, _: &dyn DataSource) -> Result<Resolved, GqlError> {
		let kind = self.kind();
		if self.config.source.is_reference() {
			let section = section_of(&self.config.source);
			scalar(raw, |v| Ok(Node::Object(reference_list(paths(kind, v)?, section))))
		} else {
			scalar(raw, |v| coerce_strings(kind, v))
		}
	}
}

// Kinds stored and exposed as a plain list of strings
macro_rules! strings_field {
	($ty:ident, $form:literal) => {
		impl BuildField for $ty {
			fn form(&self, reg: &mut TypeRegistry, _: &Catalog) -> Result<String, GqlError> {
				shared_form(reg, self.kind(), $form, |obj| obj)
			}

			fn value_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
				Ok(TypeRef::named_list(TypeRef::STRING))
			}

			fn input_type(&self, _: &mut TypeRegistry, _: &Catalog) -> Result<TypeRef, GqlError> {
				Ok(TypeRef::named_list(TypeRef::STRING))
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
				scalar(raw, |v| coerce_strings(kind, v))
			}
		}
	};
}

strings_field!(TagListField, "TagListField");
strings_field!(ImageGalleryField, "ImageGalleryField");

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gql::resolve::Deferred;
	use crate::source::{DocumentArgs, MemoryDataSource};
	use crate::tpl::{FieldConfig, FieldKind, OptionsConfig, Source};
	use serde_json::json;

	#[tokio::test]
	async fn reference_lists_defer_every_document() {
		let ds = MemoryDataSource::new();
		let list = ListField {
			name: "related".into(),
			label: None,
			config: OptionsConfig {
				source: Source::Documents {
					paths: vec![],
				},
				..Default::default()
			},
		};
		let res = list.value(Some(&json!(["a.md", "b.md"])), &ds).await.unwrap();
		let Resolved::Value(Node::Object(record)) = res else {
			panic!("expected a reference list");
		};
		assert!(matches!(
			record.get("documents"),
			Some(Resolved::Deferred(Deferred::Many(a)))
				if a == &[DocumentArgs::new("a.md"), DocumentArgs::new("b.md")]
		));
	}

	#[tokio::test]
	async fn galleries_must_be_lists() {
		let ds = MemoryDataSource::new();
		let gallery = ImageGalleryField {
			name: "photos".into(),
			label: None,
			config: FieldConfig::default(),
		};
		let err = gallery.value(Some(&json!("one.png")), &ds).await.unwrap_err();
		assert!(matches!(err, GqlError::TypeError { target: FieldKind::ImageGallery, .. }));
		let res = gallery.value(Some(&json!(["one.png", "two.png"])), &ds).await.unwrap();
		assert!(matches!(res, Resolved::Value(Node::List(items)) if items.len() == 2));
	}
}
