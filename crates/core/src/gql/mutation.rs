use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use super::error::{GqlError, input_error};
use super::resolve::{Node, load_document, resolve_input};
use crate::cnf::{BODY_FIELD, TEMPLATE_FIELD};
use crate::source::{AddArgs, DataSource, Document, DocumentArgs, UpdateArgs};

/// Picks the single populated key of a tagged input object.
///
/// Null members count as absent. Zero or several populated keys are rejected.
pub(crate) fn single_tag<'a>(
	value: &'a JsonValue,
	what: &str,
) -> Result<(&'a str, &'a JsonValue), GqlError> {
	let JsonValue::Object(map) = value else {
		return Err(input_error(format!("`{what}` expects an object keyed by template")));
	};
	let mut set = map.iter().filter(|(_, v)| !v.is_null());
	match (set.next(), set.next()) {
		(Some((key, value)), None) => Ok((key.as_str(), value)),
		(None, _) => Err(input_error(format!("`{what}` requires exactly one template key, found none"))),
		(Some(_), Some(_)) => {
			let keys: Vec<&str> =
				map.iter().filter(|(_, v)| !v.is_null()).map(|(k, _)| k.as_str()).collect();
			Err(input_error(format!(
				"`{what}` requires exactly one template key, found {}",
				keys.join(", ")
			)))
		}
	}
}

/// Validates a tagged document input, writes it and reads the document back.
///
/// `tags` maps the camelCase input keys to template slugs. Nothing is
/// written unless the whole input is valid.
pub(crate) async fn update_document(
	ds: &dyn DataSource,
	path: &str,
	params: &JsonValue,
	tags: &BTreeMap<String, String>,
) -> Result<Node, GqlError> {
	let (key, value) = single_tag(params, "params")?;
	let slug = tags.get(key).ok_or_else(|| input_error(format!("`{key}` is not a template")))?;
	let JsonValue::Object(map) = value else {
		return Err(input_error(format!("`{key}` expects an object")));
	};
	let template = ds.get_template(slug).await?;
	let mut data = resolve_input(template.shape(), map, ds).await?;
	let content = match data.remove(BODY_FIELD) {
		Some(JsonValue::String(body)) => body,
		Some(v) => return Err(input_error(format!("`{BODY_FIELD}` expects a string, found {v}"))),
		None => String::new(),
	};
	data.insert(TEMPLATE_FIELD.to_owned(), JsonValue::String(slug.clone()));
	let section = section_for(ds, path).await?;
	debug!("Updating document {path} with template {slug}");
	ds.update_document(UpdateArgs {
		relative_path: path.to_owned(),
		section: section.clone(),
		params: Document::new(path, data, content),
	})
	.await?;
	load_document(ds, &DocumentArgs::new(path).in_section(section.as_deref())).await
}

/// The name of the section holding `path`, if any named section does.
async fn section_for(ds: &dyn DataSource, path: &str) -> Result<Option<String>, GqlError> {
	let sections = ds.get_sections_settings().await?;
	Ok(sections.into_iter().filter(|s| s.contains(path)).find_map(|s| s.name))
}

/// Creates an empty document for a template and reads it back.
pub(crate) async fn add_document(
	ds: &dyn DataSource,
	path: &str,
	template: &str,
	section: Option<String>,
) -> Result<Node, GqlError> {
	debug!("Adding document {path} with template {template}");
	ds.add_document(AddArgs {
		relative_path: path.to_owned(),
		section: section.clone(),
		template: template.to_owned(),
	})
	.await?;
	load_document(ds, &DocumentArgs::new(path).in_section(section.as_deref())).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::err::Error;
	use crate::source::MemoryDataSource;
	use crate::tpl::{Section, Template};
	use serde_json::json;
	use std::sync::Mutex;

	fn tags() -> BTreeMap<String, String> {
		BTreeMap::from([
			("post".to_owned(), "post".to_owned()),
			("callToAction".to_owned(), "call-to-action".to_owned()),
		])
	}

	fn source() -> MemoryDataSource {
		MemoryDataSource::new()
			.with_template(json!({ "name": "post", "fields": [{ "type": "text", "name": "title" }] }))
			.with_template(json!({ "name": "call-to-action", "fields": [{ "type": "text", "name": "url" }] }))
			.with_document("posts/a.md", json!({ "_template": "post", "title": "Old" }), "old body")
	}

	#[test]
	fn tags_must_be_single() {
		assert!(single_tag(&json!({ "post": {} }), "params").is_ok());
		assert!(single_tag(&json!({ "post": {}, "callToAction": null }), "params").is_ok());
		assert!(matches!(single_tag(&json!({}), "params"), Err(GqlError::InputError(_))));
		assert!(matches!(
			single_tag(&json!({ "post": {}, "callToAction": {} }), "params"),
			Err(GqlError::InputError(m)) if m.contains("post") && m.contains("callToAction")
		));
		assert!(matches!(single_tag(&json!([]), "params"), Err(GqlError::InputError(_))));
	}

	#[tokio::test]
	async fn updates_split_the_body_from_the_data() {
		let ds = source();
		let params = json!({ "post": { "title": "New", "_body": "new body" } });
		update_document(&ds, "posts/a.md", &params, &tags()).await.unwrap();
		let stored = ds.document("posts/a.md").await.unwrap();
		assert_eq!(stored.content, "new body");
		assert_eq!(JsonValue::Object(stored.data), json!({ "title": "New", "_template": "post" }));
		assert_eq!(ds.stats().documents_written, 1);
	}

	#[tokio::test]
	async fn ambiguous_updates_write_nothing() {
		let ds = source();
		let params = json!({ "post": { "title": "New" }, "callToAction": { "url": "/" } });
		let err = update_document(&ds, "posts/a.md", &params, &tags()).await.unwrap_err();
		assert!(matches!(err, GqlError::InputError(_)));
		let err = update_document(&ds, "posts/a.md", &json!({ "post": { "nope": 1 } }), &tags())
			.await
			.unwrap_err();
		assert!(matches!(err, GqlError::InputError(_)));
		assert_eq!(ds.stats().documents_written, 0);
	}

	#[tokio::test]
	async fn added_documents_are_read_back() {
		let ds = source();
		let node = add_document(&ds, "cta/new.md", "call-to-action", None).await.unwrap();
		let Node::Object(record) = node else {
			panic!("expected a document");
		};
		assert_eq!(record.typename.as_deref(), Some("CallToActionDocument"));
		let err = add_document(&ds, "posts/a.md", "post", None).await.unwrap_err();
		assert!(matches!(err, GqlError::DbError(_)));
	}

	/// Records the section named by every document read and write.
	struct SectionLog {
		inner: MemoryDataSource,
		seen: Mutex<Vec<(&'static str, Option<String>)>>,
	}

	impl SectionLog {
		fn record(&self, op: &'static str, section: &Option<String>) {
			if let Ok(mut seen) = self.seen.lock() {
				seen.push((op, section.clone()));
			}
		}
	}

	#[async_trait::async_trait]
	impl DataSource for SectionLog {
		async fn get_templates_for_section(&self, section: Option<&str>) -> Result<Vec<Template>, Error> {
			self.inner.get_templates_for_section(section).await
		}

		async fn get_template(&self, slug: &str) -> Result<Template, Error> {
			self.inner.get_template(slug).await
		}

		async fn get_data(&self, args: &DocumentArgs) -> Result<Document, Error> {
			self.record("read", &args.section);
			self.inner.get_data(args).await
		}

		async fn get_template_for_document(&self, args: &DocumentArgs) -> Result<Template, Error> {
			self.inner.get_template_for_document(args).await
		}

		async fn get_documents_for_section(&self, section: Option<&str>) -> Result<Vec<String>, Error> {
			self.inner.get_documents_for_section(section).await
		}

		async fn get_sections_settings(&self) -> Result<Vec<Section>, Error> {
			self.inner.get_sections_settings().await
		}

		async fn update_document(&self, args: UpdateArgs) -> Result<(), Error> {
			self.record("update", &args.section);
			self.inner.update_document(args).await
		}

		async fn add_document(&self, args: AddArgs) -> Result<(), Error> {
			self.record("add", &args.section);
			self.inner.add_document(args).await
		}
	}

	#[tokio::test]
	async fn writes_name_the_enclosing_section() {
		let ds = SectionLog {
			inner: source().with_section(Section {
				name: Some("posts".into()),
				label: None,
				path: "posts".into(),
				templates: vec!["post".into()],
			}),
			seen: Mutex::new(Vec::new()),
		};
		update_document(&ds, "posts/a.md", &json!({ "post": { "title": "New" } }), &tags())
			.await
			.unwrap();
		add_document(&ds, "posts/b.md", "post", Some("posts".into())).await.unwrap();
		add_document(&ds, "cta/c.md", "call-to-action", None).await.unwrap();
		let posts = Some("posts".to_owned());
		assert_eq!(
			ds.seen.into_inner().unwrap(),
			vec![
				("update", posts.clone()),
				("read", posts.clone()),
				("add", posts.clone()),
				("read", posts),
				("add", None),
				("read", None),
			]
		);
	}
}
