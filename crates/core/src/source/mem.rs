use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Map, Value as JsonValue};
use tokio::sync::RwLock;

use super::{AddArgs, DataSource, Document, DocumentArgs, UpdateArgs};
use crate::cnf::TEMPLATE_FIELD;
use crate::err::Error;
use crate::tpl::{Section, Template};

/// Counters of the operations served by a [`MemoryDataSource`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
	/// Number of `get_data` calls
	pub documents_read: usize,
	/// Number of successful `update_document` and `add_document` calls
	pub documents_written: usize,
	/// Number of `get_documents_for_section` calls
	pub listings: usize,
}

#[derive(Default)]
struct Inner {
	templates: BTreeMap<String, JsonValue>,
	sections: Vec<Section>,
	documents: BTreeMap<String, Document>,
}

/// A data source holding raw template definitions, sections and documents in memory.
///
/// Templates are kept in their stored JSON form and parsed on every read,
/// so an invalid definition is reported by whichever operation reads it.
#[derive(Default)]
pub struct MemoryDataSource {
	inner: RwLock<Inner>,
	reads: AtomicUsize,
	writes: AtomicUsize,
	listings: AtomicUsize,
}

impl MemoryDataSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a raw template definition, keyed by its `name`.
	pub fn with_template(mut self, definition: JsonValue) -> Self {
		let slug = definition.get("name").and_then(JsonValue::as_str).unwrap_or_default().to_owned();
		self.inner.get_mut().templates.insert(slug, definition);
		self
	}

	/// Adds or replaces a raw template definition on a shared source.
	pub async fn put_template(&self, definition: JsonValue) {
		let slug = definition.get("name").and_then(JsonValue::as_str).unwrap_or_default().to_owned();
		self.inner.write().await.templates.insert(slug, definition);
	}

	pub fn with_section(mut self, section: Section) -> Self {
		self.inner.get_mut().sections.push(section);
		self
	}

	/// Adds a document. Non-object data is stored as an empty front matter.
	pub fn with_document(
		mut self,
		path: impl Into<String>,
		data: JsonValue,
		content: impl Into<String>,
	) -> Self {
		let path = path.into();
		let data = match data {
			JsonValue::Object(map) => map,
			_ => Map::new(),
		};
		self.inner.get_mut().documents.insert(path.clone(), Document::new(path, data, content));
		self
	}

	pub fn stats(&self) -> Stats {
		Stats {
			documents_read: self.reads.load(Ordering::SeqCst),
			documents_written: self.writes.load(Ordering::SeqCst),
			listings: self.listings.load(Ordering::SeqCst),
		}
	}

	/// Returns a stored document without counting it as a read.
	pub async fn document(&self, path: &str) -> Option<Document> {
		self.inner.read().await.documents.get(path).cloned()
	}

	fn parse(slug: &str, raw: &JsonValue) -> Result<Template, Error> {
		Template::from_json(raw.clone()).map_err(|e| Error::InvalidTemplate {
			name: slug.to_owned(),
			message: e.to_string(),
		})
	}
}

fn section_by_name<'a>(sections: &'a [Section], name: &str) -> Result<&'a Section, Error> {
	sections.iter().find(|s| s.matches(name)).ok_or_else(|| Error::SectionNotFound(name.to_owned()))
}

#[async_trait::async_trait]
impl DataSource for MemoryDataSource {
	async fn get_templates_for_section(&self, section: Option<&str>) -> Result<Vec<Template>, Error> {
		let inner = self.inner.read().await;
		match section {
			None => inner.templates.iter().map(|(slug, raw)| Self::parse(slug, raw)).collect(),
			Some(name) => {
				let section = section_by_name(&inner.sections, name)?;
				section
					.templates
					.iter()
					.map(|slug| match inner.templates.get(slug) {
						Some(raw) => Self::parse(slug, raw),
						None => Err(Error::TemplateNotFound(slug.clone())),
					})
					.collect()
			}
		}
	}

	async fn get_template(&self, slug: &str) -> Result<Template, Error> {
		let inner = self.inner.read().await;
		match inner.templates.get(slug) {
			Some(raw) => Self::parse(slug, raw),
			None => Err(Error::TemplateNotFound(slug.to_owned())),
		}
	}

	async fn get_data(&self, args: &DocumentArgs) -> Result<Document, Error> {
		self.reads.fetch_add(1, Ordering::SeqCst);
		let inner = self.inner.read().await;
		inner
			.documents
			.get(&args.relative_path)
			.cloned()
			.ok_or_else(|| Error::DocumentNotFound(args.relative_path.clone()))
	}

	async fn get_template_for_document(&self, args: &DocumentArgs) -> Result<Template, Error> {
		let inner = self.inner.read().await;
		let path = &args.relative_path;
		let document =
			inner.documents.get(path).ok_or_else(|| Error::DocumentNotFound(path.clone()))?;
		let slug = match document.template() {
			Some(slug) => slug.to_owned(),
			None => {
				// Fall back to the only template of the enclosing section
				let section = match &args.section {
					Some(name) => Some(section_by_name(&inner.sections, name)?),
					None => inner.sections.iter().find(|s| s.contains(path)),
				};
				match section.map(|s| s.templates.as_slice()) {
					Some([slug]) => slug.clone(),
					_ => return Err(Error::NoTemplateForDocument(path.clone())),
				}
			}
		};
		match inner.templates.get(&slug) {
			Some(raw) => Self::parse(&slug, raw),
			None => Err(Error::TemplateNotFound(slug)),
		}
	}

	async fn get_documents_for_section(&self, section: Option<&str>) -> Result<Vec<String>, Error> {
		self.listings.fetch_add(1, Ordering::SeqCst);
		let inner = self.inner.read().await;
		match section {
			None => Ok(inner.documents.keys().cloned().collect()),
			Some(name) => {
				let section = section_by_name(&inner.sections, name)?;
				Ok(inner.documents.keys().filter(|p| section.contains(p)).cloned().collect())
			}
		}
	}

	async fn get_sections_settings(&self) -> Result<Vec<Section>, Error> {
		Ok(self.inner.read().await.sections.clone())
	}

	async fn update_document(&self, args: UpdateArgs) -> Result<(), Error> {
		let mut inner = self.inner.write().await;
		let path = args.relative_path;
		let Some(document) = inner.documents.get_mut(&path) else {
			return Err(Error::DocumentNotFound(path));
		};
		document.data = args.params.data;
		document.content = args.params.content;
		self.writes.fetch_add(1, Ordering::SeqCst);
		trace!("Updated document {path}");
		Ok(())
	}

	async fn add_document(&self, args: AddArgs) -> Result<(), Error> {
		let mut inner = self.inner.write().await;
		let path = args.relative_path;
		if inner.documents.contains_key(&path) {
			return Err(Error::DocumentExists(path));
		}
		if !inner.templates.contains_key(&args.template) {
			return Err(Error::TemplateNotFound(args.template));
		}
		if let Some(name) = &args.section {
			let section = section_by_name(&inner.sections, name)?;
			if !section.contains(&path) {
				return Err(Error::Ds(format!("The path `{path}` is outside of the section `{name}`")));
			}
		}
		let mut data = Map::new();
		data.insert(TEMPLATE_FIELD.to_owned(), JsonValue::String(args.template));
		inner.documents.insert(path.clone(), Document::new(path.clone(), data, ""));
		self.writes.fetch_add(1, Ordering::SeqCst);
		trace!("Added document {path}");
		Ok(())
	}
}
