//! The storage contract consumed by the schema builder and the resolver.
//!
//! A [`DataSource`] supplies template definitions, section settings and
//! documents, and accepts writes. Storage backends live outside this crate;
//! [`MemoryDataSource`] is provided for embedding and testing, and
//! [`RequestCache`] wraps any source to coalesce reads within one request.

mod cache;
mod mem;

pub use cache::RequestCache;
pub use mem::{MemoryDataSource, Stats};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::cnf::TEMPLATE_FIELD;
use crate::err::Error;
use crate::tpl::{Section, Template};

/// Identifies a document to read.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentArgs {
	pub relative_path: String,
	pub section: Option<String>,
}

impl DocumentArgs {
	pub fn new(relative_path: impl Into<String>) -> Self {
		DocumentArgs {
			relative_path: relative_path.into(),
			section: None,
		}
	}

	/// Names the section the document is read from.
	pub fn in_section(mut self, section: Option<&str>) -> Self {
		self.section = section.map(str::to_owned);
		self
	}
}

/// The arguments of a document write.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateArgs {
	pub relative_path: String,
	pub section: Option<String>,
	pub params: Document,
}

/// The arguments of a document creation.
#[derive(Clone, Debug, PartialEq)]
pub struct AddArgs {
	pub relative_path: String,
	pub section: Option<String>,
	pub template: String,
}

/// The persisted unit: a front-matter map and a body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
	pub path: String,
	#[serde(default)]
	pub data: Map<String, JsonValue>,
	#[serde(default)]
	pub content: String,
}

impl Document {
	pub fn new(path: impl Into<String>, data: Map<String, JsonValue>, content: impl Into<String>) -> Self {
		Document {
			path: path.into(),
			data,
			content: content.into(),
		}
	}

	/// The slug of the template this document was written with, if recorded.
	pub fn template(&self) -> Option<&str> {
		self.data.get(TEMPLATE_FIELD).and_then(JsonValue::as_str)
	}
}

#[async_trait::async_trait]
pub trait DataSource: Send + Sync + 'static {
	/// Returns the templates allowed in a section, or every template when no section is given.
	async fn get_templates_for_section(&self, section: Option<&str>) -> Result<Vec<Template>, Error>;

	async fn get_template(&self, slug: &str) -> Result<Template, Error>;

	async fn get_templates(&self, slugs: &[String]) -> Result<Vec<Template>, Error> {
		let mut out = Vec::with_capacity(slugs.len());
		for slug in slugs {
			out.push(self.get_template(slug).await?);
		}
		Ok(out)
	}

	async fn get_data(&self, args: &DocumentArgs) -> Result<Document, Error>;

	async fn get_template_for_document(&self, args: &DocumentArgs) -> Result<Template, Error>;

	/// Lists the document paths of a section, or of every section when no section is given.
	async fn get_documents_for_section(&self, section: Option<&str>) -> Result<Vec<String>, Error>;

	async fn get_sections_settings(&self) -> Result<Vec<Section>, Error>;

	async fn update_document(&self, args: UpdateArgs) -> Result<(), Error>;

	async fn add_document(&self, args: AddArgs) -> Result<(), Error>;
}
