use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use super::{AddArgs, DataSource, Document, DocumentArgs, UpdateArgs};
use crate::err::Error;
use crate::tpl::{Section, Template};

type Cells<K, V> = Mutex<HashMap<K, Arc<OnceCell<V>>>>;

/// A per-request read cache in front of a [`DataSource`].
///
/// Reads of the same document, template or section listing within one
/// request are coalesced: concurrent callers wait on a single fetch. Writes
/// pass straight through and evict every cached entry they could affect
/// before returning. A cache must not outlive the request it was created for.
pub struct RequestCache {
	inner: Arc<dyn DataSource>,
	documents: Cells<String, Document>,
	document_templates: Cells<String, Template>,
	templates: Cells<String, Template>,
	listings: Cells<Option<String>, Vec<String>>,
	sections: OnceCell<Vec<Section>>,
}

impl RequestCache {
	pub fn new(inner: Arc<dyn DataSource>) -> Self {
		RequestCache {
			inner,
			documents: Default::default(),
			document_templates: Default::default(),
			templates: Default::default(),
			listings: Default::default(),
			sections: OnceCell::new(),
		}
	}

	async fn cell<K, V>(cells: &Cells<K, V>, key: K) -> Arc<OnceCell<V>>
	where
		K: Eq + Hash,
	{
		cells.lock().await.entry(key).or_default().clone()
	}

	/// Evicts everything a write to `path` could have changed.
	async fn invalidate(&self, path: &str) {
		self.documents.lock().await.remove(path);
		self.document_templates.lock().await.remove(path);
		self.listings.lock().await.clear();
		trace!("Invalidated cached reads for {path}");
	}
}

#[async_trait::async_trait]
impl DataSource for RequestCache {
	async fn get_templates_for_section(&self, section: Option<&str>) -> Result<Vec<Template>, Error> {
		self.inner.get_templates_for_section(section).await
	}

	async fn get_template(&self, slug: &str) -> Result<Template, Error> {
		let cell = Self::cell(&self.templates, slug.to_owned()).await;
		cell.get_or_try_init(|| self.inner.get_template(slug)).await.cloned()
	}

	async fn get_data(&self, args: &DocumentArgs) -> Result<Document, Error> {
		let cell = Self::cell(&self.documents, args.relative_path.clone()).await;
		cell.get_or_try_init(|| self.inner.get_data(args)).await.cloned()
	}

	async fn get_template_for_document(&self, args: &DocumentArgs) -> Result<Template, Error> {
		let cell = Self::cell(&self.document_templates, args.relative_path.clone()).await;
		cell.get_or_try_init(|| self.inner.get_template_for_document(args)).await.cloned()
	}

	async fn get_documents_for_section(&self, section: Option<&str>) -> Result<Vec<String>, Error> {
		let cell = Self::cell(&self.listings, section.map(str::to_owned)).await;
		cell.get_or_try_init(|| self.inner.get_documents_for_section(section)).await.cloned()
	}

	async fn get_sections_settings(&self) -> Result<Vec<Section>, Error> {
		self.sections.get_or_try_init(|| self.inner.get_sections_settings()).await.cloned()
	}

	async fn update_document(&self, args: UpdateArgs) -> Result<(), Error> {
		let path = args.relative_path.clone();
		let res = self.inner.update_document(args).await;
		self.invalidate(&path).await;
		res
	}

	async fn add_document(&self, args: AddArgs) -> Result<(), Error> {
		let path = args.relative_path.clone();
		let res = self.inner.add_document(args).await;
		self.invalidate(&path).await;
		res
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::MemoryDataSource;
	use serde_json::{Map, json};

	fn memory() -> Arc<MemoryDataSource> {
		Arc::new(
			MemoryDataSource::new()
				.with_template(json!({ "name": "post", "fields": [{ "type": "text", "name": "title" }] }))
				.with_document("a.md", json!({ "_template": "post", "title": "Hi" }), ""),
		)
	}

	#[tokio::test]
	async fn repeated_reads_hit_the_source_once() {
		let ds = memory();
		let cache = RequestCache::new(ds.clone());
		let args = DocumentArgs::new("a.md");
		let (a, b) = tokio::join!(cache.get_data(&args), cache.get_data(&args));
		assert_eq!(a.unwrap(), b.unwrap());
		cache.get_data(&args).await.unwrap();
		assert_eq!(ds.stats().documents_read, 1);
	}

	#[tokio::test]
	async fn failed_reads_are_not_cached() {
		let ds = memory();
		let cache = RequestCache::new(ds.clone());
		let args = DocumentArgs::new("missing.md");
		assert!(cache.get_data(&args).await.is_err());
		assert!(cache.get_data(&args).await.is_err());
		assert_eq!(ds.stats().documents_read, 2);
	}

	#[tokio::test]
	async fn writes_invalidate_cached_reads() {
		let ds = memory();
		let cache = RequestCache::new(ds.clone());
		let args = DocumentArgs::new("a.md");
		assert_eq!(cache.get_data(&args).await.unwrap().data["title"], json!("Hi"));

		let mut data = Map::new();
		data.insert("_template".into(), json!("post"));
		data.insert("title".into(), json!("Bye"));
		cache
			.update_document(UpdateArgs {
				relative_path: "a.md".into(),
				section: None,
				params: Document::new("a.md", data, ""),
			})
			.await
			.unwrap();

		assert_eq!(cache.get_data(&args).await.unwrap().data["title"], json!("Bye"));
		assert_eq!(ds.stats().documents_read, 2);
	}

	#[tokio::test]
	async fn additions_invalidate_listings() {
		let ds = memory();
		let cache = RequestCache::new(ds.clone());
		assert_eq!(cache.get_documents_for_section(None).await.unwrap().len(), 1);
		cache
			.add_document(AddArgs {
				relative_path: "b.md".into(),
				section: None,
				template: "post".into(),
			})
			.await
			.unwrap();
		assert_eq!(cache.get_documents_for_section(None).await.unwrap().len(), 2);
	}
}
