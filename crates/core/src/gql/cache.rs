use tokio::sync::RwLock;

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response};

use crate::source::{DataSource, RequestCache};

use super::error::GqlError;
use super::resolve::RequestSource;
use super::schema::generate_schema;

/// Decides when a cached schema has to be rebuilt.
pub trait Invalidator: Debug + Clone + Send + Sync + 'static {
	/// Whether a schema built for an earlier request may be served again.
	fn is_valid() -> bool;
}

/// Rebuilds the schema for every request.
#[derive(Debug, Clone, Copy)]
pub struct Pessimistic;

impl Invalidator for Pessimistic {
	fn is_valid() -> bool {
		false
	}
}

/// Keeps the schema until [`SchemaCache::invalidate`] is called.
#[derive(Debug, Clone, Copy)]
pub struct Optimistic;

impl Invalidator for Optimistic {
	fn is_valid() -> bool {
		true
	}
}

#[derive(Clone)]
pub struct SchemaCache<I: Invalidator = Optimistic> {
	inner: Arc<RwLock<Option<Schema>>>,
	pub source: Arc<dyn DataSource>,
	_invalidator: PhantomData<I>,
}

impl<I: Invalidator + Debug> Debug for SchemaCache<I> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SchemaCache")
			.field("inner", &self.inner)
			.field("_invalidator", &self._invalidator)
			.finish()
	}
}

impl<I: Invalidator> SchemaCache<I> {
	pub fn new(source: Arc<dyn DataSource>) -> Self {
		SchemaCache {
			inner: Default::default(),
			source,
			_invalidator: PhantomData,
		}
	}

	pub async fn get_schema(&self) -> Result<Schema, GqlError> {
		if I::is_valid() {
			let guard = self.inner.read().await;
			if let Some(schema) = guard.as_ref() {
				return Ok(schema.clone());
			}
		}

		let schema = generate_schema(&self.source).await?;

		{
			let mut guard = self.inner.write().await;
			*guard = Some(schema.clone());
		}

		Ok(schema)
	}

	/// Drops the cached schema, so the next request rebuilds it from the
	/// current templates.
	pub async fn invalidate(&self) {
		trace!("Invalidating the cached schema");
		self.inner.write().await.take();
	}

	/// Executes a request against the cached schema.
	///
	/// Each request reads through its own [`RequestCache`].
	pub async fn execute(&self, request: impl Into<Request>) -> Result<Response, GqlError> {
		let schema = self.get_schema().await?;
		let cache: Arc<dyn DataSource> = Arc::new(RequestCache::new(self.source.clone()));
		let request = request.into().data(RequestSource(cache));
		Ok(schema.execute(request).await)
	}
}
