//! GraphQL support for content templates.
//!
//! This module implements a dynamic GraphQL schema that is generated from the
//! template definitions of a [`DataSource`](crate::source::DataSource). The
//! schema is regenerated only when the cache holding it is invalidated.
//!
//! ## Architecture
//!
//! The GraphQL subsystem is split into layers:
//!
//! - **Schema generation** ([`schema`]) -- the main entry point that loads and validates the
//!   templates, then builds a complete `async_graphql::dynamic::Schema` with its Query and
//!   Mutation roots.
//! - **Type registry** ([`registry`]) -- memoises every generated type by name, and rejects two
//!   definitions that would produce the same name.
//! - **Fields** (`fields`) -- the build-side and resolve-side operations of every field kind,
//!   dispatched over the closed set of kinds.
//! - **Resolution** ([`resolve`]) -- the record tree produced for a document, and the single
//!   field resolver which loads referenced documents only when they are selected.
//! - **Mutations** (`mutation`) -- tagged document input validation and writes.
//! - **Caching** ([`cache`]) -- keeps the generated schema and runs each request through its own
//!   read cache.
//! - **Error handling** ([`error`]) -- domain error type ([`GqlError`]) with helper constructors.

pub mod cache;
pub mod error;
mod fields;
mod mutation;
pub mod registry;
pub mod resolve;
pub mod schema;

pub use cache::*;
pub use error::GqlError;
pub use schema::generate_schema;
