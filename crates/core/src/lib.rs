//! # Contentgraph Core
//!
//! This crate turns a set of declarative content templates into a typed
//! GraphQL schema, and resolves queries and mutations against that schema
//! by reading and writing documents through a pluggable [`DataSource`].
//!
//! The crate is organised in layers:
//!
//! - [`tpl`] -- the template and field definitions, including namespace assignment for nested
//!   field groups.
//! - [`source`] -- the [`DataSource`] contract, an in-memory implementation, and the
//!   per-request read cache.
//! - [`gql`] -- the type registry, the per-field build and resolve operations, the schema
//!   builder, the lazy resolver, and the schema cache used to execute requests.
//!
//! [`DataSource`]: crate::source::DataSource

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
pub mod err;
pub mod gql;
pub mod source;
pub mod tpl;
