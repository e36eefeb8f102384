//! Stacks: the lookup core of a small catalog service.
//!
//! Two components composed behind a read-through contract:
//!
//! - **Store**: durable Postgres persistence for books, authors and pages
//!   ([`infra::db::PostgresCatalog`]).
//! - **Lookup cache**: a Redis hash front end keyed by composite
//!   slug/identifier keys ([`cache::LookupCache`]), strictly best-effort.
//!
//! [`application::catalog::CatalogReader`] ties the two together: cache
//! first; on a miss or an unavailable cache, the store; then a best-effort
//! cache fill whose failure is logged, never surfaced. The API layer
//! consuming this crate (GraphQL resolvers, HTTP) lives elsewhere.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
