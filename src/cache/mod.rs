//! Redis-backed lookup cache for catalog entities.
//!
//! The cache mirrors a subset of primary-store fields as Redis hashes under
//! composite textual keys (see [`keys`]) and is strictly best-effort: it
//! never originates entities and is never required for correctness. Callers
//! fall back to the primary store on [`CacheError::Miss`] and
//! [`CacheError::Unavailable`] and fill the cache afterwards.
//!
//! Entries carry no TTL; a cached record is authoritative until the next
//! overwrite.

mod codec;
pub mod keys;
mod store;

pub use store::{CallCounters, LookupCache};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing connection was never established. Sticky for the
    /// lifetime of the instance; operations fail fast without I/O.
    #[error("lookup cache is unavailable")]
    Unavailable,
    /// No cached record matched the requested key or pattern.
    #[error("no cache entry matched")]
    Miss,
    /// More than one key matched a wildcard pattern. Duplicate or stale
    /// entries are surfaced instead of silently picking a winner.
    #[error("pattern `{pattern}` matched {count} keys, expected exactly one")]
    Ambiguous { pattern: String, count: usize },
    /// Refused to cache an entity whose identity is the nil identifier.
    #[error("refusing to cache a {entity} with a nil id")]
    InvalidEntity { entity: &'static str },
    #[error("cache field `{field}` failed to decode: {message}")]
    Decode {
        field: &'static str,
        message: String,
    },
    #[error("cache operation timed out")]
    Timeout,
    #[error(transparent)]
    Backend(#[from] redis::RedisError),
}
