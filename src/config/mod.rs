//! Configuration layer: typed settings with layered precedence (file → env).
//!
//! Settings are resolved once at process start and handed to the store and
//! cache constructors by value; the core never reads ambient environment
//! state on its own.

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::slug::DEFAULT_SEPARATOR;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "stacks";
const ENV_PREFIX: &str = "STACKS";

const DEFAULT_DB_MAX_CONNECTIONS: NonZeroU32 = match NonZeroU32::new(8) {
    Some(value) => value,
    None => unreachable!(),
};
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CACHE_SCAN_COUNT: NonZeroU32 = match NonZeroU32::new(64) {
    Some(value) => value,
    None => unreachable!(),
};
const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 2_000;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub slug: SlugSettings,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: NonZeroU32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Absent means the lookup cache is constructed unavailable and every
    /// read goes straight to the store.
    pub url: Option<String>,
    /// COUNT hint handed to the backing store's cursor scan.
    pub scan_count: NonZeroU32,
    /// Deadline applied to each network operation.
    pub op_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            url: None,
            scan_count: DEFAULT_CACHE_SCAN_COUNT,
            op_timeout: Duration::from_millis(DEFAULT_CACHE_OP_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlugSettings {
    pub separator: char,
}

impl Default for SlugSettings {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (files, then environment).
pub fn load() -> Result<Settings, LoadError> {
    load_from(None)
}

/// Like [`load`], with an extra required configuration file on top.
pub fn load_from(path: Option<&Path>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }

    let raw: RawSettings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    slug: RawSlugSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    acquire_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    url: Option<String>,
    scan_count: Option<u32>,
    op_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSlugSettings {
    separator: Option<String>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            database,
            cache,
            slug,
        } = raw;

        Ok(Self {
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
            slug: build_slug_settings(slug)?,
        })
    }
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database
        .url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::invalid("database.url", "must be set"))?
        .to_string();

    let max_connections = match database.max_connections {
        Some(value) => non_zero_u32(value, "database.max_connections")?,
        None => DEFAULT_DB_MAX_CONNECTIONS,
    };

    let acquire_secs = database
        .acquire_timeout_seconds
        .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS);
    if acquire_secs == 0 {
        return Err(LoadError::invalid(
            "database.acquire_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(DatabaseSettings {
        url,
        max_connections,
        acquire_timeout: Duration::from_secs(acquire_secs),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let url = cache.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let scan_count = match cache.scan_count {
        Some(value) => non_zero_u32(value, "cache.scan_count")?,
        None => DEFAULT_CACHE_SCAN_COUNT,
    };

    let op_timeout_ms = cache.op_timeout_ms.unwrap_or(DEFAULT_CACHE_OP_TIMEOUT_MS);
    if op_timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.op_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        url,
        scan_count,
        op_timeout: Duration::from_millis(op_timeout_ms),
    })
}

fn build_slug_settings(slug: RawSlugSettings) -> Result<SlugSettings, LoadError> {
    let separator = match slug.separator.as_deref() {
        None => DEFAULT_SEPARATOR,
        Some(value) => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(separator), None) => separator,
                _ => {
                    return Err(LoadError::invalid(
                        "slug.separator",
                        "must be a single character",
                    ));
                }
            }
        }
    };

    // `:` delimits the cache key namespace, and an alphanumeric separator
    // would merge with slug content.
    if separator == ':' || separator.is_alphanumeric() {
        return Err(LoadError::invalid(
            "slug.separator",
            format!("`{separator}` cannot be used as a slug separator"),
        ));
    }

    Ok(SlugSettings { separator })
}

fn non_zero_u32(value: u32, key: &'static str) -> Result<NonZeroU32, LoadError> {
    NonZeroU32::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
