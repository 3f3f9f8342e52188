//! Application Configuration Module
//!
//! Configuration is loaded from a YAML file when `TASKVAULT_CONFIG_PATH` is
//! set, and from environment variables with development defaults otherwise.
//! Every section also deserializes from YAML with per-field defaults, so a
//! config file only needs to name what it changes.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taskvault_core::ConfigError;
use taskvault_storage::{CacheSettings, DEFAULT_MAX_ENTRIES, MAX_CACHE_TTL};

use crate::db::DbConfig;

/// Environment variable naming a YAML config file.
pub const CONFIG_PATH_VAR: &str = "TASKVAULT_CONFIG_PATH";

// ============================================================================
// ENVIRONMENT HELPERS
// ============================================================================

/// Look up a process environment variable.
pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Read `key` and parse it, falling back to `default` when unset or blank.
pub(crate) fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    field: key.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}

/// Read `key` as a string, falling back to `default`.
pub(crate) fn string_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Read `key` as a boolean flag ("true"/"false"/"1"/"0").
pub(crate) fn flag_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "" => Ok(default),
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

fn invalid(field: &str, value: impl Display, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address, `host:port`.
    pub address: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 5,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.address
            .parse()
            .map_err(|_| invalid("http.address", &self.address, "expected host:port"))
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
        }
    }
}

/// Which cache provider to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Redis,
    Memory,
    None,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            "none" => Ok(Self::None),
            other => Err(format!("unknown cache backend '{other}', expected redis, memory or none")),
        }
    }
}

/// Cache behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    /// Lifetime of cached task snapshots.
    pub ttl_secs: u64,
    /// Upper bound on a single cache round trip.
    pub op_timeout_ms: u64,
    /// Namespace for cache keys; empty for none.
    pub key_prefix: String,
    /// Capacity of the in-memory backend.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            ttl_secs: 300,
            op_timeout_ms: 250,
            key_prefix: String::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    /// Coordinator settings derived from this section.
    pub fn settings(&self) -> CacheSettings {
        CacheSettings::new()
            .with_ttl(Duration::from_secs(self.ttl_secs))
            .with_op_timeout(Duration::from_millis(self.op_timeout_ms))
            .with_key_prefix(self.key_prefix.clone())
    }
}

/// Which durable store to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}', expected postgres or memory")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackendKind,
}

/// Tenancy mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// When set, every created task must name its owning user.
    pub multi_tenant: bool,
}

// ============================================================================
// APP CONFIGURATION
// ============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deployment name, used in logs only.
    pub environment: String,
    pub http: HttpConfig,
    pub database: DbConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub tenancy: TenancyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            http: HttpConfig::default(),
            database: DbConfig::default(),
            redis: RedisConfig::default(),
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
            tenancy: TenancyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate the configuration.
    ///
    /// Reads the YAML file named by `TASKVAULT_CONFIG_PATH` if set, the
    /// environment otherwise.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match env_lookup(CONFIG_PATH_VAR) {
            Some(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build from process environment variables.
    ///
    /// Environment variables:
    /// - `TASKVAULT_ENVIRONMENT` (default: local)
    /// - `TASKVAULT_HTTP_ADDRESS` (default: 0.0.0.0:8080)
    /// - `TASKVAULT_HTTP_REQUEST_TIMEOUT_SECS` (default: 5)
    /// - `TASKVAULT_DB_*`, see [`DbConfig::from_lookup`]
    /// - `TASKVAULT_REDIS_URL` (default: redis://127.0.0.1:6379/0)
    /// - `TASKVAULT_CACHE_BACKEND`: redis, memory or none (default: redis)
    /// - `TASKVAULT_CACHE_TTL_SECS` (default: 300)
    /// - `TASKVAULT_CACHE_OP_TIMEOUT_MS` (default: 250)
    /// - `TASKVAULT_CACHE_KEY_PREFIX` (default: empty)
    /// - `TASKVAULT_CACHE_MAX_ENTRIES` (default: 10000)
    /// - `TASKVAULT_STORE_BACKEND`: postgres or memory (default: postgres)
    /// - `TASKVAULT_MULTI_TENANT` (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            environment: string_var(&lookup, "TASKVAULT_ENVIRONMENT", &defaults.environment),
            http: HttpConfig {
                address: string_var(&lookup, "TASKVAULT_HTTP_ADDRESS", &defaults.http.address),
                request_timeout_secs: parse_var(
                    &lookup,
                    "TASKVAULT_HTTP_REQUEST_TIMEOUT_SECS",
                    defaults.http.request_timeout_secs,
                )?,
            },
            database: DbConfig::from_lookup(&lookup)?,
            redis: RedisConfig {
                url: string_var(&lookup, "TASKVAULT_REDIS_URL", &defaults.redis.url),
            },
            cache: CacheConfig {
                backend: parse_var(&lookup, "TASKVAULT_CACHE_BACKEND", defaults.cache.backend)?,
                ttl_secs: parse_var(&lookup, "TASKVAULT_CACHE_TTL_SECS", defaults.cache.ttl_secs)?,
                op_timeout_ms: parse_var(
                    &lookup,
                    "TASKVAULT_CACHE_OP_TIMEOUT_MS",
                    defaults.cache.op_timeout_ms,
                )?,
                key_prefix: string_var(&lookup, "TASKVAULT_CACHE_KEY_PREFIX", ""),
                max_entries: parse_var(
                    &lookup,
                    "TASKVAULT_CACHE_MAX_ENTRIES",
                    defaults.cache.max_entries,
                )?,
            },
            store: StoreConfig {
                backend: parse_var(&lookup, "TASKVAULT_STORE_BACKEND", defaults.store.backend)?,
            },
            tenancy: TenancyConfig {
                multi_tenant: flag_var(&lookup, "TASKVAULT_MULTI_TENANT", false)?,
            },
        })
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(source: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|e| ConfigError::Unreadable {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&source, &path.display().to_string())
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http.socket_addr()?;
        if self.http.request_timeout_secs == 0 {
            return Err(invalid("http.request_timeout_secs", 0, "must be positive"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", 0, "must be positive"));
        }
        if self.cache.ttl_secs > MAX_CACHE_TTL.as_secs() {
            return Err(invalid(
                "cache.ttl_secs",
                self.cache.ttl_secs,
                "must be at most 30 days",
            ));
        }
        if self.cache.op_timeout_ms == 0 {
            return Err(invalid("cache.op_timeout_ms", 0, "must be positive"));
        }
        if self.cache.backend == CacheBackendKind::Memory && self.cache.max_entries == 0 {
            return Err(invalid("cache.max_entries", 0, "must be positive"));
        }
        if self.cache.backend == CacheBackendKind::Redis && self.redis.url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "redis.url".to_string(),
            });
        }
        if self.store.backend == StoreBackendKind::Postgres {
            self.database.validate()?;
        }
        Ok(())
    }
}
