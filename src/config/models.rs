use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, Default)]
pub struct AppConfig {
    #[garde(dive)]
    #[serde(default)]
    pub logging: LoggingConfig,

    #[garde(dive)]
    #[serde(default)]
    pub auth_cache: AuthCacheSettings,

    #[garde(dive)]
    #[serde(default)]
    pub distributed: DistributedConfig,

    #[garde(skip)]
    #[serde(default)]
    pub environment: Environment,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoggingConfig {
    #[garde(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub level: String, // trace, debug, info, warn, error

    #[garde(pattern(r"^(json|pretty)$"))]
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Authentication cache properties as they appear in configuration sources.
///
/// Every property is required when extracted on its own; the application
/// loader layers embedded defaults underneath. Environment variables are
/// lowercased by figment, so only `timeout` can be overridden that way.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthCacheSettings {
    #[garde(range(min = 1))]
    pub initial_size: usize,

    #[garde(range(min = 1))]
    pub max_size: usize,

    /// Entry timeout in milliseconds, zero disables background eviction
    #[garde(range(max = 86_400_000))]
    pub timeout: u64,

    #[garde(skip)]
    pub allow_basic_auth_lookup: bool,
}

impl Default for AuthCacheSettings {
    fn default() -> Self {
        Self {
            initial_size: 50,
            max_size: 25_000,
            timeout: 600_000,
            allow_basic_auth_lookup: true,
        }
    }
}

/// Immutable configuration snapshot of the authentication cache.
///
/// Replaced wholesale on every configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCacheConfig {
    initial_size: usize,
    max_size: usize,
    timeout: Duration,
    allow_basic_auth_lookup: bool,
}

impl AuthCacheConfig {
    /// `initial_size` is clamped down to `max_size`
    pub fn new(
        initial_size: usize,
        max_size: usize,
        timeout: Duration,
        allow_basic_auth_lookup: bool,
    ) -> Self {
        let initial_size = if initial_size > max_size {
            warn!(
                initial_size,
                max_size, "initialSize exceeds maxSize, using maxSize as the initial size"
            );
            max_size
        } else {
            initial_size
        };

        Self {
            initial_size,
            max_size,
            timeout,
            allow_basic_auth_lookup,
        }
    }

    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn allow_basic_auth_lookup(&self) -> bool {
        self.allow_basic_auth_lookup
    }
}

impl From<&AuthCacheSettings> for AuthCacheConfig {
    fn from(settings: &AuthCacheSettings) -> Self {
        Self::new(
            settings.initial_size,
            settings.max_size,
            Duration::from_millis(settings.timeout),
            settings.allow_basic_auth_lookup,
        )
    }
}

impl Default for AuthCacheConfig {
    fn default() -> Self {
        Self::from(&AuthCacheSettings::default())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DistributedConfig {
    /// Back the cache with the distributed tier
    #[garde(skip)]
    #[serde(default)]
    pub enabled: bool,

    #[garde(length(min = 1))]
    #[serde(default = "default_distributed_name")]
    pub name: String,

    /// Key limit of the in-process store
    #[garde(range(min = 1))]
    #[serde(default = "default_distributed_max_entries")]
    pub max_entries: usize,
}

fn default_distributed_name() -> String {
    "auth-cache".to_string()
}

fn default_distributed_max_entries() -> usize {
    crate::distributed::DEFAULT_MAX_ENTRIES
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            name: default_distributed_name(),
            max_entries: default_distributed_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}
