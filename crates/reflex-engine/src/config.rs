//! Engine configuration (reflex.toml)
//!
//! Every field has a default, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading or installing options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to render TOML
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The process-wide engine was already created
    #[error("The global engine is already initialized")]
    AlreadyInstalled,
}

/// Engine options
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineOptions {
    /// Singleton registry settings
    pub singleton: SingletonOptions,

    /// Method resolution cache settings
    pub methods: MethodCacheOptions,

    /// Proxy engine settings
    pub proxy: ProxyOptions,
}

/// Singleton registry settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SingletonOptions {
    /// Log construction failures
    pub log_failures: bool,
}

impl Default for SingletonOptions {
    fn default() -> Self {
        Self { log_failures: true }
    }
}

/// Method resolution cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MethodCacheOptions {
    /// Count cache hits and misses
    pub collect_stats: bool,
}

impl Default for MethodCacheOptions {
    fn default() -> Self {
        Self { collect_stats: true }
    }
}

/// How the proxy cache keys synthesized types
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyCacheKey {
    /// One slot per target type; the first interceptor requested wins
    #[default]
    Target,
    /// One slot per (target, interceptor) pair
    TargetAndInterceptor,
}

/// Proxy engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyOptions {
    /// Cache keying policy
    pub cache_key: ProxyCacheKey,

    /// Inserted between the target name and a sequence number (default: "$Proxy")
    pub name_suffix: String,
}

fn default_name_suffix() -> String {
    "$Proxy".to_string()
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            cache_key: ProxyCacheKey::default(),
            name_suffix: default_name_suffix(),
        }
    }
}

impl EngineOptions {
    /// Parse options from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse options from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let options: EngineOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Render options as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), ConfigError> {
        let suffix = &self.proxy.name_suffix;
        if suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "proxy.name_suffix cannot be empty".to_string(),
            ));
        }
        if suffix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "proxy.name_suffix '{}' cannot contain whitespace",
                suffix
            )));
        }
        Ok(())
    }
}
