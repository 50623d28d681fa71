//! Engine configuration.
//!
//! Settings that are not part of a mapping: where unqualified transform
//! references resolve, whether compiled transforms are cached, and the
//! default log level. Read from TOML.

use crate::transform::registry::{parse_reference, DEFAULT_TRANSFORM_MODULE};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Errors raised while loading or checking an [`EngineConfig`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO-related errors (file access, permissions, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Configuration validation errors
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Module that `@name` references resolve against
    pub default_transform_module: String,
    /// Cache parsed expressions and resolved references
    pub cache_transforms: bool,
    /// Default filter for [`crate::logging::init_logging`]; `RUST_LOG` wins
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_transform_module: DEFAULT_TRANSFORM_MODULE.to_string(),
            cache_transforms: true,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if parse_reference(&self.default_transform_module, "").is_err() {
            return Err(ConfigError::Validation(format!(
                "default_transform_module '{}' is not a dotted identifier path",
                self.default_transform_module
            )));
        }
        if LevelFilter::from_str(&self.log_level).is_err() {
            return Err(ConfigError::Validation(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }
}
