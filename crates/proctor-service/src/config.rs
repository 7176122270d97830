//! Service configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML/YAML/JSON file, then `PROCTOR__` environment variables
//! (`PROCTOR__PROCTOR__SNAPSHOT_INTERVAL_SECS=5`, `PROCTOR__LOGGING__LEVEL=debug`).

use ::config::{Config, Environment, File, FileFormat};
use object_detection::YoloConfig;
use proctor::ProctorConfig;
use serde::{Deserialize, Serialize};

use crate::ServiceError;

const ENV_PREFIX: &str = "PROCTOR";
const ENV_SEPARATOR: &str = "__";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_target: true,
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub proctor: ProctorConfig,

    /// Load the object model; phone and book checks are skipped without it
    pub enable_object_detection: bool,

    pub object_detection: YoloConfig,

    pub logging: LoggingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            proctor: ProctorConfig::default(),
            enable_object_detection: true,
            object_detection: YoloConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load from an optional config file plus environment overrides
    pub fn load(path: Option<&str>) -> Result<Self, ServiceError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        Self::finish(builder.add_source(env_source()).build()?)
    }

    /// Parse a TOML document (no environment overrides)
    pub fn from_toml(contents: &str) -> Result<Self, ServiceError> {
        Self::finish(
            Config::builder()
                .add_source(File::from_str(contents, FileFormat::Toml))
                .build()?,
        )
    }

    fn finish(config: Config) -> Result<Self, ServiceError> {
        let config: Self = config.try_deserialize()?;
        config.proctor.validate()?;
        Ok(config)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
