use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::configs::*;

pub const DEFAULT_CONFIG_PATH: &str = "swish.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub rotation: RotationConfig,
    pub search: SearchConfig,
    pub player: PlayerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    ///
    /// Runs before logging is initialised, so the returned flag tells the
    /// caller whether defaults were used.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, bool), ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok((Self::default(), true));
        }

        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::parse(&config_str).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        Ok((config, false))
    }

    pub fn parse(config_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(config_str)
    }
}
