//! # Pipeline Configuration
//!
//! Settings for one batch, loadable from YAML:
//!
//! ```yaml
//! delimiter: ","
//! skip_header: false
//! parallelism: 4
//! columns: [location, location, average_temperature, month]
//! ```
//!
//! Every key is optional. Without `columns` the mapper uses one column per
//! schema field in declaration order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::parser::DEFAULT_DELIMITER;

/// Error loading or checking a [`PipelineConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for this shape.
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The delimiter would collide with quoting or line splitting.
    #[error("delimiter {0:?} is not allowed")]
    InvalidDelimiter(char),

    /// At least one worker is needed.
    #[error("parallelism must be at least 1")]
    ZeroParallelism,
}

/// Settings for one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Column delimiter.
    pub delimiter: char,
    /// Input column order; `None` means schema declaration order.
    pub columns: Option<Vec<String>>,
    /// Drop the first non-blank line.
    pub skip_header: bool,
    /// Number of mapping workers. `1` processes strictly line by line.
    pub parallelism: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            columns: None,
            skip_header: false,
            parallelism: 1,
        }
    }
}

impl PipelineConfig {
    /// Parse and check a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit; treat it as all defaults.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and check a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Reject settings no batch can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.delimiter, '"' | '\n' | '\r') {
            return Err(ConfigError::InvalidDelimiter(self.delimiter));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        Ok(())
    }
}
