//! Run configuration: defaults, JSON file loading and validation.
use crate::bootstrap::BootstrapRules;
use crate::forest::ForestParams;
use crate::writer::OutputFormat;
use constants::classification::{DEFAULT_CHUNK_SIZE, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Points per chunk; bounds resident memory during a run.
    pub chunk_size: u64,
    /// Directory receiving the per-(chunk, class) artifacts and the manifest.
    pub output_dir: PathBuf,
    pub bootstrap: BootstrapRules,
    pub forest: ForestParams,
    pub output: OutputFormat,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            output_dir: PathBuf::from("."),
            bootstrap: BootstrapRules::default(),
            forest: ForestParams::default(),
            output: OutputFormat::default(),
        }
    }
}

impl ClassifierConfig {
    /// Load a config from JSON; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn chunk_size(&self) -> Result<NonZeroU64, ConfigError> {
        NonZeroU64::new(self.chunk_size)
            .ok_or_else(|| ConfigError::Invalid("chunk_size must be positive".into()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunk_size()?;

        let percentile = self.bootstrap.elevation_percentile;
        if !(0.0..=100.0).contains(&percentile) {
            return Err(ConfigError::Invalid(format!(
                "elevation_percentile must be within 0..=100, got {percentile}"
            )));
        }

        let forest = &self.forest;
        if forest.n_trees == 0 {
            return Err(ConfigError::Invalid("n_trees must be positive".into()));
        }
        if forest.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be positive".into()));
        }
        if forest.min_samples_split < 2 {
            return Err(ConfigError::Invalid(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if let Some(max_features) = forest.max_features {
            if max_features == 0 || max_features > FEATURE_COUNT {
                return Err(ConfigError::Invalid(format!(
                    "max_features must be within 1..={FEATURE_COUNT}, got {max_features}"
                )));
            }
        }
        if forest.max_samples == Some(0) {
            return Err(ConfigError::Invalid("max_samples must be positive".into()));
        }

        self.output.validate()
    }
}
