//! Pipeline configuration
//!
//! Every hand-curated table the pipeline uses (prune ranges, storage and
//! interleaved schemes) plus the emitter and resolver knobs. All sections
//! are optional in the TOML file; a missing section keeps the built-in
//! table.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::emit::EmitOptions;
use crate::expand::DEFAULT_MATERIALIZE_LIMIT;
use crate::label::Label;
use crate::prune::{PruneRange, DEFAULT_PRUNE};
use crate::scheme::{default_interleaved, default_schemes, InterleavedScheme, StorageScheme};
use crate::table::MINORS_PER_MAJOR;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Runs and scheme units up to this many slots are written out as
    /// literal names instead of rules
    #[serde(default = "default_materialize_limit")]
    pub materialize_limit: usize,
    /// Block major whose devices all resolve to `/dev/mtdblock<minor>`
    #[serde(default)]
    pub mtdblock_major: Option<u8>,
    #[serde(default)]
    pub emit: EmitOptions,
    #[serde(default = "default_prune")]
    pub prune: Vec<PruneRange>,
    #[serde(default = "default_schemes")]
    pub schemes: Vec<StorageScheme>,
    #[serde(default = "default_interleaved")]
    pub interleaved: Vec<InterleavedScheme>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            materialize_limit: default_materialize_limit(),
            mtdblock_major: None,
            emit: EmitOptions::default(),
            prune: default_prune(),
            schemes: default_schemes(),
            interleaved: default_interleaved(),
        }
    }
}

fn default_materialize_limit() -> usize {
    DEFAULT_MATERIALIZE_LIMIT
}

fn default_prune() -> Vec<PruneRange> {
    DEFAULT_PRUNE.to_vec()
}

impl PipelineConfig {
    /// Load and validate a config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load and validate a config from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the config to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Reject tables the pipeline cannot apply sensibly
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Rules need HEAD, BASE and FIRST slots
        if self.materialize_limit < 2 {
            return Err(invalid(format!(
                "materialize_limit must be at least 2, got {}",
                self.materialize_limit
            )));
        }

        for range in &self.prune {
            if range.start > range.end {
                return Err(invalid(format!(
                    "prune range {} {}-{} is reversed",
                    range.class, range.start, range.end
                )));
            }
        }

        for scheme in &self.schemes {
            let at = format!("scheme {} {} ({})", scheme.class, scheme.major, scheme.base);
            if scheme.base.is_empty() {
                return Err(invalid(format!("{at}: empty base")));
            }
            if scheme.slots_per_unit == 0 || scheme.units == 0 {
                return Err(invalid(format!("{at}: units and slots_per_unit must be positive")));
            }
            if scheme.span() > MINORS_PER_MAJOR {
                return Err(invalid(format!(
                    "{at}: {} units of {} minors exceed {MINORS_PER_MAJOR}",
                    scheme.units, scheme.slots_per_unit
                )));
            }
            if let Label::Alpha(label) = &scheme.first {
                if label.is_empty() || !label.chars().all(|c| c.is_ascii_lowercase()) {
                    return Err(invalid(format!("{at}: first label {label:?} is not lowercase letters")));
                }
            }
        }

        for scheme in &self.interleaved {
            if scheme.bases.is_empty() {
                return Err(invalid(format!(
                    "interleaved scheme {} {} has no bases",
                    scheme.class, scheme.major
                )));
            }
            if scheme.units.saturating_mul(scheme.bases.len()) > MINORS_PER_MAJOR {
                return Err(invalid(format!(
                    "interleaved scheme {} {} exceeds {MINORS_PER_MAJOR} minors",
                    scheme.class, scheme.major
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

/// Load configuration from file, falling back to the built-in tables if
/// the file does not exist
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if path.exists() {
        let config = PipelineConfig::from_file(path)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(PipelineConfig::default())
    }
}

/// Write `config` as pretty TOML
pub fn save_config(config: &PipelineConfig, path: &Path) -> Result<(), ConfigError> {
    config.to_file(path)?;
    info!(path = %path.display(), "Saved configuration");
    Ok(())
}
