// ⚙️ Configuration - knobs for the chain walk and batch runs
// Loaded from JSON the same way classification rules are: data, not code.

use crate::error::TraceError;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default hop cap for the backward walk
pub const DEFAULT_MAX_HOPS: usize = 32;

/// Default owner the paperwork is audited for
pub const DEFAULT_TARGET_BUYER: &str = "Skylink";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Maximum number of links the chain walk may emit before giving up
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Buyer hint used when the caller does not name one
    #[serde(default = "default_target_buyer")]
    pub target_buyer: String,

    /// Levenshtein tolerance for registry name matching (0 disables fuzzy matching)
    #[serde(default = "default_fuzzy_distance")]
    pub fuzzy_distance: usize,

    /// Worker threads for batch evaluation
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_max_hops() -> usize {
    DEFAULT_MAX_HOPS
}

fn default_target_buyer() -> String {
    DEFAULT_TARGET_BUYER.to_string()
}

fn default_fuzzy_distance() -> usize {
    2
}

fn default_workers() -> usize {
    4
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            max_hops: default_max_hops(),
            target_buyer: default_target_buyer(),
            fuzzy_distance: default_fuzzy_distance(),
            workers: default_workers(),
        }
    }
}

impl TraceConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: TraceConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), TraceError> {
        if self.max_hops == 0 {
            return Err(TraceError::InvalidConfig(
                "max_hops must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(TraceError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
