//! Interest criteria loaded from the prompts file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Topics the reader does and does not care about.
///
/// Order only matters for prompt rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub interesting: Vec<String>,
    #[serde(default)]
    pub uninteresting: Vec<String>,
}

impl Criteria {
    pub fn new(interesting: Vec<String>, uninteresting: Vec<String>) -> Self {
        Self {
            interesting,
            uninteresting,
        }
    }

    /// Read criteria from a JSON file. Any failure is a configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::PromptData {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let criteria: Criteria =
            serde_json::from_str(&raw).map_err(|e| ConfigError::PromptData {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if criteria.interesting.is_empty() && criteria.uninteresting.is_empty() {
            return Err(ConfigError::PromptData {
                path: path.display().to_string(),
                reason: "no interesting or uninteresting topics defined".into(),
            });
        }

        Ok(criteria)
    }

    /// Stable serialization used as the criteria half of a cache key.
    pub fn fingerprint(&self) -> String {
        // Serializing two string vectors cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
