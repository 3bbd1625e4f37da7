//! Scoring configuration

use crate::errors::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Scoring configuration, loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoringConfig {
    /// Intent tier thresholds
    pub tiers: TierThresholds,
    /// Explanation output
    pub explanation: ExplanationConfig,
    /// Compiled artifact location
    pub artifact: ArtifactConfig,
}

/// Score thresholds (probabilities) separating intent tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Minimum score for a hot lead
    pub hot: f64,
    /// Minimum score for a warm lead
    pub warm: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            hot: 0.85,
            warm: 0.60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    /// Number of entries kept by exact attribution
    pub top_k: usize,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Path to the compiled artifact JSON. Unset means fallback scoring only.
    pub path: Option<PathBuf>,
}

impl ScoringConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_toml_str(&fs::read_to_string(path)?)?;
        info!(path = %path.display(), "loaded scoring configuration");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let TierThresholds { hot, warm } = self.tiers;
        if !(0.0..=1.0).contains(&hot) || !(0.0..=1.0).contains(&warm) {
            return Err(CoreError::Config(format!(
                "tier thresholds must lie in [0, 1], got hot={hot} warm={warm}"
            )));
        }
        if warm > hot {
            return Err(CoreError::Config(format!(
                "warm threshold {warm} exceeds hot threshold {hot}"
            )));
        }
        if self.explanation.top_k == 0 {
            return Err(CoreError::Config("explanation.top_k must be positive".to_string()));
        }
        Ok(())
    }
}
