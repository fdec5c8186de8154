//! Fusion configuration surface.
//!
//! The recognized options for one fusion call. Loadable from TOML, with
//! per-field defaults, and validated before any dispatch happens —
//! malformed numeric ranges fail fast with `InvalidArgument`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{FusionError, FusionResult};
use crate::strategy::Strategy;

/// Configuration for a fusion call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FusionConfig {
    /// Which fusion strategy to run.
    pub strategy: Strategy,
    /// Similarity floor for treating two responses as paraphrases.
    pub grouping_threshold: f64,
    /// Base acceptance bar for consensus before adaptation.
    pub base_threshold: f64,
    /// Weight of the global-similarity pull on the acceptance bar.
    /// Values above 1.0 extrapolate and are accepted; negatives are not.
    pub adjustment_factor: f64,
    /// Minimum usable responses for a dispatch to count as successful.
    /// `None` requires a response from every configured agent.
    pub min_responses: Option<usize>,
    /// Per-agent timeout in seconds; an agent exceeding it is treated as
    /// a failed response for that agent only. `None` waits indefinitely.
    pub per_agent_timeout_secs: Option<u64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Consensus,
            grouping_threshold: 0.8,
            base_threshold: 0.75,
            adjustment_factor: 0.5,
            min_responses: None,
            per_agent_timeout_secs: None,
        }
    }
}

impl FusionConfig {
    /// Parse a config from TOML text and validate it.
    pub fn from_toml_str(raw: &str) -> FusionResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| FusionError::InvalidArgument(format!("config parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file and validate it.
    pub fn from_toml_path(path: impl AsRef<Path>) -> FusionResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            FusionError::InvalidArgument(format!(
                "cannot read config {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// The per-agent timeout as a `Duration`, if configured.
    pub fn per_agent_timeout(&self) -> Option<Duration> {
        self.per_agent_timeout_secs.map(Duration::from_secs)
    }

    /// Check the numeric ranges. Called by the engine before dispatch.
    pub fn validate(&self) -> FusionResult<()> {
        if !(0.0..=1.0).contains(&self.grouping_threshold) {
            return Err(FusionError::InvalidArgument(format!(
                "grouping_threshold must be in [0, 1], got {}",
                self.grouping_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.base_threshold) {
            return Err(FusionError::InvalidArgument(format!(
                "base_threshold must be in [0, 1], got {}",
                self.base_threshold
            )));
        }
        if self.adjustment_factor < 0.0 {
            return Err(FusionError::InvalidArgument(format!(
                "adjustment_factor must be >= 0, got {}",
                self.adjustment_factor
            )));
        }
        if self.min_responses == Some(0) {
            return Err(FusionError::InvalidArgument(
                "min_responses must be >= 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}
