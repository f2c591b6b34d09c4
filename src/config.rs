//! Optimizer configuration.
//!
//! All fields have defaults, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! trial_count = 100
//! worker_count = 4
//! # seed = 42
//! stop_on_perfect_score = true
//! eta_window = 100
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Knobs of a multi-trial optimization run.
///
/// # Example
/// ```
/// use u_assign::config::OptimizerConfig;
///
/// let config = OptimizerConfig::from_toml_str("trial_count = 500\nseed = 7").unwrap();
/// assert_eq!(config.trial_count, 500);
/// assert_eq!(config.worker_count, 4);
/// assert_eq!(config.seed, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Trials per run.
    pub trial_count: usize,
    /// Worker threads running trials.
    pub worker_count: usize,
    /// Base seed. `None` seeds every trial from entropy.
    pub seed: Option<u64>,
    /// Stop launching trials once the best score reaches the maximum.
    pub stop_on_perfect_score: bool,
    /// Number of recent trial durations averaged for the ETA.
    pub eta_window: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            trial_count: 100,
            worker_count: 4,
            seed: None,
            stop_on_perfect_score: true,
            eta_window: 100,
        }
    }
}

impl OptimizerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of trials.
    pub fn with_trial_count(mut self, trial_count: usize) -> Self {
        self.trial_count = trial_count;
        self
    }

    /// Sets the number of worker threads.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Makes runs reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets early stopping on a perfect score.
    pub fn with_stop_on_perfect_score(mut self, stop: bool) -> Self {
        self.stop_on_perfect_score = stop;
        self
    }

    /// Sets the ETA averaging window.
    pub fn with_eta_window(mut self, eta_window: usize) -> Self {
        self.eta_window = eta_window;
        self
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks that counts are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trial_count == 0 {
            return Err(ConfigError::Invalid {
                field: "trial_count",
                message: "must be at least 1".into(),
            });
        }
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid {
                field: "worker_count",
                message: "must be at least 1".into(),
            });
        }
        if self.eta_window == 0 {
            return Err(ConfigError::Invalid {
                field: "eta_window",
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
