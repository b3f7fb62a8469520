use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_RESAMPLE_ATTEMPTS;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Upper bound on categorical redraws in a single step.
    pub max_resample_attempts: usize,
    /// Step interval between recorded trajectory samples.
    pub sample_every: u64,
    /// Hard stop for driver loops (0 = run until the stop condition).
    pub max_steps: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_resample_attempts: DEFAULT_MAX_RESAMPLE_ATTEMPTS,
            sample_every: 100,
            max_steps: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_resample_attempts must be greater than 0")]
    InvalidMaxResampleAttempts,
    #[error("sample_every must be greater than 0")]
    InvalidSampleEvery,
}

impl SystemConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resample_attempts == 0 {
            return Err(ConfigError::InvalidMaxResampleAttempts);
        }
        if self.sample_every == 0 {
            return Err(ConfigError::InvalidSampleEvery);
        }
        Ok(())
    }

    /// Driver step limit, `None` when unbounded.
    pub fn step_limit(&self) -> Option<u64> {
        (self.max_steps > 0).then_some(self.max_steps)
    }
}
