//! Engine configuration.
//!
//! All fields have defaults, so an empty TOML file is a valid config and
//! deployments only override what they need:
//!
//! ```toml
//! [classifier]
//! timeout_ms = 2000
//!
//! [classifier.breaker]
//! failure_threshold = 3
//! cooldown_seconds = 60
//!
//! [bias]
//! anchoring_window = 5
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::bias::BiasConfig;
use crate::breaker::BreakerConfig;
use crate::error::ConfigError;

/// Timeout and breaker settings for one guarded external call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Deadline for a single call, in milliseconds.
    pub timeout_ms: u64,
    pub breaker: BreakerConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            breaker: BreakerConfig::default(),
        }
    }
}

impl GuardConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub classifier: GuardConfig,
    pub labeler: GuardConfig,
    pub bias: BiasConfig,
}

impl EngineConfig {
    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on IO or parse failure.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}
