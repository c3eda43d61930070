//! Bypass manager configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [manager]
//! name = "host-irqbypass"
//! log_protocol_steps = true
//! slow_sequence_threshold_us = 500
//! ```

use irqbypass_common::config::ConfigError;
use irqbypass_common::consts::{DEFAULT_MANAGER_NAME, DEFAULT_SLOW_SEQUENCE_THRESHOLD_US};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_name() -> String {
    DEFAULT_MANAGER_NAME.to_string()
}

fn default_slow_threshold() -> u64 {
    DEFAULT_SLOW_SEQUENCE_THRESHOLD_US
}

/// Manager tuning. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Instance name, attached to every log record.
    #[serde(default = "default_name")]
    pub name: String,

    /// Log each connect/disconnect step at debug level.
    #[serde(default)]
    pub log_protocol_steps: bool,

    /// Sequences running longer than this are reported as slow [µs].
    /// 0 = no check.
    #[serde(default = "default_slow_threshold")]
    pub slow_sequence_threshold_us: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_protocol_steps: false,
            slow_sequence_threshold_us: default_slow_threshold(),
        }
    }
}

impl ManagerConfig {
    /// Builder: set the instance name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder: toggle per-step logging.
    pub fn log_protocol_steps(mut self, enabled: bool) -> Self {
        self.log_protocol_steps = enabled;
        self
    }

    /// Builder: set the slow-sequence threshold. Saturates at `u64::MAX` µs.
    pub fn slow_sequence_threshold(mut self, threshold: Duration) -> Self {
        self.slow_sequence_threshold_us =
            u64::try_from(threshold.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Slow-sequence threshold, `None` when disabled.
    pub fn slow_threshold(&self) -> Option<Duration> {
        (self.slow_sequence_threshold_us > 0)
            .then(|| Duration::from_micros(self.slow_sequence_threshold_us))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` if `name` is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "manager name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
