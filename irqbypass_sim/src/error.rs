//! Simulator error types.

use irqbypass_common::config::ConfigError;
use thiserror::Error;

/// Errors raised while loading or validating a scenario.
#[derive(Error, Debug, Clone)]
pub enum SimError {
    /// Scenario file could not be loaded or failed config validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Two participants share a name.
    #[error("Duplicate participant name: {0}")]
    DuplicateName(String),

    /// A capability that does not apply to the participant kind.
    #[error("Participant '{name}' declares capability '{capability}' which a {kind} cannot have")]
    InvalidCapability {
        /// Participant name
        name: String,
        /// Offending capability
        capability: String,
        /// "producer" or "consumer"
        kind: &'static str,
    },

    /// A step names no participant, or one that does not exist.
    #[error("Step {step}: unknown participant '{name}'")]
    UnknownParticipant {
        /// 1-based step index
        step: usize,
        /// Referenced name
        name: String,
    },

    /// A step references a participant of the other kind.
    #[error("Step {step}: '{name}' is not a {expected}")]
    WrongKind {
        /// 1-based step index
        step: usize,
        /// Referenced name
        name: String,
        /// Kind the action requires
        expected: &'static str,
    },

    /// A step that is malformed for its action.
    #[error("Step {step}: {reason}")]
    InvalidStep {
        /// 1-based step index
        step: usize,
        /// What is wrong
        reason: &'static str,
    },
}
