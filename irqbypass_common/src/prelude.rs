//! Prelude module for common re-exports.
//!
//! ```rust
//! use irqbypass_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── Defaults ───────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_MANAGER_NAME, DEFAULT_SLOW_SEQUENCE_THRESHOLD_US};
