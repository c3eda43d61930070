//! Workspace-wide default values.
//!
//! Single source of truth for defaults shared by the manager and the
//! simulator.

/// Default name of a bypass manager instance (appears in log fields).
pub const DEFAULT_MANAGER_NAME: &str = "irqbypass";

/// Default threshold above which a connect/disconnect sequence is reported
/// as slow, in microseconds. `0` disables the check.
pub const DEFAULT_SLOW_SEQUENCE_THRESHOLD_US: u64 = 1000;
