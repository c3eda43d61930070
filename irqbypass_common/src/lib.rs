//! irqbypass Common Library
//!
//! This crate provides shared constants and configuration loading utilities
//! for all irqbypass workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide default values
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use irqbypass_common::config::{ConfigLoader, SharedConfig};
//! use irqbypass_common::consts::DEFAULT_MANAGER_NAME;
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
