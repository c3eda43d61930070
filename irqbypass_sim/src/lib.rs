//! # irqbypass simulator
//!
//! Drives a [`irqbypass::BypassManager`] through a scripted scenario with
//! simulated producers and consumers, and reports every participant call
//! and whether each step produced the expected outcome.
//!
//! # Module Structure
//!
//! - [`scenario`] - Scenario file model and validation
//! - [`participants`] - Recording producer/consumer implementations
//! - [`runner`] - Step execution and reporting
//! - [`error`] - Simulator errors

#![deny(missing_docs)]

pub mod error;
pub mod participants;
pub mod runner;
pub mod scenario;

pub use crate::error::SimError;
pub use crate::participants::{CallLog, CallRecord, SimConsumer, SimProducer};
pub use crate::runner::{SimReport, Simulation, StepReport};
pub use crate::scenario::{Action, Capability, ConsumerSpec, Outcome, ProducerSpec, Scenario, StepSpec};
