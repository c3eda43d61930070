//! # irqbypass
//!
//! IRQ bypass manager. Interrupt *producers* (device-facing event sources,
//! e.g. an assigned device's MSI vector) and *consumers* (guest-facing event
//! sinks, e.g. an interrupt injector) register independently under an
//! opaque [`Token`]. When both halves of a token are present the manager
//! connects them so events can flow directly, without per-event host
//! mediation; when either half leaves, it disconnects them.
//!
//! # Module Structure
//!
//! - [`manager`] - `BypassManager` registry and statistics
//! - [`protocol`] - Connect / disconnect step ordering
//! - [`participant`] - `BypassProducer` / `BypassConsumer` traits, capability flags
//! - [`lifecycle`] - Pin guard held by every registered participant
//! - [`global`] - Process-wide manager and free functions
//! - [`config`] - Manager configuration
//! - [`error`] - Error types
//! - [`token`] - Matching key
//!
//! # Architecture
//!
//! ```text
//!   register_producer(P, T)                      register_consumer(C, T)
//!            │                                              │
//!            ▼                                              ▼
//! ┌───────────────────────────── BypassManager ──────────────────────────────┐
//! │  Mutex { producers: HashMap<Token, P>,  consumers: HashMap<Token, C> }   │
//! │                                                                          │
//! │  T matched ──► connect:    P.stop C.stop P.add_consumer C.add_producer   │
//! │                            C.start P.start                               │
//! │  T broken  ──► disconnect: P.stop C.stop C.del_producer P.del_consumer   │
//! │                            C.start P.start                               │
//! └──────────────────────────────────┬───────────────────────────────────────┘
//!                                    │ one PinGuard per registered participant
//!                                    ▼
//!                               Lifecycle
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use irqbypass::{BindError, BypassConsumer, BypassManager, BypassProducer, Token};
//!
//! struct Vector(u64);
//! impl BypassProducer for Vector {
//!     fn token(&self) -> Token { Token::new(self.0) }
//! }
//!
//! struct Injector(u64);
//! impl BypassConsumer for Injector {
//!     fn token(&self) -> Token { Token::new(self.0) }
//!     fn add_producer(&self, _p: &dyn BypassProducer) -> Result<(), BindError> { Ok(()) }
//!     fn del_producer(&self, _p: &dyn BypassProducer) -> Result<(), BindError> { Ok(()) }
//! }
//!
//! let manager = BypassManager::new();
//! let producer = Arc::new(Vector(42));
//! let consumer = Arc::new(Injector(42));
//!
//! manager.register_producer(producer.clone()).unwrap();
//! manager.register_consumer(consumer.clone()).unwrap();
//! assert!(manager.is_connected(Token::new(42)));
//!
//! manager.unregister_consumer(&*consumer);
//! manager.unregister_producer(&*producer);
//! assert_eq!(manager.lifecycle().pin_count(), 0);
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod global;
pub mod lifecycle;
pub mod manager;
pub mod participant;
pub mod protocol;
pub mod token;

// Re-export key types for convenience
pub use crate::config::ManagerConfig;
pub use crate::error::{BypassError, BypassResult};
pub use crate::global::{global, register_consumer, register_producer, unregister_consumer, unregister_producer};
pub use crate::lifecycle::{Lifecycle, PinGuard};
pub use crate::manager::{BypassManager, BypassStats};
pub use crate::participant::{BindError, BypassConsumer, BypassProducer, ConsumerCaps, ProducerCaps};
pub use crate::protocol::{SequenceKind, Step};
pub use crate::token::Token;
