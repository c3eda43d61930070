//! Participant traits and capability tables.
//!
//! This module defines:
//! - `BypassProducer` trait - Interface for event sources offering bypass
//! - `BypassConsumer` trait - Interface for event sinks accepting bypass
//! - `ProducerCaps` / `ConsumerCaps` - Explicit capability presence flags
//! - `BindError` enum - Failures reported by participants

use crate::token::Token;
use bitflags::bitflags;
use thiserror::Error;

/// Failure reported by a participant from a bind or unbind call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// The participant cannot bind to this peer (e.g. incompatible hardware).
    #[error("Binding not supported: {0}")]
    NotSupported(String),

    /// The participant is busy and cannot bind right now.
    #[error("Participant busy: {0}")]
    Busy(String),

    /// Backend resource exhausted (vectors, posted-interrupt descriptors).
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Any other backend failure.
    #[error("Bind failed: {0}")]
    Failed(String),
}

bitflags! {
    /// Capabilities a producer implements.
    ///
    /// The manager never calls a capability whose flag is clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProducerCaps: u8 {
        /// `stop()` pauses the event source.
        const STOP = 1 << 0;
        /// `start()` resumes the event source.
        const START = 1 << 1;
        /// `add_consumer()` binds the source to a consumer.
        const ADD_CONSUMER = 1 << 2;
        /// `del_consumer()` unbinds the source.
        const DEL_CONSUMER = 1 << 3;
    }
}

bitflags! {
    /// Capabilities a consumer implements.
    ///
    /// `ADD_PRODUCER` and `DEL_PRODUCER` are mandatory; registration fails
    /// with `InvalidArgument` without them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConsumerCaps: u8 {
        /// `stop()` pauses the event sink.
        const STOP = 1 << 0;
        /// `start()` resumes the event sink.
        const START = 1 << 1;
        /// `add_producer()` accepts the bypassed stream.
        const ADD_PRODUCER = 1 << 2;
        /// `del_producer()` returns the stream to mediated delivery.
        const DEL_PRODUCER = 1 << 3;
    }
}

impl ConsumerCaps {
    /// Capabilities every consumer must declare.
    pub const REQUIRED: ConsumerCaps = ConsumerCaps::ADD_PRODUCER.union(ConsumerCaps::DEL_PRODUCER);
}

impl Default for ConsumerCaps {
    fn default() -> Self {
        Self::REQUIRED
    }
}

/// An event source offering to redirect its stream around the host.
///
/// The manager drives a producer only through the calls flagged in
/// [`capabilities()`](Self::capabilities). Every call is made with the
/// manager's lock held: implementations must not call back into the
/// manager and should return promptly.
///
/// # Connect order
///
/// `stop` → (consumer `stop`) → `add_consumer` → (consumer `add_producer`)
/// → (consumer `start`) → `start`
pub trait BypassProducer: Send + Sync {
    /// Matching key. Must stay constant while registered.
    fn token(&self) -> Token;

    /// Which optional calls this producer implements.
    /// Default: none.
    fn capabilities(&self) -> ProducerCaps {
        ProducerCaps::empty()
    }

    /// Pause the event source.
    fn stop(&self) {}

    /// Resume the event source.
    fn start(&self) {}

    /// Bind the event source to `consumer`.
    ///
    /// # Errors
    /// Any error aborts the connect sequence and is returned to the
    /// registering caller.
    fn add_consumer(&self, _consumer: &dyn BypassConsumer) -> Result<(), BindError> {
        Ok(())
    }

    /// Undo `add_consumer`.
    ///
    /// Infallible by contract. A returned error is logged as a contract
    /// violation and otherwise ignored.
    fn del_consumer(&self, _consumer: &dyn BypassConsumer) -> Result<(), BindError> {
        Ok(())
    }
}

/// An event sink able to accept a bypassed stream without host mediation.
///
/// Same calling rules as [`BypassProducer`].
pub trait BypassConsumer: Send + Sync {
    /// Matching key. Must stay constant while registered.
    fn token(&self) -> Token;

    /// Which calls this consumer implements.
    /// Default: the mandatory pair, no stop/start.
    fn capabilities(&self) -> ConsumerCaps {
        ConsumerCaps::REQUIRED
    }

    /// Accept the bypassed stream from `producer`.
    ///
    /// # Errors
    /// A failure rolls back the producer side and is returned to the
    /// registering caller.
    fn add_producer(&self, producer: &dyn BypassProducer) -> Result<(), BindError>;

    /// Return the stream to mediated delivery.
    ///
    /// Infallible by contract: the pair is torn down regardless. A returned
    /// error is logged as a contract violation and otherwise ignored.
    fn del_producer(&self, producer: &dyn BypassProducer) -> Result<(), BindError>;

    /// Pause the event sink.
    fn stop(&self) {}

    /// Resume the event sink.
    fn start(&self) {}
}
