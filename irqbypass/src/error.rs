//! Error types for bypass manager operations

use crate::participant::BindError;
use crate::token::Token;
use thiserror::Error;

/// Errors returned by registration calls.
///
/// Unregistration never fails: teardown problems are participant contract
/// violations and are logged, not returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BypassError {
    /// Zero token or missing mandatory capability. Rejected before any
    /// side effect.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong
        reason: &'static str,
    },

    /// A participant of the same kind already holds this token, or this
    /// participant is already registered.
    #[error("Token already registered: {token}")]
    DuplicateToken {
        /// Conflicting token
        token: Token,
    },

    /// The manager is being torn down and accepts no new registrations.
    #[error("Bypass manager unavailable")]
    Unavailable,

    /// Producer `add_consumer` failed; nothing was bound.
    #[error("Producer bind failed for token {token}: {source}")]
    ProducerBind {
        /// Token of the pair
        token: Token,
        /// Error reported by the producer
        source: BindError,
    },

    /// Consumer `add_producer` failed; the producer side was rolled back.
    #[error("Consumer bind failed for token {token}: {source}")]
    ConsumerBind {
        /// Token of the pair
        token: Token,
        /// Error reported by the consumer
        source: BindError,
    },
}

impl BypassError {
    /// Whether this error came from a participant's bind call.
    pub fn is_bind_failure(&self) -> bool {
        matches!(
            self,
            BypassError::ProducerBind { .. } | BypassError::ConsumerBind { .. }
        )
    }
}

/// Result type for bypass manager operations
pub type BypassResult<T> = Result<T, BypassError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_failures_classified() {
        let err = BypassError::ConsumerBind {
            token: Token::new(3),
            source: BindError::Busy("vcpu".to_string()),
        };
        assert!(err.is_bind_failure());
        assert!(err.to_string().contains("0x3"));
        assert!(!BypassError::Unavailable.is_bind_failure());
    }
}
