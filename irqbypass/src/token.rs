//! Opaque matching key shared by a producer and a consumer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key used to match exactly one producer to exactly one consumer.
///
/// The value carries no meaning to the manager beyond equality. Zero is
/// reserved for "no token" and is rejected at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(u64);

impl Token {
    /// The reserved "absent" token.
    pub const NONE: Token = Token(0);

    /// Wrap a raw key.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw key value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this token can be registered.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for Token {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
