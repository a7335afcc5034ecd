//! Coordination store error types.
//!
//! Every [`Kvdb`](crate::Kvdb) operation reports failures through
//! [`KvdbError`].  Callers that only care about absence should match on
//! [`KvdbError::NotFound`]; it is the store's distinguished "not found"
//! sentinel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for coordination store operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum KvdbError {
    /// No value is stored under the key.
    #[error("key {0} not found")]
    NotFound(String),

    /// `create` was called for a key that already holds a value.
    #[error("key {0} already exists")]
    KeyExists(String),

    /// A named lock could not be acquired.
    #[error("failed to lock {key}: {reason}")]
    LockFailed {
        /// Lock name.
        key: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// `unlock` was called with a handle that does not own the lock.
    #[error("lock {0} is not held")]
    LockNotHeld(String),

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl KvdbError {
    /// Create a [`KvdbError::Serialization`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    /// Create a [`KvdbError::Unavailable`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn unavailable<E: std::fmt::Display>(e: E) -> Self {
        Self::Unavailable(e.to_string())
    }

    /// Returns `true` for the store's "not found" sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
