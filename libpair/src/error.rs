//! Cluster pairing error types.
//!
//! All errors in the `libpair` crate are represented by the [`PairError`]
//! enum, which derives [`thiserror::Error`] for ergonomic error handling and
//! also implements [`Serialize`]/[`Deserialize`] so an acceptor's error
//! reaches the initiator with its kind intact.

use libkvdb::KvdbError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for pairing operations.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum PairError {
    /// A pair record, the default pointer or the configuration document is absent.
    #[error("{0} not found")]
    NotFound(String),

    /// A pair record with the same id already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// The presented pair token does not match the acceptor's token.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The remote cluster could not be dialed or the RPC transport failed.
    #[error("remote cluster unreachable: {0}")]
    RemoteUnreachable(String),

    /// A registered listener refused the pairing event.
    #[error("listener {listener} rejected the event: {reason}")]
    ListenerRejected {
        /// Display name of the listener that failed.
        listener: String,
        /// Error reported by the listener.
        reason: String,
    },

    /// A lock or store operation failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The caller supplied an invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PairError {
    /// Create a [`PairError::StoreUnavailable`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn store<E: std::fmt::Display>(e: E) -> Self {
        Self::StoreUnavailable(e.to_string())
    }

    /// Create a [`PairError::RemoteUnreachable`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn remote<E: std::fmt::Display>(e: E) -> Self {
        Self::RemoteUnreachable(e.to_string())
    }

    /// Create a [`PairError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// Returns `true` for [`PairError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<KvdbError> for PairError {
    fn from(e: KvdbError) -> Self {
        match e {
            KvdbError::NotFound(key) => Self::NotFound(format!("key {key}")),
            KvdbError::KeyExists(key) => Self::AlreadyExists(format!("key {key}")),
            KvdbError::Serialization(reason) => Self::Internal(reason),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PairError::ListenerRejected {
            listener: "csi".into(),
            reason: "quota exceeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "listener csi rejected the event: quota exceeded"
        );
    }

    #[test]
    fn store_errors_keep_their_kind() {
        assert!(PairError::from(KvdbError::NotFound("cluster/pair/c1".into())).is_not_found());
        assert!(matches!(
            PairError::from(KvdbError::KeyExists("cluster/pair/c1".into())),
            PairError::AlreadyExists(_)
        ));
        assert!(matches!(
            PairError::from(KvdbError::LockFailed {
                key: "cluster/pair".into(),
                reason: "timeout".into(),
            }),
            PairError::StoreUnavailable(_)
        ));
        assert!(matches!(
            PairError::from(KvdbError::Serialization("eof".into())),
            PairError::Internal(_)
        ));
    }

    #[test]
    fn error_serde_roundtrip() {
        let err = PairError::AuthenticationFailed("token mismatch during pairing".into());
        let json = serde_json::to_string(&err).expect("serialize");
        let de: PairError = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(err, de);
    }
}
