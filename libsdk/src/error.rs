//! Errors reported by storage drivers behind the SDK services.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a [`CloudBackupDriver`](crate::CloudBackupDriver) or
/// [`SchedulePolicyProvider`](crate::SchedulePolicyProvider) call.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The object named in the request does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Any other driver failure.
    #[error("{0}")]
    Failed(String),
}

impl DriverError {
    /// Create a [`DriverError::Failed`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn failed<E: std::fmt::Display>(e: E) -> Self {
        Self::Failed(e.to_string())
    }
}
