//! Status returned by the SDK services.
//!
//! A trimmed gRPC status: a [`Code`] plus a human-readable message.  Core
//! pairing errors are mapped onto codes by the `From<PairError>` impl.

use std::{error::Error, fmt};

use libpair::PairError;
use serde::{Deserialize, Serialize};

/// Outcome of an SDK call that did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    code: Code,
    message: String,
}

/// gRPC status codes
///
/// These match the [gRPC status codes specification](https://github.com/grpc/grpc/blob/master/doc/statuscodes.md).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Code {
    /// The operation completed successfully.
    Ok = 0,
    /// The operation was cancelled.
    Cancelled = 1,
    /// Unknown error.
    Unknown = 2,
    /// Client specified an invalid argument.
    InvalidArgument = 3,
    /// Deadline expired before operation could complete.
    DeadlineExceeded = 4,
    /// Some requested entity was not found.
    NotFound = 5,
    /// Some entity that we attempted to create already exists.
    AlreadyExists = 6,
    /// The caller does not have permission to execute the specified operation.
    PermissionDenied = 7,
    /// Some resource has been exhausted.
    ResourceExhausted = 8,
    /// The system is not in a state required for the operation's execution.
    FailedPrecondition = 9,
    /// The operation was aborted.
    Aborted = 10,
    /// Operation was attempted past the valid range.
    OutOfRange = 11,
    /// Operation is not implemented or not supported.
    Unimplemented = 12,
    /// Internal error.
    Internal = 13,
    /// The service is currently unavailable.
    Unavailable = 14,
    /// Unrecoverable data loss or corruption.
    DataLoss = 15,
    /// The request does not have valid authentication credentials
    Unauthenticated = 16,
}

impl Status {
    /// Create a new `Status` with the associated code and message
    #[must_use]
    pub fn new(code: Code, message: impl Into<String>) -> Status {
        Status {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Client specified an invalid argument.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Status {
        Status::new(Code::InvalidArgument, message)
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Status {
        Status::new(Code::Internal, message)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status: {:?}, message: {:?}", self.code, self.message)
    }
}

impl Error for Status {}

impl From<PairError> for Status {
    fn from(e: PairError) -> Self {
        let code = match &e {
            PairError::NotFound(_) => Code::NotFound,
            PairError::AlreadyExists(_) => Code::AlreadyExists,
            PairError::AuthenticationFailed(_) => Code::PermissionDenied,
            PairError::InvalidArgument(_) => Code::InvalidArgument,
            PairError::RemoteUnreachable(_) => Code::Unavailable,
            PairError::ListenerRejected { .. }
            | PairError::StoreUnavailable(_)
            | PairError::Internal(_) => Code::Internal,
        };
        Status::new(code, e.to_string())
    }
}
