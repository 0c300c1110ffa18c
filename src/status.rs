//! gRPC status codes, the terminal `Status` value of a call, and the
//! per-call status reporter.
//!
//! `Status` doubles as the error type flowing through handler results, so
//! every failure path unwinds as a `Result` up to the call boundary where
//! it is reported exactly once.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

/// gRPC status codes with their canonical integer values.
///
/// See <https://grpc.github.io/grpc/core/md_doc_statuscodes.html>.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl Code {
    /// Integer value carried in the `grpc-status` trailer.
    #[must_use]
    pub const fn to_int(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Cancelled => 1,
            Self::Unknown => 2,
            Self::InvalidArgument => 3,
            Self::DeadlineExceeded => 4,
            Self::NotFound => 5,
            Self::AlreadyExists => 6,
            Self::PermissionDenied => 7,
            Self::ResourceExhausted => 8,
            Self::FailedPrecondition => 9,
            Self::Aborted => 10,
            Self::OutOfRange => 11,
            Self::Unimplemented => 12,
            Self::Internal => 13,
            Self::Unavailable => 14,
            Self::DataLoss => 15,
            Self::Unauthenticated => 16,
        }
    }
}

/// Terminal (code, message) pair of one call.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("code {}: {}", .code.to_int(), .message)]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    /// Create a status with an arbitrary code.
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Successful completion. Always set explicitly, never implied.
    #[must_use]
    pub fn ok() -> Self {
        Self::new(Code::Ok, "")
    }

    /// Failure local to the protocol engine: malformed frames, truncated
    /// bodies, codec errors.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::Internal, message)
    }

    #[must_use]
    pub const fn code(&self) -> Code {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for Status {
    fn from(error: std::io::Error) -> Self {
        Self::internal(format!("transport error: {error}"))
    }
}

/// Side channel carrying the terminal status of one call to the
/// transport's trailer state.
///
/// `set` may be invoked any number of times; the last write wins. The
/// transport reads the final value exactly once when it finalizes the
/// response.
#[derive(Debug, Default)]
pub struct StatusReporter {
    cell: Mutex<Option<Status>>,
}

impl StatusReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the call status, replacing any earlier value.
    pub fn set(&self, status: Status) {
        *self.cell.lock().unwrap_or_else(PoisonError::into_inner) = Some(status);
    }

    /// Consume the recorded status for trailer emission.
    ///
    /// The adapters always report before the transport finalizes, so the
    /// UNKNOWN fallback is a guard, not an expected path.
    #[must_use]
    pub fn final_status(&self) -> Status {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_else(|| Status::new(Code::Unknown, "call terminated without a status"))
    }
}
