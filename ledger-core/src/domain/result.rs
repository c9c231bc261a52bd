//! Result and error types for the core library

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A concurrent unit of work changed a row this one read or wrote.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// The store rejected a transfer whose request id is already recorded.
    #[error("Duplicate request id: {0}")]
    DuplicateRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The outward classification of an [`Error`]
///
/// Request adapters map each kind to a distinct signal so callers can tell
/// "fix your request" apart from "retry later".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidRequest,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl Error {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a write conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Internal(_)
            | Error::Conflict(_)
            | Error::DuplicateRequest(_)
            | Error::Database(_)
            | Error::Io(_)
            | Error::Json(_) => ErrorKind::Internal,
        }
    }

    /// Whether re-running the whole unit of work may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::DuplicateRequest(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_result_ok() {
        let result: OperationResult<i32> = OperationResult::ok(42);
        assert!(result.success);
        assert_eq!(result.data, Some(42));
        assert!(result.error.is_none());
        assert!(result.error_kind.is_none());
    }

    #[test]
    fn test_from_result() {
        let err: Result<i32> = Err(Error::invalid("insufficient funds"));
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::InvalidRequest));
        assert!(result.error.unwrap().contains("insufficient funds"));
    }

    #[test]
    fn test_store_signals_surface_as_internal() {
        assert_eq!(Error::conflict("row changed").kind(), ErrorKind::Internal);
        assert_eq!(
            Error::DuplicateRequest("req-1".into()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(Error::Database("io".into()).kind(), ErrorKind::Internal);
        assert_eq!(Error::not_found("account").kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_only_store_signals_are_retryable() {
        assert!(Error::conflict("x").is_retryable());
        assert!(Error::DuplicateRequest("x".into()).is_retryable());
        assert!(!Error::internal("x").is_retryable());
        assert!(!Error::invalid("x").is_retryable());
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InvalidRequest).unwrap();
        assert_eq!(json, "\"invalid_request\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
