//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// The first four variants are the import pipeline's own failure modes;
/// the rest wrap infrastructure failures.
#[derive(Error, Debug)]
pub enum Error {
    /// The uploaded file could not be turned into rows
    #[error("CSV parse error: {0}")]
    Parse(String),

    #[error("You must be logged in to import expenses")]
    AuthRequired,

    #[error("No valid records to import")]
    NoValidRecords,

    #[error("Batch {batch_index} failed to persist: {message}")]
    BatchPersist { batch_index: usize, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation was attempted in the wrong import step
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Whether this error ends the current import run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::AuthRequired | Self::NoValidRecords)
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a successful result with context
    pub fn ok_with_context(data: T, context: HashMap<String, serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: Some(context),
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::fail(e.to_string()),
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
    }

    #[test]
    fn test_operation_result_fail() {
        let result: OperationResult<i32> = OperationResult::fail("Something went wrong");
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.error, Some("Something went wrong".to_string()));
    }

    #[test]
    fn test_from_result() {
        let err: Result<i32> = Err(Error::AuthRequired);
        let result: OperationResult<i32> = err.into();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("logged in"));
    }

    #[test]
    fn test_batch_persist_message_names_batch() {
        let err = Error::BatchPersist {
            batch_index: 2,
            message: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "Batch 2 failed to persist: connection reset");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(Error::parse("empty").is_fatal());
        assert!(Error::AuthRequired.is_fatal());
        assert!(Error::NoValidRecords.is_fatal());
        assert!(!Error::validation("map a column").is_fatal());
    }
}
