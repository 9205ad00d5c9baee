//! Error types for mapping store operations.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by a [`PortMappingStore`](crate::PortMappingStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record to update does not exist.
    #[error("Record not found: {table}:{key}")]
    NotFound {
        /// Table name.
        table: String,
        /// Record key.
        key: String,
    },

    /// Could not reach the backend.
    #[error("Store connection error: {0}")]
    Connection(String),

    /// The backend rejected a command.
    #[error("Store command failed: {operation}: {message}")]
    Command {
        /// The command that failed (e.g. "HGETALL").
        operation: String,
        /// Backend error message.
        message: String,
    },

    /// A stored record could not be decoded.
    #[error("Invalid stored data for {key}: {message}")]
    InvalidData {
        /// Full backend key of the record.
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

impl StoreError {
    pub fn not_found(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            key: key.into(),
        }
    }

    pub fn command(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Command {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_data(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidData {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true if the failure is transient and the call may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Command { .. })
    }
}
