//! Error types for the provisioning driver.

use std::io;

use bmnp_db::StoreError;
use thiserror::Error;

/// Result type alias for provisioning operations.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors surfaced by the lifecycle coordinator and its collaborators.
///
/// A bind rejected by the controller is not an error; it is returned as
/// [`BIND_FAILURE`](crate::BIND_FAILURE).
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The controller could not be reached or answered with an HTTP error.
    ///
    /// The message is the classifier's detail string, shown verbatim.
    #[error("{message}")]
    ConnectionFailed {
        /// Detail, e.g. `" Connection has failed: 404 Client Error: None"`.
        message: String,
    },

    /// The controller answered a create or delete with a non-success,
    /// non-error status.
    #[error("Controller rejected {operation} for port {port_id} (status {status})")]
    Rejected {
        /// The operation name.
        operation: String,
        /// The port the operation was for.
        port_id: String,
        /// HTTP status returned.
        status: u16,
    },

    /// No local mapping exists for the port.
    #[error("No switch port mapping for port '{port_id}'")]
    MappingNotFound {
        /// The port that was looked up.
        port_id: String,
    },

    /// The request is missing data the operation needs.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Mapping store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// SNMP get/set against a switch failed.
    #[error("SNMP {operation} failed: {message}")]
    SnmpFailure {
        /// "GET" or "SET".
        operation: String,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ProvisionError {
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    pub fn mapping_not_found(port_id: impl Into<String>) -> Self {
        Self::MappingNotFound {
            port_id: port_id.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn snmp_failure(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::SnmpFailure {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    ///
    /// Nothing in this crate retries; callers own the policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProvisionError::ConnectionFailed { .. } => true,
            ProvisionError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}
