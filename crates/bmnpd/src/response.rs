//! Controller response descriptor and transport failure.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// Name of the header the controller sets when it is overloaded.
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// What came back from one controller request.
///
/// Produced once per dispatch and never mutated afterwards. Header names
/// are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseDescriptor {
    pub status_code: u16,
    /// Reason phrase, when the transport provides one.
    pub reason: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl ResponseDescriptor {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Looks up a header, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Delay requested by the controller's `retry-after` header.
    ///
    /// Only the delta-seconds form is understood. The value is reported
    /// for logging; nothing in this crate waits on it.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header(RETRY_AFTER_HEADER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// The request never produced an HTTP response (DNS, connect, timeout, I/O).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        use std::error::Error as _;

        let mut message = e.to_string();
        let mut source = e.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        TransportError(message)
    }
}
