//! Maps controller responses to provisioning outcomes.
//!
//! | Status | Outcome |
//! |--------|---------|
//! | 200, 204 | `Success` |
//! | any other below 400 (e.g. 203) | `BindFailure` |
//! | 400-499 | `ConnectionFailed("... <code> Client Error: <reason>")` |
//! | 500 and above | `ConnectionFailed("... <code> Server Error: <reason>")` |
//! | no response | `ConnectionFailed("... <transport detail>")` |
//!
//! A 404 is a connection failure here; "device not found" and "controller
//! unreachable" are not told apart at this layer.

use crate::response::{ResponseDescriptor, TransportError};

/// Prefix of every connection failure detail.
pub const CONNECTION_FAILED_PREFIX: &str = " Connection has failed: ";

/// Placeholder used when the response carries no reason phrase.
const NO_REASON: &str = "None";

/// Result of one controller interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    /// The controller accepted the operation.
    Success,
    /// The controller answered but declined the bind.
    BindFailure,
    /// Transport failure or HTTP error, with a human-readable detail.
    ConnectionFailed(String),
}

impl ProvisioningOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProvisioningOutcome::Success)
    }
}

/// Classifies the result of one dispatch.
pub fn classify(result: &Result<ResponseDescriptor, TransportError>) -> ProvisioningOutcome {
    match result {
        Ok(response) => classify_response(response),
        Err(e) => ProvisioningOutcome::ConnectionFailed(format!("{}{}", CONNECTION_FAILED_PREFIX, e)),
    }
}

/// Classifies a response that made it back from the controller.
pub fn classify_response(response: &ResponseDescriptor) -> ProvisioningOutcome {
    let code = response.status_code;
    match code {
        200 | 204 => ProvisioningOutcome::Success,
        0..=399 => ProvisioningOutcome::BindFailure,
        400..=499 => ProvisioningOutcome::ConnectionFailed(http_error_detail(
            code,
            "Client Error",
            response.reason.as_deref(),
        )),
        _ => ProvisioningOutcome::ConnectionFailed(http_error_detail(
            code,
            "Server Error",
            response.reason.as_deref(),
        )),
    }
}

fn http_error_detail(code: u16, kind: &str, reason: Option<&str>) -> String {
    format!(
        "{}{} {}: {}",
        CONNECTION_FAILED_PREFIX,
        code,
        kind,
        reason.unwrap_or(NO_REASON)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn outcome(code: u16) -> ProvisioningOutcome {
        classify(&Ok(ResponseDescriptor::new(code)))
    }

    #[test]
    fn test_success_codes() {
        assert_eq!(outcome(200), ProvisioningOutcome::Success);
        assert_eq!(outcome(204), ProvisioningOutcome::Success);
        assert!(outcome(204).is_success());
    }

    #[test]
    fn test_bind_failure_codes() {
        assert_eq!(outcome(203), ProvisioningOutcome::BindFailure);
        assert_eq!(outcome(201), ProvisioningOutcome::BindFailure);
        assert_eq!(outcome(302), ProvisioningOutcome::BindFailure);
    }

    #[test]
    fn test_not_found_without_reason() {
        assert_eq!(
            outcome(404),
            ProvisioningOutcome::ConnectionFailed(
                " Connection has failed: 404 Client Error: None".to_string()
            )
        );
    }

    #[test]
    fn test_service_unavailable_with_reason() {
        let resp = ResponseDescriptor::new(503)
            .with_reason("connection error")
            .with_header("retry-after", "10");
        assert_eq!(
            classify_response(&resp),
            ProvisioningOutcome::ConnectionFailed(
                " Connection has failed: 503 Server Error: connection error".to_string()
            )
        );
    }

    #[test]
    fn test_client_error_with_reason() {
        let resp = ResponseDescriptor::new(409).with_reason("Conflict");
        assert_eq!(
            classify_response(&resp),
            ProvisioningOutcome::ConnectionFailed(
                " Connection has failed: 409 Client Error: Conflict".to_string()
            )
        );
    }

    #[test]
    fn test_transport_failure() {
        let result = Err(TransportError::new("error sending request: connection refused"));
        assert_eq!(
            classify(&result),
            ProvisioningOutcome::ConnectionFailed(
                " Connection has failed: error sending request: connection refused".to_string()
            )
        );
    }
}
