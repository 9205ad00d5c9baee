//! Request dispatcher for the SDN controller REST API.
//!
//! One operation maps to exactly one HTTP request. There is no retry and
//! no backoff here; a `retry-after` header is passed back to the caller
//! untouched in the [`ResponseDescriptor`].

use std::fmt;

use async_trait::async_trait;
use bmnp_types::{AccessType, MacAddress, PortProvisioningRequest, SegmentationId};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config_file::ControllerConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::response::{ResponseDescriptor, TransportError};

/// Port lifecycle operations that reach the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortOperation {
    Create,
    Bind,
    Delete,
}

impl PortOperation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PortOperation::Create => "create",
            PortOperation::Bind => "bind",
            PortOperation::Delete => "delete",
        }
    }

    /// HTTP method for the operation.
    pub fn method(&self) -> Method {
        match self {
            PortOperation::Create => Method::POST,
            PortOperation::Bind => Method::PUT,
            PortOperation::Delete => Method::DELETE,
        }
    }

    /// Path relative to the controller base URL.
    pub fn path(&self, port_id: &str) -> String {
        match self {
            PortOperation::Create => "ports".to_string(),
            PortOperation::Bind => format!("ports/{}/bind", port_id),
            PortOperation::Delete => format!("ports/{}", port_id),
        }
    }
}

impl fmt::Display for PortOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sends one operation to the controller.
///
/// Implementations never retry. A missing response is a
/// [`TransportError`]; any HTTP status, including errors, is a
/// [`ResponseDescriptor`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        operation: PortOperation,
        request: &PortProvisioningRequest,
    ) -> Result<ResponseDescriptor, TransportError>;
}

/// `{"port": {...}}` body sent to the controller.
///
/// Switch credentials and ifindex hints are SNMP-only and never leave
/// the driver.
#[derive(Debug, Serialize)]
struct ControllerEnvelope<'a> {
    port: ControllerPort<'a>,
}

#[derive(Debug, Serialize)]
struct ControllerPort<'a> {
    id: &'a str,
    switchports: Vec<ControllerSwitchPort<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    segmentation_id: Option<SegmentationId>,
    bind_requested: bool,
    access_type: AccessType,
    is_lag: bool,
}

#[derive(Debug, Serialize)]
struct ControllerSwitchPort<'a> {
    port_id: &'a str,
    switch_id: MacAddress,
}

impl<'a> From<&'a PortProvisioningRequest> for ControllerEnvelope<'a> {
    fn from(request: &'a PortProvisioningRequest) -> Self {
        Self {
            port: ControllerPort {
                id: &request.port_id,
                switchports: request
                    .switch_bindings
                    .iter()
                    .map(|b| ControllerSwitchPort {
                        port_id: &b.physical_port_id,
                        switch_id: b.switch_id,
                    })
                    .collect(),
                segmentation_id: request.segmentation_id,
                bind_requested: request.bind_requested,
                access_type: request.access_type,
                is_lag: request.is_lag,
            },
        }
    }
}

/// [`Dispatcher`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    base_url: String,
}

impl HttpDispatcher {
    /// Builds a dispatcher from controller settings.
    pub fn new(config: &ControllerConfig) -> ProvisionResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| {
                ProvisionError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_client(client, &config.base_url))
    }

    /// Uses a caller-provided client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an operation on a port.
    pub fn endpoint(&self, operation: PortOperation, port_id: &str) -> String {
        format!("{}/{}", self.base_url, operation.path(port_id))
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    #[instrument(skip(self, request), fields(port = %request.port_id, op = %operation))]
    async fn dispatch(
        &self,
        operation: PortOperation,
        request: &PortProvisioningRequest,
    ) -> Result<ResponseDescriptor, TransportError> {
        let url = self.endpoint(operation, &request.port_id);
        debug!("{} {}", operation.method(), url);

        let response = self
            .client
            .request(operation.method(), &url)
            .header(ACCEPT, "application/json")
            .json(&ControllerEnvelope::from(request))
            .send()
            .await?;

        let status = response.status();
        let mut descriptor = ResponseDescriptor::new(status.as_u16());
        if let Some(reason) = status.canonical_reason() {
            descriptor = descriptor.with_reason(reason);
        }
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                descriptor = descriptor.with_header(name.as_str(), value);
            }
        }

        let body = response.text().await?;
        if !body.is_empty() {
            descriptor = descriptor.with_body(body);
        }

        debug!("Controller answered {}", descriptor.status_code);
        Ok(descriptor)
    }
}
