//! Port lifecycle coordinator.
//!
//! Each operation sends at most one request to the controller, classifies
//! the result and only then touches the mapping store. A failed or
//! rejected controller call leaves the store exactly as it was.

use std::fmt;
use std::sync::Arc;

use bmnp_db::{PortMappingStore, StoreError};
use bmnp_types::{IronicSwitchPortMapping, PortProvisioningRequest, SwitchPortRecord};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::classifier::{classify, ProvisioningOutcome};
use crate::config_file::ControllerConfig;
use crate::dispatcher::{Dispatcher, HttpDispatcher, PortOperation};
use crate::error::{ProvisionError, ProvisionResult};

/// Result of a bind that reached the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindStatus {
    Success,
    Failure,
}

impl BindStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BindStatus::Success => "bind_success",
            BindStatus::Failure => "bind_failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BindStatus::Success)
    }
}

impl fmt::Display for BindStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The controller accepted the bind.
pub const BIND_SUCCESS: BindStatus = BindStatus::Success;

/// The controller answered but declined the bind.
pub const BIND_FAILURE: BindStatus = BindStatus::Failure;

/// Runs create, bind, update and delete for bare-metal ports.
///
/// Shared behind an `Arc`; every operation takes `&self`. Callers must not
/// run two operations for the same port id concurrently.
pub struct PortLifecycleCoordinator {
    dispatcher: Arc<dyn Dispatcher>,
    store: Arc<dyn PortMappingStore>,
}

impl PortLifecycleCoordinator {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, store: Arc<dyn PortMappingStore>) -> Self {
        Self { dispatcher, store }
    }

    /// Builds a coordinator that talks HTTP to the configured controller.
    pub fn from_config(
        config: &ControllerConfig,
        store: Arc<dyn PortMappingStore>,
    ) -> ProvisionResult<Self> {
        let dispatcher = HttpDispatcher::new(config)?;
        info!("Using SDN controller at {}", dispatcher.base_url());
        Ok(Self::new(Arc::new(dispatcher), store))
    }

    /// Sends one operation and classifies the answer.
    ///
    /// Returns the HTTP status alongside the outcome when there was one.
    async fn send(
        &self,
        operation: PortOperation,
        request: &PortProvisioningRequest,
    ) -> (ProvisioningOutcome, Option<u16>) {
        let result = self.dispatcher.dispatch(operation, request).await;

        if let Ok(response) = &result {
            if let Some(delay) = response.retry_after() {
                warn!(
                    "Controller asked to retry {} for port {} after {}s",
                    operation,
                    request.port_id,
                    delay.as_secs()
                );
            }
        }

        let status = result.as_ref().ok().map(|r| r.status_code);
        (classify(&result), status)
    }

    /// Creates the port on the controller and records its switch ports.
    ///
    /// Returns the stored mapping.
    #[instrument(skip(self, request), fields(port = %request.port_id))]
    pub async fn create_port(
        &self,
        request: &PortProvisioningRequest,
    ) -> ProvisionResult<IronicSwitchPortMapping> {
        if request.port_id.is_empty() {
            return Err(ProvisionError::invalid_request("port id is empty"));
        }

        let (outcome, status) = self.send(PortOperation::Create, request).await;
        match outcome {
            ProvisioningOutcome::Success => {}
            ProvisioningOutcome::BindFailure => {
                return Err(rejected(PortOperation::Create, request, status));
            }
            ProvisioningOutcome::ConnectionFailed(message) => {
                warn!("Create failed for {}:{}", request.port_id, message);
                return Err(ProvisionError::connection_failed(message));
            }
        }

        let mut written = Vec::with_capacity(request.switch_bindings.len());
        let mapping = match self.record_created_port(request, &mut written).await {
            Ok(mapping) => mapping,
            Err(e) => {
                self.discard_switch_ports(&request.port_id, &written).await;
                return Err(e);
            }
        };

        info!(
            "Created port {} with {} switch port(s)",
            request.port_id,
            mapping.switch_port_ids.len()
        );
        Ok(mapping)
    }

    /// Writes the switch-port records and the mapping for a created port.
    ///
    /// Every switch-port id is pushed to `written` before its write is
    /// attempted so the caller can undo a partial write.
    async fn record_created_port(
        &self,
        request: &PortProvisioningRequest,
        written: &mut Vec<String>,
    ) -> ProvisionResult<IronicSwitchPortMapping> {
        let lag_id = request.is_lag.then(|| Uuid::new_v4().to_string());
        for binding in &request.switch_bindings {
            let record =
                SwitchPortRecord::from_binding(Uuid::new_v4().to_string(), binding, lag_id.clone());
            debug!(
                "Recording switch port {} on {}",
                record.port_name, record.switch_id
            );
            written.push(record.id.clone());
            self.store.add_switch_port(record).await?;
        }

        let mut mapping = IronicSwitchPortMapping::new(request.port_id.clone(), written.clone());
        mapping.bind_requested = request.bind_requested;
        mapping.access_type = request.access_type;
        self.store
            .add_ironic_switch_port_mapping(mapping.clone())
            .await?;
        Ok(mapping)
    }

    /// Best-effort removal of switch-port records left by a failed create.
    async fn discard_switch_ports(&self, port_id: &str, switch_port_ids: &[String]) {
        warn!(
            "Rolling back {} switch port record(s) for {}",
            switch_port_ids.len(),
            port_id
        );
        for id in switch_port_ids {
            if let Err(e) = self.store.delete_switch_port(id).await {
                warn!("Failed to remove switch port {} for {}: {}", id, port_id, e);
            }
        }
    }

    /// Binds the port into the request's segment.
    ///
    /// A controller refusal is reported as [`BIND_FAILURE`], not as an error.
    #[instrument(skip(self, request), fields(port = %request.port_id))]
    pub async fn bind_port_to_segment(
        &self,
        request: &PortProvisioningRequest,
    ) -> ProvisionResult<BindStatus> {
        let segmentation_id = request.segmentation_id.ok_or_else(|| {
            ProvisionError::invalid_request(format!(
                "bind for port {} has no segmentation id",
                request.port_id
            ))
        })?;

        if self
            .store
            .get_ironic_swport_map_by_id(&request.port_id)
            .await?
            .is_none()
        {
            return Err(ProvisionError::mapping_not_found(&request.port_id));
        }

        let (outcome, status) = self.send(PortOperation::Bind, request).await;
        match outcome {
            ProvisioningOutcome::Success => {
                self.store
                    .update_swport_map_with_segment_id(&request.port_id, segmentation_id)
                    .await
                    .map_err(|e| not_found_as_mapping(e, &request.port_id))?;
                info!(
                    "Bound port {} to segment {}",
                    request.port_id, segmentation_id
                );
                Ok(BIND_SUCCESS)
            }
            ProvisioningOutcome::BindFailure => {
                warn!(
                    "Controller declined bind of {} to segment {} (status {:?})",
                    request.port_id, segmentation_id, status
                );
                Ok(BIND_FAILURE)
            }
            ProvisioningOutcome::ConnectionFailed(message) => {
                warn!("Bind failed for {}:{}", request.port_id, message);
                Err(ProvisionError::connection_failed(message))
            }
        }
    }

    /// Records the port's bind request flag. Nothing is sent to the controller.
    #[instrument(skip(self, request), fields(port = %request.port_id))]
    pub async fn update_port(&self, request: &PortProvisioningRequest) -> ProvisionResult<()> {
        self.store
            .update_swport_map_with_bind_request(&request.port_id, request.bind_requested)
            .await
            .map_err(|e| not_found_as_mapping(e, &request.port_id))?;

        info!(
            "Updated port {} bind_requested={}",
            request.port_id, request.bind_requested
        );
        Ok(())
    }

    /// Deletes the port on the controller, then its local records.
    #[instrument(skip(self, request), fields(port = %request.port_id))]
    pub async fn delete_port(&self, request: &PortProvisioningRequest) -> ProvisionResult<()> {
        let mapping = self
            .store
            .get_ironic_swport_map_by_id(&request.port_id)
            .await?
            .ok_or_else(|| ProvisionError::mapping_not_found(&request.port_id))?;

        for id in &mapping.switch_port_ids {
            match self.store.get_switch_port_by_id(id).await? {
                Some(record) => debug!(
                    "Port {} uses switch port {} on {}",
                    request.port_id, record.port_name, record.switch_id
                ),
                None => warn!(
                    "Mapping for {} references missing switch port {}",
                    request.port_id, id
                ),
            }
        }

        let (outcome, status) = self.send(PortOperation::Delete, request).await;
        match outcome {
            ProvisioningOutcome::Success => {}
            ProvisioningOutcome::BindFailure => {
                return Err(rejected(PortOperation::Delete, request, status));
            }
            ProvisioningOutcome::ConnectionFailed(message) => {
                warn!("Delete failed for {}:{}", request.port_id, message);
                return Err(ProvisionError::connection_failed(message));
            }
        }

        // Mapping first: a failure part way never leaves it pointing at
        // deleted switch ports.
        self.store.delete_ironic_swport_map(&request.port_id).await?;
        for id in &mapping.switch_port_ids {
            self.store.delete_switch_port(id).await?;
        }

        info!("Deleted port {}", request.port_id);
        Ok(())
    }
}

fn rejected(
    operation: PortOperation,
    request: &PortProvisioningRequest,
    status: Option<u16>,
) -> ProvisionError {
    let status = status.unwrap_or_default();
    warn!(
        "Controller rejected {} for {} with status {}",
        operation, request.port_id, status
    );
    ProvisionError::Rejected {
        operation: operation.to_string(),
        port_id: request.port_id.clone(),
        status,
    }
}

fn not_found_as_mapping(e: StoreError, port_id: &str) -> ProvisionError {
    match e {
        StoreError::NotFound { .. } => ProvisionError::mapping_not_found(port_id),
        other => ProvisionError::Store(other),
    }
}
