//! The persistence collaborator trait.

use async_trait::async_trait;
use bmnp_types::{IronicSwitchPortMapping, SegmentationId, SwitchPortRecord};

use crate::StoreResult;

/// CRUD surface for switch-port mapping state.
///
/// Each method is a single primitive: implementations make it atomic, and
/// retrying any of them after a failure is safe. Updates on a missing
/// mapping fail with [`StoreError::NotFound`](crate::StoreError::NotFound).
/// Deleting a missing record succeeds.
///
/// The store does no locking across calls. Callers serialize writes per
/// port id.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PortMappingStore: Send + Sync {
    /// Inserts (or replaces) a switch port record.
    async fn add_switch_port(&self, record: SwitchPortRecord) -> StoreResult<()>;

    /// Inserts (or replaces) the mapping for a port.
    async fn add_ironic_switch_port_mapping(
        &self,
        mapping: IronicSwitchPortMapping,
    ) -> StoreResult<()>;

    /// Records the segment the port was bound into.
    async fn update_swport_map_with_segment_id(
        &self,
        port_id: &str,
        segmentation_id: SegmentationId,
    ) -> StoreResult<()>;

    /// Records whether a bind has been requested for the port.
    async fn update_swport_map_with_bind_request(
        &self,
        port_id: &str,
        bind_requested: bool,
    ) -> StoreResult<()>;

    async fn get_ironic_swport_map_by_id(
        &self,
        port_id: &str,
    ) -> StoreResult<Option<IronicSwitchPortMapping>>;

    async fn get_switch_port_by_id(
        &self,
        switch_port_id: &str,
    ) -> StoreResult<Option<SwitchPortRecord>>;

    async fn delete_switch_port(&self, switch_port_id: &str) -> StoreResult<()>;

    async fn delete_ironic_swport_map(&self, port_id: &str) -> StoreResult<()>;
}
