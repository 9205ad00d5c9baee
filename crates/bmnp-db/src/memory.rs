//! In-process mapping store.

use std::collections::HashMap;

use async_trait::async_trait;
use bmnp_types::{IronicSwitchPortMapping, SegmentationId, SwitchPortRecord};
use tokio::sync::RwLock;
use tracing::debug;

use crate::tables::IRONIC_SWITCH_PORT_MAPPING_TABLE;
use crate::{PortMappingStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    mappings: HashMap<String, IronicSwitchPortMapping>,
    switch_ports: HashMap<String, SwitchPortRecord>,
}

/// Mapping store held in memory.
///
/// Used for dry runs and as the reference backend in tests. Nothing
/// survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of port mappings currently stored.
    pub async fn mapping_count(&self) -> usize {
        self.tables.read().await.mappings.len()
    }

    /// Number of switch port records currently stored.
    pub async fn switch_port_count(&self) -> usize {
        self.tables.read().await.switch_ports.len()
    }

    /// Returns every switch port record (unordered).
    pub async fn switch_ports(&self) -> Vec<SwitchPortRecord> {
        self.tables
            .read()
            .await
            .switch_ports
            .values()
            .cloned()
            .collect()
    }

    async fn update_mapping<F>(&self, port_id: &str, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut IronicSwitchPortMapping) + Send,
    {
        let mut tables = self.tables.write().await;
        let mapping = tables
            .mappings
            .get_mut(port_id)
            .ok_or_else(|| StoreError::not_found(IRONIC_SWITCH_PORT_MAPPING_TABLE, port_id))?;
        apply(mapping);
        Ok(())
    }
}

#[async_trait]
impl PortMappingStore for MemoryStore {
    async fn add_switch_port(&self, record: SwitchPortRecord) -> StoreResult<()> {
        debug!("Adding switch port {} ({})", record.id, record.port_name);
        self.tables
            .write()
            .await
            .switch_ports
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn add_ironic_switch_port_mapping(
        &self,
        mapping: IronicSwitchPortMapping,
    ) -> StoreResult<()> {
        debug!("Adding mapping for port {}", mapping.port_id);
        self.tables
            .write()
            .await
            .mappings
            .insert(mapping.port_id.clone(), mapping);
        Ok(())
    }

    async fn update_swport_map_with_segment_id(
        &self,
        port_id: &str,
        segmentation_id: SegmentationId,
    ) -> StoreResult<()> {
        self.update_mapping(port_id, |m| m.segmentation_id = Some(segmentation_id))
            .await
    }

    async fn update_swport_map_with_bind_request(
        &self,
        port_id: &str,
        bind_requested: bool,
    ) -> StoreResult<()> {
        self.update_mapping(port_id, |m| m.bind_requested = bind_requested)
            .await
    }

    async fn get_ironic_swport_map_by_id(
        &self,
        port_id: &str,
    ) -> StoreResult<Option<IronicSwitchPortMapping>> {
        Ok(self.tables.read().await.mappings.get(port_id).cloned())
    }

    async fn get_switch_port_by_id(
        &self,
        switch_port_id: &str,
    ) -> StoreResult<Option<SwitchPortRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .switch_ports
            .get(switch_port_id)
            .cloned())
    }

    async fn delete_switch_port(&self, switch_port_id: &str) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .switch_ports
            .remove(switch_port_id);
        Ok(())
    }

    async fn delete_ironic_swport_map(&self, port_id: &str) -> StoreResult<()> {
        self.tables.write().await.mappings.remove(port_id);
        Ok(())
    }
}
