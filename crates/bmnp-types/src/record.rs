//! Persisted switch-port mapping records.

use crate::{AccessType, MacAddress, SegmentationId, SwitchBinding};
use serde::{Deserialize, Serialize};

/// A physical switch port known to the provisioning store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchPortRecord {
    /// Store-assigned identifier.
    pub id: String,
    pub switch_id: MacAddress,
    /// Interface name on the switch.
    pub port_name: String,
    /// Shared by every member port of the same LAG.
    pub lag_id: Option<String>,
}

impl SwitchPortRecord {
    /// Builds the record for one switch binding.
    pub fn from_binding(
        id: impl Into<String>,
        binding: &SwitchBinding,
        lag_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            switch_id: binding.switch_id,
            port_name: binding.physical_port_id.clone(),
            lag_id,
        }
    }
}

/// Association between a bare-metal port and the switch ports backing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IronicSwitchPortMapping {
    /// Cloud-side port identifier.
    pub port_id: String,
    /// Ids of the [`SwitchPortRecord`]s this port is cabled to.
    pub switch_port_ids: Vec<String>,
    /// Set once the controller has confirmed a bind.
    pub segmentation_id: Option<SegmentationId>,
    pub bind_requested: bool,
    pub access_type: AccessType,
}

impl IronicSwitchPortMapping {
    pub fn new(port_id: impl Into<String>, switch_port_ids: Vec<String>) -> Self {
        Self {
            port_id: port_id.into(),
            switch_port_ids,
            segmentation_id: None,
            bind_requested: false,
            access_type: AccessType::default(),
        }
    }

    /// True when the port has been bound into a segment.
    pub fn is_bound(&self) -> bool {
        self.segmentation_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_switch_port_from_binding() {
        let binding = SwitchBinding::new(
            "Ten-GigabitEthernet1/0/35",
            "44:31:92:61:89:d2".parse().unwrap(),
        );
        let record = SwitchPortRecord::from_binding("sp-1", &binding, Some("lag-1".into()));

        assert_eq!(record.id, "sp-1");
        assert_eq!(record.port_name, "Ten-GigabitEthernet1/0/35");
        assert_eq!(record.switch_id, binding.switch_id);
        assert_eq!(record.lag_id.as_deref(), Some("lag-1"));
    }

    #[test]
    fn test_mapping_bound_state() {
        let mut mapping = IronicSwitchPortMapping::new("p1", vec!["sp-1".into()]);
        assert!(!mapping.is_bound());

        mapping.segmentation_id = Some(SegmentationId::new(1001).unwrap());
        assert!(mapping.is_bound());
    }
}
