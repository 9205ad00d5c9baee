//! Value types for bare-metal network provisioning.
//!
//! This crate holds the types shared between the provisioning driver and
//! the mapping store:
//!
//! - [`MacAddress`]: switch identifier (chassis MAC)
//! - [`SegmentationId`]: VLAN segment a port is bound into
//! - [`AccessType`]: access or trunk port mode
//! - [`PortProvisioningRequest`]: immutable input to one lifecycle operation
//! - [`SwitchPortRecord`], [`IronicSwitchPortMapping`]: persisted mapping state

mod mac;
mod record;
mod request;
mod segment;

pub use mac::MacAddress;
pub use record::{IronicSwitchPortMapping, SwitchPortRecord};
pub use request::{
    PortEnvelope, PortProvisioningRequest, SnmpAccessProtocol, SwitchBinding, SwitchCredentials,
};
pub use segment::{AccessType, SegmentationId};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid segmentation id: {0} (must be 1-4094)")]
    InvalidSegmentationId(String),

    #[error("invalid access type: {0}")]
    InvalidAccessType(String),

    #[error("invalid SNMP access protocol: {0}")]
    InvalidAccessProtocol(String),
}
