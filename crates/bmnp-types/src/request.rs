//! Port provisioning request model.
//!
//! The cloud side hands the driver a JSON envelope of the form:
//!
//! ```json
//! {"port": {
//!     "id": "321f506f-5f0d-435c-9c23-c2a11f78c3e3",
//!     "segmentation_id": "1001",
//!     "bind_requested": true,
//!     "access_type": "access",
//!     "is_lag": false,
//!     "switchports": [
//!         {"port_id": "Ten-GigabitEthernet1/0/35", "switch_id": "44:31:92:61:89:d2"}
//!     ]
//! }}
//! ```
//!
//! The same envelope is forwarded as the body of controller requests.

use crate::{AccessType, MacAddress, ParseError, SegmentationId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One physical switch port the bare-metal port is cabled to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchBinding {
    /// Interface name on the switch (e.g. `Ten-GigabitEthernet1/0/35`).
    #[serde(rename = "port_id")]
    pub physical_port_id: String,

    /// Chassis MAC of the switch.
    pub switch_id: MacAddress,

    /// SNMP interface index, when known. Only the SNMP facet uses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifindex: Option<u32>,
}

impl SwitchBinding {
    pub fn new(physical_port_id: impl Into<String>, switch_id: MacAddress) -> Self {
        Self {
            physical_port_id: physical_port_id.into(),
            switch_id,
            ifindex: None,
        }
    }

    pub fn with_ifindex(mut self, ifindex: u32) -> Self {
        self.ifindex = Some(ifindex);
        self
    }
}

/// SNMP protocol version used to reach a switch directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnmpAccessProtocol {
    SnmpV1,
    #[default]
    SnmpV2c,
    SnmpV3,
}

impl SnmpAccessProtocol {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SnmpAccessProtocol::SnmpV1 => "snmpv1",
            SnmpAccessProtocol::SnmpV2c => "snmpv2c",
            SnmpAccessProtocol::SnmpV3 => "snmpv3",
        }
    }
}

impl fmt::Display for SnmpAccessProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnmpAccessProtocol {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snmpv1" => Ok(SnmpAccessProtocol::SnmpV1),
            "snmpv2c" => Ok(SnmpAccessProtocol::SnmpV2c),
            "snmpv3" => Ok(SnmpAccessProtocol::SnmpV3),
            _ => Err(ParseError::InvalidAccessProtocol(s.to_string())),
        }
    }
}

/// Management credentials for switches provisioned over SNMP.
///
/// v1/v2c use `write_community`; v3 uses the USM fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchCredentials {
    pub ip_address: String,
    #[serde(default)]
    pub access_protocol: SnmpAccessProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_community: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priv_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priv_key: Option<String>,
}

// Keys and communities stay out of logs.
impl fmt::Debug for SwitchCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchCredentials")
            .field("ip_address", &self.ip_address)
            .field("access_protocol", &self.access_protocol)
            .field("security_name", &self.security_name)
            .finish_non_exhaustive()
    }
}

/// Immutable input to one port lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortProvisioningRequest {
    /// Cloud-side port identifier.
    #[serde(rename = "id")]
    pub port_id: String,

    /// Physical switch ports backing this port.
    #[serde(rename = "switchports", default)]
    pub switch_bindings: Vec<SwitchBinding>,

    /// Segment to bind into. Required for bind, optional otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_id: Option<SegmentationId>,

    #[serde(default)]
    pub bind_requested: bool,

    #[serde(default)]
    pub access_type: AccessType,

    /// True when the switch bindings form a link aggregation group.
    #[serde(default)]
    pub is_lag: bool,

    /// Direct switch management credentials (SNMP facet only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<SwitchCredentials>,
}

impl PortProvisioningRequest {
    /// Creates a request with no bindings and default flags.
    pub fn new(port_id: impl Into<String>) -> Self {
        Self {
            port_id: port_id.into(),
            switch_bindings: Vec::new(),
            segmentation_id: None,
            bind_requested: false,
            access_type: AccessType::default(),
            is_lag: false,
            credentials: None,
        }
    }

    pub fn with_binding(mut self, binding: SwitchBinding) -> Self {
        self.switch_bindings.push(binding);
        self
    }

    pub fn with_segmentation_id(mut self, segmentation_id: SegmentationId) -> Self {
        self.segmentation_id = Some(segmentation_id);
        self
    }

    pub fn with_bind_requested(mut self, bind_requested: bool) -> Self {
        self.bind_requested = bind_requested;
        self
    }

    pub fn with_access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }

    pub fn with_lag(mut self, is_lag: bool) -> Self {
        self.is_lag = is_lag;
        self
    }

    pub fn with_credentials(mut self, credentials: SwitchCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Wraps the request in the `{"port": ...}` envelope.
    pub fn into_envelope(self) -> PortEnvelope {
        PortEnvelope { port: self }
    }
}

/// The `{"port": {...}}` wire envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortEnvelope {
    pub port: PortProvisioningRequest,
}

impl From<PortEnvelope> for PortProvisioningRequest {
    fn from(envelope: PortEnvelope) -> Self {
        envelope.port
    }
}
