//! Port isolation over SNMP (Q-BRIDGE-MIB).
//!
//! Switches that are not behind the SDN controller are programmed
//! directly: the port's segment becomes a static VLAN and the port's
//! ifindex is added to that VLAN's egress port list.
//!
//! The SNMP transport is an [`SnmpConnector`]; the UDP v2c one lives in
//! [`crate::snmp_udp`].

use std::sync::Arc;

use async_trait::async_trait;
use bmnp_types::{PortProvisioningRequest, SwitchCredentials};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::error::{ProvisionError, ProvisionResult};

/// dot1qVlanStaticRowStatus
pub const OID_VLAN_CREATE: &str = "1.3.6.1.2.1.17.7.1.4.3.1.5";

/// dot1qVlanStaticEgressPorts
pub const OID_VLAN_EGRESS_PORT: &str = "1.3.6.1.2.1.17.7.1.4.3.1.2";

/// RowStatus createAndGo
pub const ROW_STATUS_CREATE_AND_GO: i64 = 4;

/// RowStatus destroy
pub const ROW_STATUS_DESTROY: i64 = 6;

/// Highest ifindex a `PortList` may carry (512 bytes).
pub const MAX_PORT_LIST_IFINDEX: u32 = 4096;

/// Value bound to an OID in a get response or set request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    NoSuchInstance,
    NoSuchObject,
    /// Any other type; never produced by a VLAN table read.
    Unsupported,
}

impl SnmpValue {
    /// True when the agent reports the OID as absent.
    pub fn is_absent(&self) -> bool {
        matches!(self, SnmpValue::NoSuchInstance | SnmpValue::NoSuchObject)
    }
}

/// Failure reported by an SNMP transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SnmpError(pub String);

impl SnmpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// One switch's SNMP agent.
#[async_trait]
pub trait SnmpClient: Send + Sync {
    /// Reads one OID. An empty vector means the agent returned no varbinds.
    async fn get(&self, oid: &str) -> Result<Vec<(String, SnmpValue)>, SnmpError>;

    async fn set(&self, oid: &str, value: SnmpValue) -> Result<(), SnmpError>;
}

/// Opens an [`SnmpClient`] for a switch.
#[async_trait]
pub trait SnmpConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &SwitchCredentials,
    ) -> Result<Arc<dyn SnmpClient>, SnmpError>;
}

/// Direct switch programming for ports outside the controller's reach.
#[async_trait]
pub trait PortIsolationDriver: Send + Sync {
    /// Places the port into its segment's VLAN, creating the VLAN if needed.
    async fn set_isolation(&self, request: &PortProvisioningRequest) -> ProvisionResult<()>;

    /// Removes the port from its segment's VLAN. The VLAN itself is
    /// destroyed when `is_last_port_vlan` is set.
    async fn delete_isolation(
        &self,
        request: &PortProvisioningRequest,
        is_last_port_vlan: bool,
    ) -> ProvisionResult<()>;

    async fn create_lag(&self, request: &PortProvisioningRequest) -> ProvisionResult<()>;

    async fn delete_lag(&self, request: &PortProvisioningRequest) -> ProvisionResult<()>;
}

/// [`PortIsolationDriver`] speaking Q-BRIDGE-MIB.
pub struct SnmpIsolationDriver {
    connector: Arc<dyn SnmpConnector>,
}

/// What one isolation call needs out of a request.
struct IsolationTarget<'a> {
    credentials: &'a SwitchCredentials,
    vlan: u16,
    ifindex: u32,
}

impl SnmpIsolationDriver {
    pub fn new(connector: Arc<dyn SnmpConnector>) -> Self {
        Self { connector }
    }

    fn target(request: &PortProvisioningRequest) -> ProvisionResult<IsolationTarget<'_>> {
        let credentials = request.credentials.as_ref().ok_or_else(|| {
            ProvisionError::invalid_request(format!(
                "port {} has no switch credentials",
                request.port_id
            ))
        })?;
        let vlan = request.segmentation_id.ok_or_else(|| {
            ProvisionError::invalid_request(format!(
                "port {} has no segmentation id",
                request.port_id
            ))
        })?;
        // LAG members beyond the first are not programmed.
        let ifindex = request
            .switch_bindings
            .first()
            .and_then(|b| b.ifindex)
            .ok_or_else(|| {
                ProvisionError::invalid_request(format!(
                    "port {} has no switch port ifindex",
                    request.port_id
                ))
            })?;

        if ifindex == 0 || ifindex > MAX_PORT_LIST_IFINDEX {
            return Err(ProvisionError::invalid_request(format!(
                "port {} ifindex {} is outside 1-{}",
                request.port_id, ifindex, MAX_PORT_LIST_IFINDEX
            )));
        }

        Ok(IsolationTarget {
            credentials,
            vlan: vlan.as_u16(),
            ifindex,
        })
    }

    async fn client(&self, credentials: &SwitchCredentials) -> ProvisionResult<Arc<dyn SnmpClient>> {
        self.connector
            .connect(credentials)
            .await
            .map_err(|e| ProvisionError::snmp_failure("SET", e))
    }

    /// Reads the current egress port list for a VLAN.
    async fn egress_ports(client: &dyn SnmpClient, oid: &str) -> ProvisionResult<Vec<u8>> {
        let varbinds = client
            .get(oid)
            .await
            .map_err(|e| ProvisionError::snmp_failure("GET", e))?;

        Ok(varbinds
            .into_iter()
            .find_map(|(_, value)| match value {
                SnmpValue::OctetString(bytes) => Some(bytes),
                _ => None,
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl PortIsolationDriver for SnmpIsolationDriver {
    #[instrument(skip(self, request), fields(port = %request.port_id))]
    async fn set_isolation(&self, request: &PortProvisioningRequest) -> ProvisionResult<()> {
        let target = Self::target(request)?;
        let client = self.client(target.credentials).await?;
        let vlan_oid = format!("{}.{}", OID_VLAN_CREATE, target.vlan);
        let egress_oid = format!("{}.{}", OID_VLAN_EGRESS_PORT, target.vlan);

        // An unreadable row is treated as absent.
        let vlan_exists = match client.get(&vlan_oid).await {
            Ok(varbinds) => !varbinds.is_empty() && !varbinds.iter().any(|(_, v)| v.is_absent()),
            Err(e) => {
                warn!("Reading VLAN {} row failed: {}", target.vlan, e);
                false
            }
        };
        if !vlan_exists {
            info!("Creating VLAN {} on {}", target.vlan, target.credentials.ip_address);
            client
                .set(&vlan_oid, SnmpValue::Integer(ROW_STATUS_CREATE_AND_GO))
                .await
                .map_err(|e| ProvisionError::snmp_failure("SET", e))?;
        }

        let mut ports = Self::egress_ports(client.as_ref(), &egress_oid).await?;
        port_list_add(&mut ports, target.ifindex);
        client
            .set(&egress_oid, SnmpValue::OctetString(ports))
            .await
            .map_err(|e| ProvisionError::snmp_failure("SET", e))?;

        info!(
            "Added ifindex {} to VLAN {} on {}",
            target.ifindex, target.vlan, target.credentials.ip_address
        );
        Ok(())
    }

    #[instrument(skip(self, request), fields(port = %request.port_id))]
    async fn delete_isolation(
        &self,
        request: &PortProvisioningRequest,
        is_last_port_vlan: bool,
    ) -> ProvisionResult<()> {
        let target = Self::target(request)?;
        let client = self.client(target.credentials).await?;
        let vlan_oid = format!("{}.{}", OID_VLAN_CREATE, target.vlan);
        let egress_oid = format!("{}.{}", OID_VLAN_EGRESS_PORT, target.vlan);

        let mut ports = Self::egress_ports(client.as_ref(), &egress_oid).await?;
        port_list_remove(&mut ports, target.ifindex);
        client
            .set(&egress_oid, SnmpValue::OctetString(ports))
            .await
            .map_err(|e| ProvisionError::snmp_failure("SET", e))?;

        if is_last_port_vlan {
            info!("Destroying VLAN {} on {}", target.vlan, target.credentials.ip_address);
            client
                .set(&vlan_oid, SnmpValue::Integer(ROW_STATUS_DESTROY))
                .await
                .map_err(|e| ProvisionError::snmp_failure("SET", e))?;
        }

        info!(
            "Removed ifindex {} from VLAN {}",
            target.ifindex, target.vlan
        );
        Ok(())
    }

    async fn create_lag(&self, request: &PortProvisioningRequest) -> ProvisionResult<()> {
        debug!("create_lag is a no-op for port {}", request.port_id);
        Ok(())
    }

    async fn delete_lag(&self, request: &PortProvisioningRequest) -> ProvisionResult<()> {
        debug!("delete_lag is a no-op for port {}", request.port_id);
        Ok(())
    }
}

fn port_list_position(ifindex: u32) -> Option<(usize, u8)> {
    if ifindex > MAX_PORT_LIST_IFINDEX {
        return None;
    }
    let bit = ifindex.checked_sub(1)?;
    Some(((bit / 8) as usize, 0x80u8 >> (bit % 8)))
}

/// Sets the bit for `ifindex` in a Q-BRIDGE-MIB `PortList`, growing it if needed.
///
/// ifindex 0 has no bit and is ignored, as is anything above
/// [`MAX_PORT_LIST_IFINDEX`].
pub fn port_list_add(ports: &mut Vec<u8>, ifindex: u32) {
    if let Some((byte, mask)) = port_list_position(ifindex) {
        if ports.len() <= byte {
            ports.resize(byte + 1, 0);
        }
        ports[byte] |= mask;
    }
}

/// Clears the bit for `ifindex` in a `PortList`.
pub fn port_list_remove(ports: &mut [u8], ifindex: u32) {
    if let Some((byte, mask)) = port_list_position(ifindex) {
        if let Some(b) = ports.get_mut(byte) {
            *b &= !mask;
        }
    }
}
