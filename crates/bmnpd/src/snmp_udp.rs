//! SNMP v2c transport over UDP.
//!
//! Wraps the blocking `snmp::SyncSession`; every request runs on the
//! blocking thread pool so callers stay async.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bmnp_types::{SnmpAccessProtocol, SwitchCredentials};
use snmp::{SyncSession, Value};
use tracing::debug;

use crate::config_file::SnmpConfig;
use crate::isolation::{SnmpClient, SnmpConnector, SnmpError, SnmpValue};

/// Opens community-based sessions to switch agents.
///
/// SNMPv3 (USM) is not supported and is refused at connect time.
#[derive(Debug, Clone)]
pub struct UdpSnmpConnector {
    port: u16,
    timeout: Duration,
}

impl UdpSnmpConnector {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    pub fn from_config(config: &SnmpConfig) -> Self {
        Self::new(config.port, config.timeout())
    }
}

#[async_trait]
impl SnmpConnector for UdpSnmpConnector {
    async fn connect(
        &self,
        credentials: &SwitchCredentials,
    ) -> Result<Arc<dyn SnmpClient>, SnmpError> {
        if credentials.access_protocol == SnmpAccessProtocol::SnmpV3 {
            return Err(SnmpError::new(format!(
                "{} is not supported for {}",
                credentials.access_protocol, credentials.ip_address
            )));
        }
        let community = credentials.write_community.clone().ok_or_else(|| {
            SnmpError::new(format!(
                "no write community for {}",
                credentials.ip_address
            ))
        })?;

        let destination = (credentials.ip_address.clone(), self.port);
        let timeout = self.timeout;
        let session = tokio::task::spawn_blocking(move || {
            SyncSession::new(destination, community.as_bytes(), Some(timeout), 0)
        })
        .await
        .map_err(|e| SnmpError::new(format!("SNMP task failed: {}", e)))?
        .map_err(|e| {
            SnmpError::new(format!(
                "cannot open session to {}:{}: {}",
                credentials.ip_address, self.port, e
            ))
        })?;

        debug!(
            "Opened SNMP session to {}:{}",
            credentials.ip_address, self.port
        );
        Ok(Arc::new(UdpSnmpClient {
            session: Arc::new(Mutex::new(session)),
        }))
    }
}

struct UdpSnmpClient {
    session: Arc<Mutex<SyncSession>>,
}

impl UdpSnmpClient {
    async fn with_session<T, F>(&self, f: F) -> Result<T, SnmpError>
    where
        F: FnOnce(&mut SyncSession) -> Result<T, SnmpError> + Send + 'static,
        T: Send + 'static,
    {
        let session = self.session.clone();
        tokio::task::spawn_blocking(move || {
            let mut session = session
                .lock()
                .map_err(|_| SnmpError::new("SNMP session lock poisoned"))?;
            f(&mut session)
        })
        .await
        .map_err(|e| SnmpError::new(format!("SNMP task failed: {}", e)))?
    }
}

#[async_trait]
impl SnmpClient for UdpSnmpClient {
    async fn get(&self, oid: &str) -> Result<Vec<(String, SnmpValue)>, SnmpError> {
        let name = parse_oid(oid)?;
        let oid = oid.to_string();

        self.with_session(move |session| {
            let pdu = session
                .get(&name)
                .map_err(|e| SnmpError::new(format!("GET {}: {:?}", oid, e)))?;
            if pdu.error_status != 0 {
                return Err(SnmpError::new(format!(
                    "GET {}: agent error status {}",
                    oid, pdu.error_status
                )));
            }
            Ok(pdu
                .varbinds
                .map(|(_, value)| (oid.clone(), snmp_value(&value)))
                .collect())
        })
        .await
    }

    async fn set(&self, oid: &str, value: SnmpValue) -> Result<(), SnmpError> {
        let name = parse_oid(oid)?;
        let oid = oid.to_string();

        self.with_session(move |session| {
            let wire = match &value {
                SnmpValue::Integer(i) => Value::Integer(*i),
                SnmpValue::OctetString(bytes) => Value::OctetString(bytes),
                other => {
                    return Err(SnmpError::new(format!("SET {}: cannot send {:?}", oid, other)))
                }
            };
            let pdu = session
                .set(&[(&name[..], wire)])
                .map_err(|e| SnmpError::new(format!("SET {}: {:?}", oid, e)))?;
            if pdu.error_status != 0 {
                return Err(SnmpError::new(format!(
                    "SET {}: agent error status {}",
                    oid, pdu.error_status
                )));
            }
            Ok(())
        })
        .await
    }
}

fn snmp_value(value: &Value<'_>) -> SnmpValue {
    match value {
        Value::Integer(i) => SnmpValue::Integer(*i),
        Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
        Value::NoSuchInstance => SnmpValue::NoSuchInstance,
        Value::NoSuchObject | Value::EndOfMibView => SnmpValue::NoSuchObject,
        _ => SnmpValue::Unsupported,
    }
}

/// Parses a dotted numeric OID.
pub fn parse_oid(oid: &str) -> Result<Vec<u32>, SnmpError> {
    let parts = oid
        .trim_start_matches('.')
        .split('.')
        .map(str::parse::<u32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| SnmpError::new(format!("invalid OID '{}'", oid)))?;
    if parts.len() < 2 {
        return Err(SnmpError::new(format!("invalid OID '{}'", oid)));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credentials(protocol: SnmpAccessProtocol, community: Option<&str>) -> SwitchCredentials {
        SwitchCredentials {
            ip_address: "127.0.0.1".to_string(),
            access_protocol: protocol,
            write_community: community.map(str::to_string),
            security_name: None,
            auth_protocol: None,
            auth_key: None,
            priv_protocol: None,
            priv_key: None,
        }
    }

    #[test]
    fn test_parse_oid() {
        assert_eq!(
            parse_oid("1.3.6.1.2.1.17.7.1.4.3.1.5.100").unwrap(),
            vec![1, 3, 6, 1, 2, 1, 17, 7, 1, 4, 3, 1, 5, 100]
        );
        assert_eq!(parse_oid(".1.3.6").unwrap(), vec![1, 3, 6]);
        assert!(parse_oid("1.3.x").is_err());
        assert!(parse_oid("").is_err());
        assert!(parse_oid("1").is_err());
    }

    #[test]
    fn test_wire_value_conversion() {
        assert_eq!(snmp_value(&Value::Integer(4)), SnmpValue::Integer(4));
        assert_eq!(
            snmp_value(&Value::OctetString(&[0x80, 0x01])),
            SnmpValue::OctetString(vec![0x80, 0x01])
        );
        assert_eq!(snmp_value(&Value::NoSuchInstance), SnmpValue::NoSuchInstance);
        assert_eq!(snmp_value(&Value::EndOfMibView), SnmpValue::NoSuchObject);
        assert_eq!(snmp_value(&Value::Null), SnmpValue::Unsupported);
    }

    #[tokio::test]
    async fn test_v3_refused() {
        let connector = UdpSnmpConnector::new(161, Duration::from_millis(200));
        let err = connector
            .connect(&credentials(SnmpAccessProtocol::SnmpV3, Some("private")))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("snmpv3"));
    }

    #[tokio::test]
    async fn test_missing_community_refused() {
        let connector = UdpSnmpConnector::new(161, Duration::from_millis(200));
        let err = connector
            .connect(&credentials(SnmpAccessProtocol::SnmpV2c, None))
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "no write community for 127.0.0.1");
    }

    #[tokio::test]
    async fn test_silent_agent_times_out() {
        // Bound but never answers
        let agent = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = agent.local_addr().unwrap().port();

        let connector = UdpSnmpConnector::new(port, Duration::from_millis(200));
        let client = connector
            .connect(&credentials(SnmpAccessProtocol::SnmpV2c, Some("private")))
            .await
            .unwrap();

        let err = client.get("1.3.6.1.2.1.17.7.1.4.3.1.5.100").await.unwrap_err();
        assert!(err.to_string().starts_with("GET 1.3.6.1.2.1.17.7.1.4.3.1.5.100"));
    }
}
