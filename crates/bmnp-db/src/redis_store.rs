//! Redis-backed mapping store.
//!
//! Records are Redis hashes under `TABLE|key`, the same layout the
//! switch databases use. Multi-field writes go through a MULTI/EXEC
//! pipeline so a record is never half written. Field updates on an
//! existing mapping run as one Lua script so a concurrent delete cannot
//! leave a partial hash behind.

use std::collections::HashMap;

use async_trait::async_trait;
use bmnp_types::{AccessType, IronicSwitchPortMapping, SegmentationId, SwitchPortRecord};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::tables::{
    self, fields, IRONIC_SWITCH_PORT_MAPPING_TABLE, LIST_SEPARATOR, SWITCH_PORT_TABLE,
};
use crate::{PortMappingStore, StoreError, StoreResult};

/// Sets one field of an existing hash. Returns 0 when the key is absent.
const UPDATE_EXISTING_FIELD: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
    return 1
end
return 0
"#;

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisStoreConfig {
    pub host: String,
    pub port: u16,
    /// Redis logical database number.
    pub db: u32,
}

impl RedisStoreConfig {
    pub fn new(host: impl Into<String>, port: u16, db: u32) -> Self {
        Self {
            host: host.into(),
            port,
            db,
        }
    }

    /// Returns the Redis connection URI.
    pub fn uri(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Mapping store persisted in Redis.
#[derive(Clone)]
pub struct RedisStore {
    config: RedisStoreConfig,
    connection: ConnectionManager,
    update_field: redis::Script,
}

impl RedisStore {
    /// Connects to Redis.
    pub async fn connect(config: RedisStoreConfig) -> StoreResult<Self> {
        let uri = config.uri();

        let client = redis::Client::open(uri.clone())
            .map_err(|e| StoreError::Connection(format!("{}: {}", uri, e)))?;

        let connection = client.get_connection_manager().await.map_err(|e| {
            StoreError::Connection(format!("Failed to create connection manager: {}", e))
        })?;

        info!("Connected to mapping store at {}:{} (db={})", config.host, config.port, config.db);

        Ok(Self {
            config,
            connection,
            update_field: redis::Script::new(UPDATE_EXISTING_FIELD),
        })
    }

    pub fn config(&self) -> &RedisStoreConfig {
        &self.config
    }

    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.connection.clone();
        conn.hgetall(key)
            .await
            .map_err(|e| StoreError::command("HGETALL", e))
    }

    async fn write_hash(&self, key: &str, fvs: &[(&str, String)]) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        // Replace, not merge: optional fields must not survive from an older record.
        let _: () = redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .hset_multiple(key, fvs)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::command("MULTI HSET", e))?;
        Ok(())
    }

    async fn set_mapping_field(&self, port_id: &str, field: &str, value: String) -> StoreResult<()> {
        let key = tables::table_key(IRONIC_SWITCH_PORT_MAPPING_TABLE, port_id);
        let mut conn = self.connection.clone();

        let updated: i64 = self
            .update_field
            .key(&key)
            .arg(field)
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::command("EVALSHA", e))?;
        field_update_result(updated, port_id)?;

        debug!("Updated {} {} on {}", IRONIC_SWITCH_PORT_MAPPING_TABLE, field, port_id);
        Ok(())
    }

    async fn delete_key(&self, key: String) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| StoreError::command("DEL", e))?;
        Ok(())
    }
}

#[async_trait]
impl PortMappingStore for RedisStore {
    async fn add_switch_port(&self, record: SwitchPortRecord) -> StoreResult<()> {
        let key = tables::table_key(SWITCH_PORT_TABLE, &record.id);
        self.write_hash(&key, &switch_port_to_fields(&record)).await
    }

    async fn add_ironic_switch_port_mapping(
        &self,
        mapping: IronicSwitchPortMapping,
    ) -> StoreResult<()> {
        let key = tables::table_key(IRONIC_SWITCH_PORT_MAPPING_TABLE, &mapping.port_id);
        self.write_hash(&key, &mapping_to_fields(&mapping)).await
    }

    async fn update_swport_map_with_segment_id(
        &self,
        port_id: &str,
        segmentation_id: SegmentationId,
    ) -> StoreResult<()> {
        self.set_mapping_field(port_id, fields::SEGMENTATION_ID, segmentation_id.to_string())
            .await
    }

    async fn update_swport_map_with_bind_request(
        &self,
        port_id: &str,
        bind_requested: bool,
    ) -> StoreResult<()> {
        self.set_mapping_field(port_id, fields::BIND_REQUESTED, bind_requested.to_string())
            .await
    }

    async fn get_ironic_swport_map_by_id(
        &self,
        port_id: &str,
    ) -> StoreResult<Option<IronicSwitchPortMapping>> {
        let key = tables::table_key(IRONIC_SWITCH_PORT_MAPPING_TABLE, port_id);
        let fvs = self.hgetall(&key).await?;
        if fvs.is_empty() {
            return Ok(None);
        }
        mapping_from_fields(&key, port_id, &fvs).map(Some)
    }

    async fn get_switch_port_by_id(
        &self,
        switch_port_id: &str,
    ) -> StoreResult<Option<SwitchPortRecord>> {
        let key = tables::table_key(SWITCH_PORT_TABLE, switch_port_id);
        let fvs = self.hgetall(&key).await?;
        if fvs.is_empty() {
            return Ok(None);
        }
        switch_port_from_fields(&key, switch_port_id, &fvs).map(Some)
    }

    async fn delete_switch_port(&self, switch_port_id: &str) -> StoreResult<()> {
        self.delete_key(tables::table_key(SWITCH_PORT_TABLE, switch_port_id))
            .await
    }

    async fn delete_ironic_swport_map(&self, port_id: &str) -> StoreResult<()> {
        self.delete_key(tables::table_key(IRONIC_SWITCH_PORT_MAPPING_TABLE, port_id))
            .await
    }
}

fn field_update_result(updated: i64, port_id: &str) -> StoreResult<()> {
    if updated == 0 {
        return Err(StoreError::not_found(IRONIC_SWITCH_PORT_MAPPING_TABLE, port_id));
    }
    Ok(())
}

fn switch_port_to_fields(record: &SwitchPortRecord) -> Vec<(&'static str, String)> {
    let mut fvs = vec![
        (fields::SWITCH_ID, record.switch_id.to_string()),
        (fields::PORT_NAME, record.port_name.clone()),
    ];
    if let Some(lag_id) = &record.lag_id {
        fvs.push((fields::LAG_ID, lag_id.clone()));
    }
    fvs
}

fn switch_port_from_fields(
    key: &str,
    id: &str,
    fvs: &HashMap<String, String>,
) -> StoreResult<SwitchPortRecord> {
    let switch_id = required(key, fvs, fields::SWITCH_ID)?
        .parse()
        .map_err(|e| StoreError::invalid_data(key, format!("{}", e)))?;

    Ok(SwitchPortRecord {
        id: id.to_string(),
        switch_id,
        port_name: required(key, fvs, fields::PORT_NAME)?.to_string(),
        lag_id: fvs.get(fields::LAG_ID).cloned(),
    })
}

fn mapping_to_fields(mapping: &IronicSwitchPortMapping) -> Vec<(&'static str, String)> {
    let mut fvs = vec![
        (
            fields::SWITCH_PORT_IDS,
            mapping.switch_port_ids.join(LIST_SEPARATOR),
        ),
        (fields::BIND_REQUESTED, mapping.bind_requested.to_string()),
        (fields::ACCESS_TYPE, mapping.access_type.to_string()),
    ];
    if let Some(seg) = mapping.segmentation_id {
        fvs.push((fields::SEGMENTATION_ID, seg.to_string()));
    }
    fvs
}

fn mapping_from_fields(
    key: &str,
    port_id: &str,
    fvs: &HashMap<String, String>,
) -> StoreResult<IronicSwitchPortMapping> {
    let invalid = |message: String| StoreError::invalid_data(key, message);

    let switch_port_ids = fvs
        .get(fields::SWITCH_PORT_IDS)
        .map(|s| {
            s.split(LIST_SEPARATOR)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let bind_requested = match fvs.get(fields::BIND_REQUESTED) {
        Some(v) => v.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
        None => false,
    };

    let access_type = match fvs.get(fields::ACCESS_TYPE) {
        Some(v) => v.parse::<AccessType>().map_err(|e| invalid(e.to_string()))?,
        None => AccessType::default(),
    };

    let segmentation_id = fvs
        .get(fields::SEGMENTATION_ID)
        .map(|v| v.parse::<SegmentationId>())
        .transpose()
        .map_err(|e| invalid(e.to_string()))?;

    Ok(IronicSwitchPortMapping {
        port_id: port_id.to_string(),
        switch_port_ids,
        segmentation_id,
        bind_requested,
        access_type,
    })
}

fn required<'a>(key: &str, fvs: &'a HashMap<String, String>, field: &str) -> StoreResult<&'a str> {
    fvs.get(field)
        .map(String::as_str)
        .ok_or_else(|| StoreError::invalid_data(key, format!("missing field '{}'", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn to_map(fvs: Vec<(&'static str, String)>) -> HashMap<String, String> {
        fvs.into_iter().map(|(f, v)| (f.to_string(), v)).collect()
    }

    #[test]
    fn test_redis_config_uri() {
        let config = RedisStoreConfig::new("127.0.0.1", 6379, 7);
        assert_eq!(config.uri(), "redis://127.0.0.1:6379/7");
    }

    #[test]
    fn test_field_update_on_missing_mapping() {
        let err = field_update_result(0, "p-404").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(err.to_string().contains("p-404"));

        assert!(field_update_result(1, "p-1").is_ok());
    }

    #[test]
    fn test_update_script_checks_key_before_write() {
        let exists = UPDATE_EXISTING_FIELD.find("EXISTS").unwrap();
        let hset = UPDATE_EXISTING_FIELD.find("HSET").unwrap();
        assert!(exists < hset);
        assert!(UPDATE_EXISTING_FIELD.contains("return 0"));
    }

    #[test]
    fn test_switch_port_fields() {
        let record = SwitchPortRecord {
            id: "sp-1".to_string(),
            switch_id: "44:31:92:61:89:d2".parse().unwrap(),
            port_name: "Ten-GigabitEthernet1/0/35".to_string(),
            lag_id: Some("lag-7".to_string()),
        };

        let fvs = to_map(switch_port_to_fields(&record));
        assert_eq!(fvs.get("switch_id").map(String::as_str), Some("44:31:92:61:89:d2"));
        assert_eq!(fvs.get("lag_id").map(String::as_str), Some("lag-7"));

        let decoded = switch_port_from_fields("SWITCH_PORT|sp-1", "sp-1", &fvs).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_switch_port_missing_field() {
        let fvs = to_map(vec![("switch_id", "44:31:92:61:89:d2".to_string())]);
        let err = switch_port_from_fields("SWITCH_PORT|sp-1", "sp-1", &fvs).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid stored data for SWITCH_PORT|sp-1: missing field 'port_name'"
        );
    }

    #[test]
    fn test_mapping_fields_unbound() {
        let mapping = IronicSwitchPortMapping::new("p1", vec!["sp-1".into(), "sp-2".into()]);
        let fvs = to_map(mapping_to_fields(&mapping));

        assert_eq!(fvs.get("switch_port_ids").map(String::as_str), Some("sp-1,sp-2"));
        assert!(!fvs.contains_key("segmentation_id"));

        let decoded = mapping_from_fields("k", "p1", &fvs).unwrap();
        assert_eq!(decoded, mapping);
    }

    #[test]
    fn test_mapping_fields_bound() {
        let mut mapping = IronicSwitchPortMapping::new("p1", vec!["sp-1".into()]);
        mapping.segmentation_id = Some(SegmentationId::new(1001).unwrap());
        mapping.bind_requested = true;
        mapping.access_type = AccessType::Trunk;

        let fvs = to_map(mapping_to_fields(&mapping));
        assert_eq!(fvs.get("segmentation_id").map(String::as_str), Some("1001"));

        let decoded = mapping_from_fields("k", "p1", &fvs).unwrap();
        assert_eq!(decoded, mapping);
    }

    #[test]
    fn test_mapping_bad_segmentation_id() {
        let fvs = to_map(vec![("segmentation_id", "9999".to_string())]);
        assert!(mapping_from_fields("k", "p1", &fvs).is_err());
    }

    #[test]
    fn test_mapping_empty_switch_port_list() {
        let fvs = to_map(vec![("switch_port_ids", String::new())]);
        let decoded = mapping_from_fields("k", "p1", &fvs).unwrap();
        assert!(decoded.switch_port_ids.is_empty());
    }
}
