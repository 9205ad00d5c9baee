//! Table and field names used by the mapping store.

/// Port-to-switch-port mapping, keyed by cloud port id.
pub const IRONIC_SWITCH_PORT_MAPPING_TABLE: &str = "IRONIC_SWITCH_PORT_MAPPING";

/// Physical switch ports, keyed by store-assigned id.
pub const SWITCH_PORT_TABLE: &str = "SWITCH_PORT";

/// Separator between table name and key.
pub const KEY_SEPARATOR: char = '|';

/// Separator for list-valued fields.
pub const LIST_SEPARATOR: &str = ",";

/// Builds the backend key for a table entry.
pub fn table_key(table: &str, key: &str) -> String {
    format!("{}{}{}", table, KEY_SEPARATOR, key)
}

/// Field names in mapping and switch port hashes.
pub mod fields {
    pub const SWITCH_PORT_IDS: &str = "switch_port_ids";
    pub const SEGMENTATION_ID: &str = "segmentation_id";
    pub const BIND_REQUESTED: &str = "bind_requested";
    pub const ACCESS_TYPE: &str = "access_type";

    pub const SWITCH_ID: &str = "switch_id";
    pub const PORT_NAME: &str = "port_name";
    pub const LAG_ID: &str = "lag_id";
}
