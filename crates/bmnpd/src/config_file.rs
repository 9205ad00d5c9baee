//! Configuration file support for bmnpd.
//!
//! Loads and validates the driver configuration from a TOML file.
//! Default location: /etc/bmnp/bmnpd.toml
//!
//! ```toml
//! [controller]
//! base_url = "https://sdn-controller:8443/sdn/v2.0"
//! timeout_secs = 30
//! connect_timeout_secs = 5
//!
//! [database]
//! backend = "redis"
//! redis_host = "127.0.0.1"
//! redis_port = 6379
//! db_number = 0
//!
//! [snmp]
//! port = 161
//! timeout_secs = 5
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use bmnp_db::RedisStoreConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ProvisionError, ProvisionResult};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/bmnp/bmnpd.toml";

/// SDN controller connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Base URL every port operation path is appended to
    #[serde(default)]
    pub base_url: String,

    /// Overall request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Where switch-port mappings are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process memory (dry runs, tests)
    #[default]
    Memory,
    /// Redis hashes
    Redis,
}

/// Mapping store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis host
    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    /// Redis port
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    /// Redis database number for mapping tables
    #[serde(default)]
    pub db_number: u32,
}

/// Direct switch access for port isolation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpConfig {
    /// Agent UDP port
    #[serde(default = "default_snmp_port")]
    pub port: u16,

    /// Per-request timeout in seconds
    #[serde(default = "default_snmp_timeout")]
    pub timeout_secs: u64,
}

/// Complete bmnpd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub snmp: SnmpConfig,
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_snmp_port() -> u16 {
    161
}

fn default_snmp_timeout() -> u64 {
    5
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            port: default_snmp_port(),
            timeout_secs: default_snmp_timeout(),
        }
    }
}

impl SnmpConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate SNMP settings
    pub fn validate(&self) -> ProvisionResult<()> {
        if self.port == 0 || self.timeout_secs == 0 {
            return Err(ProvisionError::Configuration(
                "snmp.port and snmp.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            db_number: 0,
        }
    }
}

impl ControllerConfig {
    /// Creates a controller config with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate controller settings
    pub fn validate(&self) -> ProvisionResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ProvisionError::Configuration(
                "controller.base_url must be set".to_string(),
            ));
        }

        let url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            ProvisionError::Configuration(format!(
                "controller.base_url '{}' is not a valid URL: {}",
                self.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProvisionError::Configuration(format!(
                "controller.base_url scheme must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ProvisionError::Configuration(
                "controller timeouts must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Fails unless mappings outlive the process.
    ///
    /// Operations on an existing port need the mapping a previous run
    /// recorded, which the memory backend never has.
    pub fn require_persistent(&self, operation: &str) -> ProvisionResult<()> {
        match self.backend {
            StoreBackend::Redis => Ok(()),
            StoreBackend::Memory => Err(ProvisionError::Configuration(format!(
                "{} needs mappings from earlier runs; set database.backend = \"redis\"",
                operation
            ))),
        }
    }

    /// Connection settings for the Redis backend
    pub fn redis_config(&self) -> RedisStoreConfig {
        RedisStoreConfig::new(self.redis_host.clone(), self.redis_port, self.db_number)
    }
}

impl ProvisioningConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> ProvisionResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config = toml::from_str(&content).map_err(|e| {
                    ProvisionError::Configuration(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(ProvisionError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> ProvisionResult<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> ProvisionResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ProvisionError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path.as_ref(), content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ProvisionResult<()> {
        self.controller.validate()?;
        self.snmp.validate()?;

        if self.database.backend == StoreBackend::Redis && self.database.redis_port == 0 {
            return Err(ProvisionError::Configuration(
                "database.redis_port must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_config() -> ProvisioningConfig {
        ProvisioningConfig {
            controller: ControllerConfig::new("https://sdn.example:8443/sdn/v2.0"),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = ProvisioningConfig::default();
        assert_eq!(config.controller.base_url, "");
        assert_eq!(config.controller.timeout_secs, 30);
        assert_eq!(config.controller.connect_timeout_secs, 5);
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.database.redis_host, "127.0.0.1");
        assert_eq!(config.database.redis_port, 6379);
    }

    #[test]
    fn test_default_requires_base_url() {
        let err = ProvisioningConfig::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: controller.base_url must be set"
        );
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_url() {
        let mut config = valid_config();
        config.controller.base_url = "fake_url".to_string();
        assert!(config.validate().is_err());

        config.controller.base_url = "ftp://sdn.example/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = valid_config();
        config.controller.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_redis_port() {
        let mut config = valid_config();
        config.database.redis_port = 0;
        // Only matters when Redis is the backend
        assert!(config.validate().is_ok());

        config.database.backend = StoreBackend::Redis;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_memory_backend_not_persistent() {
        let mut db = DatabaseConfig::default();
        let err = db.require_persistent("bind").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: bind needs mappings from earlier runs; set database.backend = \"redis\""
        );

        db.backend = StoreBackend::Redis;
        assert!(db.require_persistent("bind").is_ok());
    }

    #[test]
    fn test_snmp_defaults_and_validation() {
        let mut snmp = SnmpConfig::default();
        assert_eq!(snmp.port, 161);
        assert_eq!(snmp.timeout(), Duration::from_secs(5));
        assert!(snmp.validate().is_ok());

        snmp.timeout_secs = 0;
        assert!(snmp.validate().is_err());
    }

    #[test]
    fn test_durations() {
        let config = ControllerConfig::new("http://localhost");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_redis_config() {
        let mut db = DatabaseConfig::default();
        db.db_number = 3;
        assert_eq!(db.redis_config().uri(), "redis://127.0.0.1:6379/3");
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[controller]
base_url = "http://10.0.0.1:8080/api"
timeout_secs = 10

[database]
backend = "redis"
redis_port = 6380
"#;
        let config: ProvisioningConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.controller.base_url, "http://10.0.0.1:8080/api");
        assert_eq!(config.controller.timeout_secs, 10);
        assert_eq!(config.database.backend, StoreBackend::Redis);
        assert_eq!(config.database.redis_port, 6380);
        // Unspecified values should use defaults
        assert_eq!(config.controller.connect_timeout_secs, 5);
        assert_eq!(config.database.redis_host, "127.0.0.1");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bmnpd.toml");

        let config = valid_config();
        config.save(&path).unwrap();

        let loaded = ProvisioningConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let config = ProvisioningConfig::load_or_default("/nonexistent/bmnpd.toml").unwrap();
        assert_eq!(config, ProvisioningConfig::default());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bmnpd.toml");
        fs::write(&path, "[controller\nbase_url = 1").unwrap();

        let err = ProvisioningConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, ProvisionError::Configuration(_)));
    }
}
