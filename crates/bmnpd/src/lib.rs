//! Bare-metal network provisioning driver.
//!
//! This crate provisions bare-metal host ports on a switch fabric by
//! calling an SDN controller's REST API, and records the resulting
//! switch-port mapping in a [`PortMappingStore`].
//!
//! # Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Request Dispatcher | [`dispatcher`] | One HTTP request per operation, no retry |
//! | Outcome Classifier | [`classifier`] | Status code / transport failure to outcome |
//! | Lifecycle Coordinator | [`coordinator`] | create, bind, update, delete |
//! | SNMP isolation facet | [`isolation`], [`snmp_udp`] | Direct VLAN egress programming over SNMP |
//!
//! The store is only written after the controller confirms an operation,
//! so the mapping never reflects state the controller has not accepted.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bmnpd::{PortLifecycleCoordinator, ProvisioningConfig, BIND_SUCCESS};
//! use bmnp_db::MemoryStore;
//!
//! let config = ProvisioningConfig::load()?;
//! let coordinator =
//!     PortLifecycleCoordinator::from_config(&config.controller, Arc::new(MemoryStore::new()))?;
//!
//! coordinator.create_port(&request).await?;
//! if coordinator.bind_port_to_segment(&request).await? == BIND_SUCCESS {
//!     // port is live on the segment
//! }
//! ```
//!
//! [`PortMappingStore`]: bmnp_db::PortMappingStore

pub mod classifier;
pub mod config_file;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod isolation;
pub mod response;
pub mod snmp_udp;

pub use classifier::{classify, classify_response, ProvisioningOutcome};
pub use config_file::{
    ControllerConfig, DatabaseConfig, ProvisioningConfig, SnmpConfig, StoreBackend,
};
pub use coordinator::{BindStatus, PortLifecycleCoordinator, BIND_FAILURE, BIND_SUCCESS};
pub use dispatcher::{Dispatcher, HttpDispatcher, PortOperation};
pub use error::{ProvisionError, ProvisionResult};
pub use isolation::{PortIsolationDriver, SnmpClient, SnmpConnector, SnmpIsolationDriver};
pub use response::{ResponseDescriptor, TransportError};
pub use snmp_udp::UdpSnmpConnector;
