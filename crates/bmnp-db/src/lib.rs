//! Switch-port mapping store for bare-metal network provisioning.
//!
//! The provisioning driver records which physical switch ports back each
//! bare-metal port, and which segment the port is bound into. This crate
//! defines that persistence collaborator:
//!
//! - [`PortMappingStore`]: the CRUD surface the driver calls after the
//!   controller confirms an operation
//! - [`MemoryStore`]: process-local backend for tests and dry runs
//! - [`RedisStore`]: Redis hash backend
//!
//! # Tables
//!
//! | Table | Key | Record |
//! |-------|-----|--------|
//! | IRONIC_SWITCH_PORT_MAPPING | port id | [`IronicSwitchPortMapping`] |
//! | SWITCH_PORT | switch port id | [`SwitchPortRecord`] |
//!
//! [`IronicSwitchPortMapping`]: bmnp_types::IronicSwitchPortMapping
//! [`SwitchPortRecord`]: bmnp_types::SwitchPortRecord

mod error;
mod memory;
mod redis_store;
mod store;
pub mod tables;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use redis_store::{RedisStore, RedisStoreConfig};
pub use store::PortMappingStore;

#[cfg(feature = "mock")]
pub use store::MockPortMappingStore;
