//! # Order Vault
//!
//! Loads order events from an inbound stream into a Data Vault and emits a
//! denormalized report event for every order loaded.
//!
//! ## Core Components
//!
//! * `vault` - Key derivation, hub/link/satellite construction, the sled-backed
//!   store, the idempotent loader and the report projector
//! * `processor` - Batch orchestration over an event source and a report sink
//! * `config` - Processor configuration loaded from TOML and the environment
//! * `error` - Error types and retry classification
//! * `logging` - Logger initialization and per-feature log targets
//!
//! ## Architecture
//!
//! Each inbound event is turned into a complete in-memory record set, written
//! hubs first, then links, then satellites, and only then projected into the
//! report. Every write is insert-if-absent, so redelivering an event after a
//! partial failure converges on the same stored state.

pub mod config;
pub mod error;
pub mod logging;
pub mod processor;
pub mod vault;

pub use config::{SatelliteMode, VaultConfig};
pub use error::{VaultError, VaultResult};
pub use processor::{BatchSummary, OrderVaultProcessor};
pub use vault::{
    KeyDeriver, LoadReport, OrderReportEvent, ReportProjector, SledVaultStore, VaultLoader,
    VaultRecordBuilder, VaultRecordSet, VaultStore,
};
