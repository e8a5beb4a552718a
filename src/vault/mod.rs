//! Data Vault layer: key derivation, record construction, persistence and
//! report projection for inbound order events.

pub mod builder;
pub mod key_deriver;
pub mod loader;
pub mod payload;
pub mod projector;
pub mod records;
pub mod store;

pub use builder::VaultRecordBuilder;
pub use key_deriver::{KeyDeriver, COMPONENT_SEPARATOR, DEFAULT_NAMESPACE_NAME};
pub use loader::{FamilyCounts, LoadReport, VaultLoader};
pub use payload::{BusinessKey, OrderPayload, ORDER_DATE_FORMAT};
pub use projector::{OrderReport, OrderReportEvent, ReportProjector, ORDER_REPORT_OBJECT_TYPE};
pub use records::{
    Hub, HubKind, Link, LinkKind, Satellite, SatelliteAttributes, SatelliteKind, VaultRecord,
    VaultRecordSet, VaultTable,
};
pub use store::{InsertOutcome, SledVaultStore, VaultStore};
