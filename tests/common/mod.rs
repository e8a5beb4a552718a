#![allow(dead_code)]

use order_vault::error::{VaultError, VaultResult};
use order_vault::vault::records::{SatelliteKind, VaultRecord, VaultTable};
use order_vault::vault::store::{InsertOutcome, SledVaultStore, VaultStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

/// The single-product order used by the end-to-end checks
pub fn pizza_order() -> Value {
    json!({
        "id": 42,
        "date": "2023-01-01 10:00:00",
        "status": "closed",
        "cost": 500,
        "payment": 500,
        "user": {"id": 7, "name": "Ann", "login": "ann"},
        "restaurant": {"id": 3, "name": "Luigi"},
        "products": [{"id": 1, "name": "Pizza", "category": "Food"}]
    })
}

pub fn envelope(payload: Value) -> String {
    json!({
        "object_id": payload["id"].clone(),
        "object_type": "order",
        "sent_dttm": "2023-01-01 10:00:05",
        "payload": payload
    })
    .to_string()
}

pub fn row_counts(store: &impl VaultStore) -> Vec<(&'static str, usize)> {
    VaultTable::ALL
        .iter()
        .map(|table| (table.name(), store.row_count(*table).unwrap()))
        .collect()
}

/// Store wrapper that fails one insert with a chosen error until healed
pub struct FaultyStore {
    pub inner: SledVaultStore,
    fail_at: usize,
    transient: bool,
    attempts: AtomicUsize,
    healed: AtomicBool,
}

impl FaultyStore {
    /// Fails the `fail_at`-th insert attempt (zero based)
    pub fn new(fail_at: usize, transient: bool) -> Self {
        Self {
            inner: SledVaultStore::temporary(true).unwrap(),
            fail_at,
            transient,
            attempts: AtomicUsize::new(0),
            healed: AtomicBool::new(false),
        }
    }

    pub fn heal(&self) {
        self.healed.store(true, Ordering::SeqCst);
    }
}

impl VaultStore for FaultyStore {
    fn insert_if_absent(&self, record: &VaultRecord<'_>) -> VaultResult<InsertOutcome> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt == self.fail_at && !self.healed.load(Ordering::SeqCst) {
            return Err(if self.transient {
                VaultError::store_transient("connection reset")
            } else {
                VaultError::store_constraint("check constraint violated")
            });
        }
        self.inner.insert_if_absent(record)
    }

    fn contains(&self, table: VaultTable, key: &[u8]) -> VaultResult<bool> {
        self.inner.contains(table, key)
    }

    fn latest_hash_diff(&self, kind: SatelliteKind, owner: Uuid) -> VaultResult<Option<Uuid>> {
        self.inner.latest_hash_diff(kind, owner)
    }

    fn row_count(&self, table: VaultTable) -> VaultResult<usize> {
        self.inner.row_count(table)
    }

    fn flush(&self) -> VaultResult<()> {
        self.inner.flush()
    }
}
