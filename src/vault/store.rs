//! Store abstraction and the sled-backed vault store.
//!
//! The only write the core needs is an idempotent insert: a row whose primary
//! key already exists is left untouched and reported as `AlreadyPresent`.

use crate::error::{VaultError, VaultResult};
use crate::log_store_debug;
use crate::vault::records::{Satellite, SatelliteKind, VaultRecord, VaultTable};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Result of an idempotent insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyPresent,
}

/// Backing store for vault records.
pub trait VaultStore: Send + Sync {
    /// Insert `record` unless a row with the same primary key exists.
    ///
    /// A duplicate key is a successful no-op, never an error.
    fn insert_if_absent(&self, record: &VaultRecord<'_>) -> VaultResult<InsertOutcome>;

    fn contains(&self, table: VaultTable, key: &[u8]) -> VaultResult<bool>;

    /// Hash-diff of the most recently loaded satellite row for `owner`
    fn latest_hash_diff(&self, kind: SatelliteKind, owner: Uuid) -> VaultResult<Option<Uuid>>;

    fn row_count(&self, table: VaultTable) -> VaultResult<usize>;

    /// Make every completed insert durable
    fn flush(&self) -> VaultResult<()>;
}

impl<T: VaultStore + ?Sized> VaultStore for Arc<T> {
    fn insert_if_absent(&self, record: &VaultRecord<'_>) -> VaultResult<InsertOutcome> {
        (**self).insert_if_absent(record)
    }

    fn contains(&self, table: VaultTable, key: &[u8]) -> VaultResult<bool> {
        (**self).contains(table, key)
    }

    fn latest_hash_diff(&self, kind: SatelliteKind, owner: Uuid) -> VaultResult<Option<Uuid>> {
        (**self).latest_hash_diff(kind, owner)
    }

    fn row_count(&self, table: VaultTable) -> VaultResult<usize> {
        (**self).row_count(table)
    }

    fn flush(&self) -> VaultResult<()> {
        (**self).flush()
    }
}

/// Vault store with one sled tree per table.
///
/// Each satellite table has a companion `<table>__latest` tree mapping an
/// owning hub key to the load time and hash-diff of its newest row.
#[derive(Clone)]
pub struct SledVaultStore {
    db: sled::Db,
    tables: HashMap<VaultTable, sled::Tree>,
    latest: HashMap<SatelliteKind, sled::Tree>,
    enforce_references: bool,
}

impl SledVaultStore {
    /// Opens every table tree in `db`
    pub fn new(db: sled::Db, enforce_references: bool) -> VaultResult<Self> {
        let mut tables = HashMap::new();
        let mut latest = HashMap::new();
        for table in VaultTable::ALL {
            tables.insert(table, db.open_tree(table.name())?);
            if let VaultTable::Satellite(kind) = table {
                latest.insert(kind, db.open_tree(format!("{}__latest", table.name()))?);
            }
        }

        Ok(Self {
            db,
            tables,
            latest,
            enforce_references,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P, enforce_references: bool) -> VaultResult<Self> {
        let db = sled::open(path)?;
        Self::new(db, enforce_references)
    }

    /// In-memory store removed on drop
    pub fn temporary(enforce_references: bool) -> VaultResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::new(db, enforce_references)
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn tree(&self, table: VaultTable) -> VaultResult<&sled::Tree> {
        self.tables
            .get(&table)
            .ok_or_else(|| VaultError::store_constraint(format!("unknown table {}", table.name())))
    }

    /// Retrieve and decode one stored row
    pub fn get_row<T: DeserializeOwned>(
        &self,
        table: VaultTable,
        key: &[u8],
    ) -> VaultResult<Option<T>> {
        match self.tree(table)?.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Decode every row of a table in key order
    pub fn rows<T: DeserializeOwned>(&self, table: VaultTable) -> VaultResult<Vec<T>> {
        let mut rows = Vec::new();
        for result in self.tree(table)?.iter() {
            let (_, value) = result?;
            rows.push(serde_json::from_slice(&value)?);
        }
        Ok(rows)
    }

    fn check_references(&self, record: &VaultRecord<'_>) -> VaultResult<()> {
        for (table, pk) in record.references() {
            if !self.tree(table)?.contains_key(pk.as_bytes())? {
                return Err(VaultError::store_constraint(format!(
                    "{} row references missing {} row {}",
                    record.table().name(),
                    table.name(),
                    pk
                )));
            }
        }
        Ok(())
    }

    /// Move the owner's latest pointer forward unless a newer load is recorded.
    fn advance_latest(&self, sat: &Satellite) -> VaultResult<()> {
        let tree = self.latest.get(&sat.kind()).ok_or_else(|| {
            VaultError::store_constraint(format!("no latest index for {:?}", sat.kind()))
        })?;
        let millis = sat.load_dt.timestamp_millis();
        let mut pointer = Vec::with_capacity(24);
        pointer.extend_from_slice(&millis.to_be_bytes());
        pointer.extend_from_slice(sat.hash_diff.as_bytes());

        tree.fetch_and_update(sat.hub_pk.as_bytes(), |current| match current {
            Some(existing) if decode_pointer_millis(existing) > millis => Some(existing.to_vec()),
            _ => Some(pointer.clone()),
        })?;
        Ok(())
    }
}

fn decode_pointer_millis(pointer: &[u8]) -> i64 {
    let mut millis = [0u8; 8];
    if pointer.len() >= 8 {
        millis.copy_from_slice(&pointer[..8]);
    }
    i64::from_be_bytes(millis)
}

impl VaultStore for SledVaultStore {
    fn insert_if_absent(&self, record: &VaultRecord<'_>) -> VaultResult<InsertOutcome> {
        let table = record.table();
        let tree = self.tree(table)?;
        if self.enforce_references {
            self.check_references(record)?;
        }

        let key = record.primary_key();
        let value = record.encode()?;
        match tree.compare_and_swap(&key, None::<&[u8]>, Some(value))? {
            Ok(()) => {
                if let VaultRecord::Satellite(sat) = record {
                    self.advance_latest(sat)?;
                }
                log_store_debug!("Inserted row into {}", table.name());
                Ok(InsertOutcome::Inserted)
            }
            Err(_) => {
                // A reappearing state is still the owner's current one.
                if let VaultRecord::Satellite(sat) = record {
                    self.advance_latest(sat)?;
                }
                log_store_debug!("Row already present in {}", table.name());
                Ok(InsertOutcome::AlreadyPresent)
            }
        }
    }

    fn contains(&self, table: VaultTable, key: &[u8]) -> VaultResult<bool> {
        Ok(self.tree(table)?.contains_key(key)?)
    }

    fn latest_hash_diff(&self, kind: SatelliteKind, owner: Uuid) -> VaultResult<Option<Uuid>> {
        let Some(tree) = self.latest.get(&kind) else {
            return Ok(None);
        };
        match tree.get(owner.as_bytes())? {
            Some(pointer) if pointer.len() == 24 => {
                let hash_diff = Uuid::from_slice(&pointer[8..]).map_err(|e| {
                    VaultError::store_constraint(format!("corrupt latest pointer: {}", e))
                })?;
                Ok(Some(hash_diff))
            }
            Some(_) => Err(VaultError::store_constraint(format!(
                "corrupt latest pointer for {}",
                owner
            ))),
            None => Ok(None),
        }
    }

    fn row_count(&self, table: VaultTable) -> VaultResult<usize> {
        Ok(self.tree(table)?.len())
    }

    fn flush(&self) -> VaultResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
