//! Vault Loader
//!
//! Writes a built record set through the store's idempotent insert, hubs first,
//! then links, then satellites. The first failing insert aborts the load; rows
//! already written stay in place and collapse to no-ops on redelivery.

use crate::config::SatelliteMode;
use crate::error::VaultResult;
use crate::{log_loader_debug, log_loader_info};
use crate::vault::records::{VaultRecord, VaultRecordSet};
use crate::vault::store::{InsertOutcome, VaultStore};

/// Per-family insert counts for one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FamilyCounts {
    pub inserted: usize,
    pub already_present: usize,
    /// Satellites skipped because the owner's latest hash-diff is unchanged
    pub unchanged: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub hubs: FamilyCounts,
    pub links: FamilyCounts,
    pub satellites: FamilyCounts,
}

impl LoadReport {
    pub fn inserted(&self) -> usize {
        self.hubs.inserted + self.links.inserted + self.satellites.inserted
    }

    pub fn skipped(&self) -> usize {
        self.hubs.already_present
            + self.links.already_present
            + self.satellites.already_present
            + self.satellites.unchanged
    }
}

pub struct VaultLoader<S: VaultStore> {
    store: S,
    satellite_mode: SatelliteMode,
}

impl<S: VaultStore> VaultLoader<S> {
    pub fn new(store: S, satellite_mode: SatelliteMode) -> Self {
        Self {
            store,
            satellite_mode,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn satellite_mode(&self) -> SatelliteMode {
        self.satellite_mode
    }

    /// Persist every record of `set` in dependency order.
    pub fn load(&self, set: &VaultRecordSet) -> VaultResult<LoadReport> {
        let mut report = LoadReport::default();

        for hub in set.hubs.iter() {
            let outcome = self.store.insert_if_absent(&VaultRecord::Hub(hub))?;
            count(&mut report.hubs, outcome);
        }
        // Hubs must be durable before anything referencing them is attempted.
        self.store.flush()?;

        for link in set.links.iter() {
            let outcome = self.store.insert_if_absent(&VaultRecord::Link(link))?;
            count(&mut report.links, outcome);
        }

        for sat in set.satellites.iter() {
            if self.satellite_mode == SatelliteMode::ChangeOnly
                && self.store.latest_hash_diff(sat.kind(), sat.hub_pk)? == Some(sat.hash_diff)
            {
                log_loader_debug!("{:?} unchanged for {}", sat.kind(), sat.hub_pk);
                report.satellites.unchanged += 1;
                continue;
            }
            let outcome = self.store.insert_if_absent(&VaultRecord::Satellite(sat))?;
            count(&mut report.satellites, outcome);
        }
        self.store.flush()?;

        log_loader_info!(
            "Loaded order {}: inserted/present hubs {}/{} links {}/{} satellites {}/{}, {} unchanged",
            set.order_pk(),
            report.hubs.inserted,
            report.hubs.already_present,
            report.links.inserted,
            report.links.already_present,
            report.satellites.inserted,
            report.satellites.already_present,
            report.satellites.unchanged
        );
        Ok(report)
    }
}

fn count(counts: &mut FamilyCounts, outcome: InsertOutcome) {
    match outcome {
        InsertOutcome::Inserted => counts.inserted += 1,
        InsertOutcome::AlreadyPresent => counts.already_present += 1,
    }
}
