mod common;

use chrono::{Duration, Utc};
use common::{pizza_order, row_counts};
use order_vault::config::SatelliteMode;
use order_vault::vault::records::{Hub, HubKind, SatelliteKind, VaultTable};
use order_vault::vault::store::{SledVaultStore, VaultStore};
use order_vault::{KeyDeriver, ReportProjector, VaultLoader, VaultRecordBuilder};
use serde_json::{json, Value};

fn dump(store: &SledVaultStore) -> Vec<Vec<Value>> {
    VaultTable::ALL
        .iter()
        .map(|table| store.rows::<Value>(*table).unwrap())
        .collect()
}

#[test]
fn test_end_to_end_report() {
    let builder = VaultRecordBuilder::default();
    let loader = VaultLoader::new(SledVaultStore::temporary(true).unwrap(), SatelliteMode::Idempotent);

    let set = builder.build(&pizza_order(), Utc::now()).unwrap();
    loader.load(&set).unwrap();
    let event = ReportProjector::new().project(&set, Utc::now()).unwrap();

    let deriver = KeyDeriver::default();
    assert_eq!(event.payload.id, deriver.derive_key(&42).to_string());
    assert_eq!(event.object_id, event.payload.id);
    assert_eq!(event.payload.restaurant.name, "Luigi");
    assert_eq!(event.payload.user.username, "Ann");
    assert_eq!(event.payload.status, "closed");
    assert_eq!(event.payload.order_dt, "2023-01-01 10:00:00");
    assert_eq!(event.payload.products.len(), 1);
    assert_eq!(event.payload.products[0].name, "Pizza");
    assert_eq!(event.payload.products[0].category.name, "Food");
}

#[test]
fn test_loaded_hub_rows_decode() {
    let store = SledVaultStore::temporary(true).unwrap();
    let loader = VaultLoader::new(store.clone(), SatelliteMode::Idempotent);
    let set = VaultRecordBuilder::default().build(&pizza_order(), Utc::now()).unwrap();
    loader.load(&set).unwrap();

    let order_pk = set.order_pk();
    let hub: Hub = store
        .get_row(VaultTable::Hub(HubKind::Order), order_pk.as_bytes())
        .unwrap()
        .unwrap();
    assert_eq!(hub.business_key.as_str(), "42");
    assert_eq!(hub.load_src, "OrderSource");
    assert!(hub.order_dt.is_some());
}

#[test]
fn test_loading_same_set_twice_keeps_state() {
    let store = SledVaultStore::temporary(true).unwrap();
    let loader = VaultLoader::new(store.clone(), SatelliteMode::Idempotent);
    let set = VaultRecordBuilder::default().build(&pizza_order(), Utc::now()).unwrap();

    let first = loader.load(&set).unwrap();
    assert_eq!(first.inserted(), 14);
    let after_first = dump(&store);

    let second = loader.load(&set).unwrap();
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.skipped(), 14);
    assert_eq!(dump(&store), after_first);
}

#[test]
fn test_redelivery_stores_once_and_reports_twice() {
    let store = SledVaultStore::temporary(true).unwrap();
    let loader = VaultLoader::new(store.clone(), SatelliteMode::Idempotent);
    let builder = VaultRecordBuilder::default();
    let projector = ReportProjector::new();

    let mut reports = Vec::new();
    for _ in 0..2 {
        let set = builder.build(&pizza_order(), Utc::now()).unwrap();
        loader.load(&set).unwrap();
        reports.push(projector.project(&set, Utc::now()).unwrap());
    }

    for (table, count) in row_counts(&store) {
        assert_eq!(count, 1, "table {} should hold exactly one row", table);
    }
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].payload, reports[1].payload);
}

#[test]
fn test_empty_products_order() {
    let mut raw = pizza_order();
    raw["products"] = json!([]);
    let store = SledVaultStore::temporary(true).unwrap();
    let loader = VaultLoader::new(store.clone(), SatelliteMode::Idempotent);
    let set = VaultRecordBuilder::default().build(&raw, Utc::now()).unwrap();

    let report = loader.load(&set).unwrap();
    assert_eq!(report.hubs.inserted, 3);
    assert_eq!(report.links.inserted, 1);
    assert_eq!(report.satellites.inserted, 4);

    for table in [
        VaultTable::Hub(HubKind::Product),
        VaultTable::Hub(HubKind::Category),
        VaultTable::Satellite(SatelliteKind::ProductNames),
    ] {
        assert_eq!(store.row_count(table).unwrap(), 0);
    }

    let event = ReportProjector::new().project(&set, Utc::now()).unwrap();
    assert!(event.payload.products.is_empty());
}

#[test]
fn test_status_change_adds_satellite_row() {
    let store = SledVaultStore::temporary(true).unwrap();
    let loader = VaultLoader::new(store.clone(), SatelliteMode::Idempotent);
    let builder = VaultRecordBuilder::default();

    let mut open = pizza_order();
    open["status"] = json!("open");
    loader
        .load(&builder.build(&open, Utc::now() - Duration::minutes(1)).unwrap())
        .unwrap();
    let set = builder.build(&pizza_order(), Utc::now()).unwrap();
    loader.load(&set).unwrap();

    let status_table = VaultTable::Satellite(SatelliteKind::OrderStatus);
    assert_eq!(store.row_count(status_table).unwrap(), 2);
    assert_eq!(store.row_count(VaultTable::Hub(HubKind::Order)).unwrap(), 1);

    let status_sat = &set.satellites.order_status;
    assert_eq!(
        store
            .latest_hash_diff(SatelliteKind::OrderStatus, status_sat.hub_pk)
            .unwrap(),
        Some(status_sat.hash_diff)
    );
}

#[test]
fn test_change_only_mode_skips_repeated_attributes() {
    let store = SledVaultStore::temporary(true).unwrap();
    let loader = VaultLoader::new(store.clone(), SatelliteMode::ChangeOnly);
    let builder = VaultRecordBuilder::default();

    loader
        .load(&builder.build(&pizza_order(), Utc::now()).unwrap())
        .unwrap();
    let mut renamed = pizza_order();
    renamed["restaurant"]["name"] = json!("Luigi's");
    let report = loader
        .load(&builder.build(&renamed, Utc::now()).unwrap())
        .unwrap();

    assert_eq!(report.satellites.inserted, 1);
    assert_eq!(report.satellites.unchanged, 4);
    let names = VaultTable::Satellite(SatelliteKind::RestaurantNames);
    assert_eq!(store.row_count(names).unwrap(), 2);
}

#[test]
fn test_dangling_link_is_rejected_when_enforced() {
    let store = SledVaultStore::temporary(true).unwrap();
    let set = VaultRecordBuilder::default().build(&pizza_order(), Utc::now()).unwrap();

    let link = &set.links.order_user;
    let err = store
        .insert_if_absent(&order_vault::vault::VaultRecord::Link(link))
        .unwrap_err();
    assert!(matches!(err, order_vault::VaultError::StoreConstraint(_)));

    let lenient = SledVaultStore::temporary(false).unwrap();
    assert!(lenient
        .insert_if_absent(&order_vault::vault::VaultRecord::Link(link))
        .is_ok());
}
