use chrono::{Duration, TimeZone, Utc};
use order_vault::vault::records::HubKind;
use order_vault::{KeyDeriver, VaultRecordBuilder};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use uuid::Uuid;

fn product() -> impl Strategy<Value = Value> {
    (1u32..50, "[A-Za-z]{1,10}", "[A-Za-z]{1,6}")
        .prop_map(|(id, name, category)| json!({"id": id, "name": name, "category": category}))
}

fn order() -> impl Strategy<Value = Value> {
    (
        any::<u32>(),
        1u32..1000,
        1u32..1000,
        "[a-z]{1,8}",
        0u32..100_000,
        prop::collection::vec(product(), 0..6),
    )
        .prop_map(|(id, user, restaurant, status, cost, products)| {
            json!({
                "id": id,
                "date": "2023-01-01 10:00:00",
                "status": status,
                "cost": cost,
                "payment": cost,
                "user": {"id": user, "name": "Ann", "login": "ann"},
                "restaurant": {"id": restaurant, "name": "Luigi"},
                "products": products
            })
        })
}

proptest! {
    #[test]
    fn prop_hub_keys_are_deterministic(raw in order(), offset in 0i64..10_000) {
        let builder = VaultRecordBuilder::default();
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let first = builder.build(&raw, base).unwrap();
        let second = builder.build(&raw, base + Duration::seconds(offset)).unwrap();

        let keys = |set: &order_vault::VaultRecordSet| -> Vec<(HubKind, Uuid)> {
            set.hubs.iter().map(|h| (h.kind, h.hub_pk)).collect()
        };
        prop_assert_eq!(keys(&first), keys(&second));
        prop_assert_eq!(
            first.satellites.iter().map(|s| s.hash_diff).collect::<Vec<_>>(),
            second.satellites.iter().map(|s| s.hash_diff).collect::<Vec<_>>()
        );
    }

    #[test]
    fn prop_links_reference_hubs_of_same_build(raw in order()) {
        let set = VaultRecordBuilder::default().build(&raw, Utc::now()).unwrap();
        let hubs: HashSet<(HubKind, Uuid)> = set.hubs.iter().map(|h| (h.kind, h.hub_pk)).collect();

        for link in set.links.iter() {
            for (kind, pk) in link.kind.hub_kinds().into_iter().zip(link.hub_pks) {
                prop_assert!(hubs.contains(&(kind, pk)));
            }
        }
        let owners: HashSet<Uuid> = hubs.iter().map(|(_, pk)| *pk).collect();
        for sat in set.satellites.iter() {
            prop_assert!(owners.contains(&sat.hub_pk));
        }
    }

    #[test]
    fn prop_link_key_depends_on_order(a in any::<u128>(), b in any::<u128>()) {
        prop_assume!(a != b);
        let deriver = KeyDeriver::default();
        let (a, b) = (Uuid::from_u128(a), Uuid::from_u128(b));

        let forward = deriver.derive_link_key(&[a, b]);
        prop_assert_eq!(forward, deriver.derive_link_key(&[a, b]));
        prop_assert_ne!(forward, deriver.derive_link_key(&[b, a]));
    }

    #[test]
    fn prop_string_and_integer_ids_agree(id in any::<u64>()) {
        let deriver = KeyDeriver::default();
        prop_assert_eq!(deriver.derive_key(&id), deriver.derive_key(id.to_string().as_str()));
    }
}
