//! Vault Record Builder
//!
//! Decomposes one order payload into hub, link and satellite records in a
//! single pass. Building is pure: the only inputs are the payload, the key
//! namespace, the load-source tag and the load timestamp supplied by the caller.

use crate::error::VaultResult;
use crate::logging::LogFeature;
use crate::vault::key_deriver::KeyDeriver;
use crate::vault::payload::{BusinessKey, OrderPayload};
use crate::vault::records::{
    Hub, HubKind, HubSet, Link, LinkKind, LinkSet, Satellite, SatelliteAttributes, SatelliteSet,
    VaultRecordSet,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct VaultRecordBuilder {
    deriver: KeyDeriver,
    load_src: String,
}

impl VaultRecordBuilder {
    pub fn new(deriver: KeyDeriver, load_src: impl Into<String>) -> Self {
        Self {
            deriver,
            load_src: load_src.into(),
        }
    }

    pub fn deriver(&self) -> &KeyDeriver {
        &self.deriver
    }

    pub fn load_src(&self) -> &str {
        &self.load_src
    }

    /// Decode `raw` and build its complete record set.
    ///
    /// Fails with `MalformedPayload` before any record is built.
    pub fn build(&self, raw: &Value, load_dt: DateTime<Utc>) -> VaultResult<VaultRecordSet> {
        let payload = OrderPayload::from_value(raw)?;
        Ok(self.build_from_payload(&payload, load_dt))
    }

    pub fn build_from_payload(
        &self,
        payload: &OrderPayload,
        load_dt: DateTime<Utc>,
    ) -> VaultRecordSet {
        let set = VaultRecordSet {
            hubs: self.build_hubs(payload, load_dt),
            links: self.build_links(payload, load_dt),
            satellites: self.build_satellites(payload, load_dt),
        };
        log::debug!(
            target: LogFeature::Builder.target(),
            "Built {} records for order '{}' ({} product lines)",
            set.record_count(),
            payload.id,
            payload.products.len()
        );
        set
    }

    /// Surrogate key of a hub with natural key `key`
    pub fn hub_key(&self, key: &BusinessKey) -> Uuid {
        self.deriver.derive_key(key.as_str())
    }

    pub fn build_hubs(&self, payload: &OrderPayload, load_dt: DateTime<Utc>) -> HubSet {
        let mut order = self.hub(HubKind::Order, &payload.id, load_dt);
        order.order_dt = Some(payload.date);

        HubSet {
            user: self.hub(HubKind::User, &payload.user.id, load_dt),
            restaurant: self.hub(HubKind::Restaurant, &payload.restaurant.id, load_dt),
            order,
            products: payload
                .products
                .iter()
                .map(|p| self.hub(HubKind::Product, &p.id, load_dt))
                .collect(),
            categories: payload
                .products
                .iter()
                .map(|p| self.hub(HubKind::Category, &p.category, load_dt))
                .collect(),
        }
    }

    pub fn build_links(&self, payload: &OrderPayload, load_dt: DateTime<Utc>) -> LinkSet {
        let order_pk = self.hub_key(&payload.id);
        let user_pk = self.hub_key(&payload.user.id);
        let restaurant_pk = self.hub_key(&payload.restaurant.id);

        let mut order_products = Vec::with_capacity(payload.products.len());
        let mut product_restaurants = Vec::with_capacity(payload.products.len());
        let mut product_categories = Vec::with_capacity(payload.products.len());

        for product in &payload.products {
            let product_pk = self.hub_key(&product.id);
            let category_pk = self.hub_key(&product.category);
            order_products.push(self.link(
                LinkKind::OrderProduct,
                [order_pk, product_pk],
                load_dt,
            ));
            product_restaurants.push(self.link(
                LinkKind::ProductRestaurant,
                [product_pk, restaurant_pk],
                load_dt,
            ));
            product_categories.push(self.link(
                LinkKind::ProductCategory,
                [product_pk, category_pk],
                load_dt,
            ));
        }

        LinkSet {
            order_user: self.link(LinkKind::OrderUser, [order_pk, user_pk], load_dt),
            order_products,
            product_restaurants,
            product_categories,
        }
    }

    pub fn build_satellites(
        &self,
        payload: &OrderPayload,
        load_dt: DateTime<Utc>,
    ) -> SatelliteSet {
        let order_pk = self.hub_key(&payload.id);

        SatelliteSet {
            order_cost: self.satellite(
                order_pk,
                SatelliteAttributes::OrderCost {
                    cost: payload.cost,
                    payment: payload.payment,
                },
                load_dt,
            ),
            order_status: self.satellite(
                order_pk,
                SatelliteAttributes::OrderStatus {
                    status: payload.status.clone(),
                },
                load_dt,
            ),
            restaurant_names: self.satellite(
                self.hub_key(&payload.restaurant.id),
                SatelliteAttributes::RestaurantNames {
                    name: payload.restaurant.name.clone(),
                },
                load_dt,
            ),
            user_names: self.satellite(
                self.hub_key(&payload.user.id),
                SatelliteAttributes::UserNames {
                    username: payload.user.name.clone(),
                    userlogin: payload.user.login.clone(),
                },
                load_dt,
            ),
            product_names: payload
                .products
                .iter()
                .map(|p| {
                    self.satellite(
                        self.hub_key(&p.id),
                        SatelliteAttributes::ProductNames {
                            name: p.name.clone(),
                        },
                        load_dt,
                    )
                })
                .collect(),
        }
    }

    fn hub(&self, kind: HubKind, key: &BusinessKey, load_dt: DateTime<Utc>) -> Hub {
        Hub {
            kind,
            hub_pk: self.hub_key(key),
            business_key: key.clone(),
            order_dt: None,
            load_dt,
            load_src: self.load_src.clone(),
        }
    }

    fn link(&self, kind: LinkKind, hub_pks: [Uuid; 2], load_dt: DateTime<Utc>) -> Link {
        Link {
            kind,
            link_pk: self.deriver.derive_link_key(&hub_pks),
            hub_pks,
            load_dt,
            load_src: self.load_src.clone(),
        }
    }

    fn satellite(
        &self,
        hub_pk: Uuid,
        attributes: SatelliteAttributes,
        load_dt: DateTime<Utc>,
    ) -> Satellite {
        let mut components = vec![hub_pk.to_string()];
        components.extend(attributes.hash_components());
        Satellite {
            hub_pk,
            hash_diff: self.deriver.derive_composite(&components),
            attributes,
            load_dt,
            load_src: self.load_src.clone(),
        }
    }
}

impl Default for VaultRecordBuilder {
    fn default() -> Self {
        Self::new(KeyDeriver::default(), "OrderSource")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use crate::vault::records::{SatelliteKind, VaultRecord, VaultTable};
    use serde_json::json;
    use std::collections::HashSet;

    fn sample() -> Value {
        json!({
            "id": 42,
            "date": "2023-01-01 10:00:00",
            "status": "CLOSED",
            "cost": 500,
            "payment": 500,
            "user": {"id": 7, "name": "Ann", "login": "ann"},
            "restaurant": {"id": 3, "name": "Luigi"},
            "products": [
                {"id": 1, "name": "Pizza", "category": "Food"},
                {"id": 2, "name": "Cola", "category": "Drinks"},
                {"id": 1, "name": "Pizza", "category": "Food"}
            ]
        })
    }

    fn load_dt() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2023-01-01T10:05:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_hub_keys_are_deterministic() {
        let builder = VaultRecordBuilder::default();
        let first = builder.build(&sample(), load_dt()).unwrap();
        let second = builder.build(&sample(), Utc::now()).unwrap();
        let keys = |set: &VaultRecordSet| set.hubs.iter().map(|h| h.hub_pk).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
    }

    #[test]
    fn test_user_name_hash_diff_respects_field_boundaries() {
        let builder = VaultRecordBuilder::default();
        let mut first = sample();
        first["user"]["name"] = json!("a\u{1F}b");
        first["user"]["login"] = json!("c");
        let mut second = sample();
        second["user"]["name"] = json!("a");
        second["user"]["login"] = json!("b\u{1F}c");

        let first = builder.build(&first, load_dt()).unwrap();
        let second = builder.build(&second, load_dt()).unwrap();
        assert_ne!(
            first.satellites.user_names.hash_diff,
            second.satellites.user_names.hash_diff
        );
    }

    #[test]
    fn test_one_hub_per_line_item() {
        let set = VaultRecordBuilder::default().build(&sample(), load_dt()).unwrap();
        assert_eq!(set.hubs.products.len(), 3);
        assert_eq!(set.hubs.categories.len(), 3);
        assert_eq!(set.hubs.products[0].hub_pk, set.hubs.products[2].hub_pk);
    }

    #[test]
    fn test_order_hub_carries_date() {
        let set = VaultRecordBuilder::default().build(&sample(), load_dt()).unwrap();
        let order_dt = set.hubs.order.order_dt.unwrap();
        assert_eq!(order_dt.to_string(), "2023-01-01 10:00:00");
        assert!(set.hubs.user.order_dt.is_none());
    }

    #[test]
    fn test_all_records_share_load_event() {
        let builder = VaultRecordBuilder::new(KeyDeriver::default(), "TestSource");
        let set = builder.build(&sample(), load_dt()).unwrap();
        for hub in set.hubs.iter() {
            assert_eq!(hub.load_dt, load_dt());
            assert_eq!(hub.load_src, "TestSource");
        }
        for link in set.links.iter() {
            assert_eq!(link.load_dt, load_dt());
        }
        for sat in set.satellites.iter() {
            assert_eq!(sat.load_src, "TestSource");
        }
    }

    #[test]
    fn test_link_keys_follow_documented_order() {
        let builder = VaultRecordBuilder::default();
        let set = builder.build(&sample(), load_dt()).unwrap();
        let deriver = builder.deriver();
        let order_pk = set.hubs.order.hub_pk;
        let user_pk = set.hubs.user.hub_pk;
        assert_eq!(set.links.order_user.hub_pks, [order_pk, user_pk]);
        assert_eq!(
            set.links.order_user.link_pk,
            deriver.derive_link_key(&[order_pk, user_pk])
        );

        let product_pk = set.hubs.products[0].hub_pk;
        let category_pk = set.hubs.categories[0].hub_pk;
        assert_eq!(
            set.links.product_categories[0].link_pk,
            deriver.derive_link_key(&[product_pk, category_pk])
        );
        assert_eq!(
            set.links.product_restaurants[0].hub_pks,
            [product_pk, set.hubs.restaurant.hub_pk]
        );
    }

    #[test]
    fn test_links_reference_built_hubs() {
        let set = VaultRecordBuilder::default().build(&sample(), load_dt()).unwrap();
        let hubs: HashSet<(VaultTable, Uuid)> = set
            .hubs
            .iter()
            .map(|h| (VaultTable::Hub(h.kind), h.hub_pk))
            .collect();
        for record in set.records() {
            for reference in record.references() {
                assert!(hubs.contains(&reference), "dangling reference {:?}", reference);
            }
        }
    }

    #[test]
    fn test_records_in_dependency_order() {
        let set = VaultRecordBuilder::default().build(&sample(), load_dt()).unwrap();
        let families: Vec<u8> = set
            .records()
            .map(|r| match r {
                VaultRecord::Hub(_) => 0,
                VaultRecord::Link(_) => 1,
                VaultRecord::Satellite(_) => 2,
            })
            .collect();
        assert!(families.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(set.record_count(), 9 + 10 + 7);
    }

    #[test]
    fn test_hash_diff_tracks_attributes() {
        let builder = VaultRecordBuilder::default();
        let before = builder.build(&sample(), load_dt()).unwrap();
        let mut changed = sample();
        changed["status"] = json!("CANCELLED");
        let after = builder.build(&changed, load_dt()).unwrap();

        assert_ne!(
            before.satellites.order_status.hash_diff,
            after.satellites.order_status.hash_diff
        );
        assert_eq!(
            before.satellites.order_cost.hash_diff,
            after.satellites.order_cost.hash_diff
        );
        assert_eq!(after.satellites.order_status.kind(), SatelliteKind::OrderStatus);
    }

    #[test]
    fn test_empty_products_keeps_order_level_records() {
        let mut raw = sample();
        raw["products"] = json!([]);
        let set = VaultRecordBuilder::default().build(&raw, load_dt()).unwrap();
        assert!(set.hubs.products.is_empty());
        assert!(set.hubs.categories.is_empty());
        assert!(set.links.order_products.is_empty());
        assert!(set.links.product_restaurants.is_empty());
        assert!(set.links.product_categories.is_empty());
        assert!(set.satellites.product_names.is_empty());
        assert_eq!(set.hubs.iter().count(), 3);
        assert_eq!(set.links.iter().count(), 1);
        assert_eq!(set.satellites.iter().count(), 4);
    }

    #[test]
    fn test_malformed_product_builds_nothing() {
        let mut raw = sample();
        raw["products"][1].as_object_mut().unwrap().remove("name");
        let err = VaultRecordBuilder::default().build(&raw, load_dt()).unwrap_err();
        assert!(matches!(err, VaultError::MalformedPayload(_)));
    }
}
