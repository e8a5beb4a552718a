//! Hub, link and satellite records.
//!
//! Records are write-once. Each one knows its target table, its primary key
//! bytes and the hub rows it references, which is all the loader needs.

use crate::vault::payload::BusinessKey;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubKind {
    User,
    Restaurant,
    Order,
    Product,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    OrderUser,
    OrderProduct,
    ProductRestaurant,
    ProductCategory,
}

impl LinkKind {
    /// Participating hubs in the order their keys are concatenated
    pub const fn hub_kinds(&self) -> [HubKind; 2] {
        match self {
            LinkKind::OrderUser => [HubKind::Order, HubKind::User],
            LinkKind::OrderProduct => [HubKind::Order, HubKind::Product],
            LinkKind::ProductRestaurant => [HubKind::Product, HubKind::Restaurant],
            LinkKind::ProductCategory => [HubKind::Product, HubKind::Category],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteKind {
    OrderCost,
    OrderStatus,
    RestaurantNames,
    UserNames,
    ProductNames,
}

impl SatelliteKind {
    /// Hub kind owning satellites of this kind
    pub const fn owner(&self) -> HubKind {
        match self {
            SatelliteKind::OrderCost | SatelliteKind::OrderStatus => HubKind::Order,
            SatelliteKind::RestaurantNames => HubKind::Restaurant,
            SatelliteKind::UserNames => HubKind::User,
            SatelliteKind::ProductNames => HubKind::Product,
        }
    }
}

/// Store target of a record; one table per hub, link and satellite kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaultTable {
    Hub(HubKind),
    Link(LinkKind),
    Satellite(SatelliteKind),
}

impl VaultTable {
    pub const ALL: [VaultTable; 14] = [
        VaultTable::Hub(HubKind::User),
        VaultTable::Hub(HubKind::Restaurant),
        VaultTable::Hub(HubKind::Order),
        VaultTable::Hub(HubKind::Product),
        VaultTable::Hub(HubKind::Category),
        VaultTable::Link(LinkKind::OrderUser),
        VaultTable::Link(LinkKind::OrderProduct),
        VaultTable::Link(LinkKind::ProductRestaurant),
        VaultTable::Link(LinkKind::ProductCategory),
        VaultTable::Satellite(SatelliteKind::OrderCost),
        VaultTable::Satellite(SatelliteKind::OrderStatus),
        VaultTable::Satellite(SatelliteKind::RestaurantNames),
        VaultTable::Satellite(SatelliteKind::UserNames),
        VaultTable::Satellite(SatelliteKind::ProductNames),
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            VaultTable::Hub(HubKind::User) => "h_user",
            VaultTable::Hub(HubKind::Restaurant) => "h_restaurant",
            VaultTable::Hub(HubKind::Order) => "h_order",
            VaultTable::Hub(HubKind::Product) => "h_product",
            VaultTable::Hub(HubKind::Category) => "h_category",
            VaultTable::Link(LinkKind::OrderUser) => "l_order_user",
            VaultTable::Link(LinkKind::OrderProduct) => "l_order_product",
            VaultTable::Link(LinkKind::ProductRestaurant) => "l_product_restaurant",
            VaultTable::Link(LinkKind::ProductCategory) => "l_product_category",
            VaultTable::Satellite(SatelliteKind::OrderCost) => "s_order_cost",
            VaultTable::Satellite(SatelliteKind::OrderStatus) => "s_order_status",
            VaultTable::Satellite(SatelliteKind::RestaurantNames) => "s_restaurant_names",
            VaultTable::Satellite(SatelliteKind::UserNames) => "s_user_names",
            VaultTable::Satellite(SatelliteKind::ProductNames) => "s_product_names",
        }
    }
}

/// One business entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hub {
    pub kind: HubKind,
    pub hub_pk: Uuid,
    pub business_key: BusinessKey,
    /// Order date; set on order hubs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_dt: Option<NaiveDateTime>,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

/// An observed relationship between hubs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub kind: LinkKind,
    pub link_pk: Uuid,
    /// Participating hub keys, ordered as [`LinkKind::hub_kinds`]
    pub hub_pks: [Uuid; 2],
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

impl Link {
    /// Key of the participating hub of `kind`
    pub fn hub_key(&self, kind: HubKind) -> Option<Uuid> {
        self.kind
            .hub_kinds()
            .iter()
            .position(|k| *k == kind)
            .map(|i| self.hub_pks[i])
    }
}

/// Descriptive attributes carried by a satellite row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteAttributes {
    OrderCost { cost: Decimal, payment: Decimal },
    OrderStatus { status: String },
    RestaurantNames { name: String },
    UserNames { username: String, userlogin: String },
    ProductNames { name: String },
}

impl SatelliteAttributes {
    pub const fn kind(&self) -> SatelliteKind {
        match self {
            SatelliteAttributes::OrderCost { .. } => SatelliteKind::OrderCost,
            SatelliteAttributes::OrderStatus { .. } => SatelliteKind::OrderStatus,
            SatelliteAttributes::RestaurantNames { .. } => SatelliteKind::RestaurantNames,
            SatelliteAttributes::UserNames { .. } => SatelliteKind::UserNames,
            SatelliteAttributes::ProductNames { .. } => SatelliteKind::ProductNames,
        }
    }

    /// Attribute values in hash-diff order
    pub fn hash_components(&self) -> Vec<String> {
        match self {
            SatelliteAttributes::OrderCost { cost, payment } => {
                vec![cost.to_string(), payment.to_string()]
            }
            SatelliteAttributes::OrderStatus { status } => vec![status.clone()],
            SatelliteAttributes::RestaurantNames { name }
            | SatelliteAttributes::ProductNames { name } => vec![name.clone()],
            SatelliteAttributes::UserNames {
                username,
                userlogin,
            } => vec![username.clone(), userlogin.clone()],
        }
    }
}

/// An attribute snapshot attached to a hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    pub hub_pk: Uuid,
    pub hash_diff: Uuid,
    pub attributes: SatelliteAttributes,
    pub load_dt: DateTime<Utc>,
    pub load_src: String,
}

impl Satellite {
    pub const fn kind(&self) -> SatelliteKind {
        self.attributes.kind()
    }

    /// Owner key followed by hash-diff
    pub fn primary_key(&self) -> [u8; 32] {
        let mut key = [0u8; 32];
        key[..16].copy_from_slice(self.hub_pk.as_bytes());
        key[16..].copy_from_slice(self.hash_diff.as_bytes());
        key
    }
}

/// Borrowed view over any record, as handed to the store.
#[derive(Debug, Clone, Copy)]
pub enum VaultRecord<'a> {
    Hub(&'a Hub),
    Link(&'a Link),
    Satellite(&'a Satellite),
}

impl VaultRecord<'_> {
    pub fn table(&self) -> VaultTable {
        match self {
            VaultRecord::Hub(hub) => VaultTable::Hub(hub.kind),
            VaultRecord::Link(link) => VaultTable::Link(link.kind),
            VaultRecord::Satellite(sat) => VaultTable::Satellite(sat.kind()),
        }
    }

    pub fn primary_key(&self) -> Vec<u8> {
        match self {
            VaultRecord::Hub(hub) => hub.hub_pk.as_bytes().to_vec(),
            VaultRecord::Link(link) => link.link_pk.as_bytes().to_vec(),
            VaultRecord::Satellite(sat) => sat.primary_key().to_vec(),
        }
    }

    /// Hub rows that must exist before this record is written
    pub fn references(&self) -> Vec<(VaultTable, Uuid)> {
        match self {
            VaultRecord::Hub(_) => Vec::new(),
            VaultRecord::Link(link) => link
                .kind
                .hub_kinds()
                .iter()
                .zip(link.hub_pks.iter())
                .map(|(kind, pk)| (VaultTable::Hub(*kind), *pk))
                .collect(),
            VaultRecord::Satellite(sat) => {
                vec![(VaultTable::Hub(sat.kind().owner()), sat.hub_pk)]
            }
        }
    }

    /// Owning hub and hash-diff for satellites
    pub fn hash_diff(&self) -> Option<(Uuid, Uuid)> {
        match self {
            VaultRecord::Satellite(sat) => Some((sat.hub_pk, sat.hash_diff)),
            _ => None,
        }
    }

    /// Stored row value
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            VaultRecord::Hub(hub) => serde_json::to_vec(hub),
            VaultRecord::Link(link) => serde_json::to_vec(link),
            VaultRecord::Satellite(sat) => serde_json::to_vec(sat),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HubSet {
    pub user: Hub,
    pub restaurant: Hub,
    pub order: Hub,
    /// One per product line item, duplicates included
    pub products: Vec<Hub>,
    /// One per product line item, duplicates included
    pub categories: Vec<Hub>,
}

impl HubSet {
    pub fn iter(&self) -> impl Iterator<Item = &Hub> {
        [&self.user, &self.restaurant, &self.order]
            .into_iter()
            .chain(self.products.iter())
            .chain(self.categories.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkSet {
    pub order_user: Link,
    pub order_products: Vec<Link>,
    pub product_restaurants: Vec<Link>,
    pub product_categories: Vec<Link>,
}

impl LinkSet {
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        std::iter::once(&self.order_user)
            .chain(self.order_products.iter())
            .chain(self.product_restaurants.iter())
            .chain(self.product_categories.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteSet {
    pub order_cost: Satellite,
    pub order_status: Satellite,
    pub restaurant_names: Satellite,
    pub user_names: Satellite,
    pub product_names: Vec<Satellite>,
}

impl SatelliteSet {
    pub fn iter(&self) -> impl Iterator<Item = &Satellite> {
        [
            &self.order_cost,
            &self.order_status,
            &self.restaurant_names,
            &self.user_names,
        ]
        .into_iter()
        .chain(self.product_names.iter())
    }
}

/// Every record built from one order, sharing one load timestamp and source.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultRecordSet {
    pub hubs: HubSet,
    pub links: LinkSet,
    pub satellites: SatelliteSet,
}

impl VaultRecordSet {
    /// Records in load order: hubs, then links, then satellites
    pub fn records(&self) -> impl Iterator<Item = VaultRecord<'_>> {
        self.hubs
            .iter()
            .map(VaultRecord::Hub)
            .chain(self.links.iter().map(VaultRecord::Link))
            .chain(self.satellites.iter().map(VaultRecord::Satellite))
    }

    pub fn record_count(&self) -> usize {
        self.records().count()
    }

    pub fn order_pk(&self) -> Uuid {
        self.hubs.order.hub_pk
    }
}
