//! Report Projector
//!
//! Assembles the denormalized order report from the record set that was just
//! built. The store is never read; every name and category is resolved by
//! cross-referencing hub keys against satellites and links in the same set.

use crate::error::{VaultError, VaultResult};
use crate::logging::LogFeature;
use crate::vault::payload::ORDER_DATE_FORMAT;
use crate::vault::records::{
    HubKind, Satellite, SatelliteAttributes, SatelliteKind, VaultRecordSet,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub const ORDER_REPORT_OBJECT_TYPE: &str = "order_report";

/// Outbound report event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReportEvent {
    pub object_id: String,
    pub sent_dttm: String,
    pub object_type: String,
    pub payload: OrderReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub id: String,
    pub order_dt: String,
    pub status: String,
    pub restaurant: ReportRestaurant,
    pub user: ReportUser,
    pub products: Vec<ReportProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRestaurant {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProduct {
    pub id: String,
    pub name: String,
    pub category: ReportCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportProjector;

impl ReportProjector {
    pub fn new() -> Self {
        Self
    }

    /// Project `set` into a report event stamped with `sent_dttm`.
    pub fn project(
        &self,
        set: &VaultRecordSet,
        sent_dttm: DateTime<Utc>,
    ) -> VaultResult<OrderReportEvent> {
        let order = &set.hubs.order;
        let order_pk = order.hub_pk;
        let order_dt = order.order_dt.ok_or_else(|| {
            VaultError::projection(format!("order hub {} has no order date", order_pk))
        })?;

        let status = match &owned_by(&set.satellites.order_status, order_pk)?.attributes {
            SatelliteAttributes::OrderStatus { status } => status.clone(),
            _ => return Err(unexpected(SatelliteKind::OrderStatus)),
        };

        let restaurant_pk = set.hubs.restaurant.hub_pk;
        let restaurant_name =
            match &owned_by(&set.satellites.restaurant_names, restaurant_pk)?.attributes {
                SatelliteAttributes::RestaurantNames { name } => name.clone(),
                _ => return Err(unexpected(SatelliteKind::RestaurantNames)),
            };

        let user_pk = set.hubs.user.hub_pk;
        let username = match &owned_by(&set.satellites.user_names, user_pk)?.attributes {
            SatelliteAttributes::UserNames { username, .. } => username.clone(),
            _ => return Err(unexpected(SatelliteKind::UserNames)),
        };

        let report = OrderReport {
            id: order_pk.to_string(),
            order_dt: order_dt.format(ORDER_DATE_FORMAT).to_string(),
            status,
            restaurant: ReportRestaurant {
                id: restaurant_pk.to_string(),
                name: restaurant_name,
            },
            user: ReportUser {
                id: user_pk.to_string(),
                username,
            },
            products: self.project_products(set)?,
        };

        log::debug!(
            target: LogFeature::Projector.target(),
            "Projected report for order {} with {} products",
            order_pk,
            report.products.len()
        );

        Ok(OrderReportEvent {
            object_id: order_pk.to_string(),
            sent_dttm: sent_dttm.format(ORDER_DATE_FORMAT).to_string(),
            object_type: ORDER_REPORT_OBJECT_TYPE.to_string(),
            payload: report,
        })
    }

    fn project_products(&self, set: &VaultRecordSet) -> VaultResult<Vec<ReportProduct>> {
        let product_hubs: HashSet<Uuid> = set.hubs.products.iter().map(|h| h.hub_pk).collect();

        let mut product_names: HashMap<Uuid, &str> = HashMap::new();
        for sat in &set.satellites.product_names {
            match &sat.attributes {
                SatelliteAttributes::ProductNames { name } => {
                    product_names.insert(sat.hub_pk, name.as_str());
                }
                _ => return Err(unexpected(SatelliteKind::ProductNames)),
            }
        }

        let category_names: HashMap<Uuid, &str> = set
            .hubs
            .categories
            .iter()
            .map(|h| (h.hub_pk, h.business_key.as_str()))
            .collect();

        let mut product_categories: HashMap<Uuid, Uuid> = HashMap::new();
        for link in &set.links.product_categories {
            let (Some(product_pk), Some(category_pk)) = (
                link.hub_key(HubKind::Product),
                link.hub_key(HubKind::Category),
            ) else {
                return Err(VaultError::projection(format!(
                    "link {} is not a product-category link",
                    link.link_pk
                )));
            };
            if !product_hubs.contains(&product_pk) {
                return Err(VaultError::projection(format!(
                    "link {} references product {} with no hub",
                    link.link_pk, product_pk
                )));
            }
            if !product_names.contains_key(&product_pk) {
                return Err(VaultError::projection(format!(
                    "link {} references product {} with no name satellite",
                    link.link_pk, product_pk
                )));
            }
            product_categories.insert(product_pk, category_pk);
        }

        for link in &set.links.order_products {
            if let Some(product_pk) = link.hub_key(HubKind::Product) {
                if !product_hubs.contains(&product_pk) {
                    return Err(VaultError::projection(format!(
                        "order link {} references product {} with no hub",
                        link.link_pk, product_pk
                    )));
                }
            }
        }

        set.hubs
            .products
            .iter()
            .map(|hub| {
                let name = product_names.get(&hub.hub_pk).ok_or_else(|| {
                    VaultError::projection(format!("product {} has no name satellite", hub.hub_pk))
                })?;
                let category_pk = product_categories.get(&hub.hub_pk).ok_or_else(|| {
                    VaultError::projection(format!("product {} has no category link", hub.hub_pk))
                })?;
                let category_name = category_names.get(category_pk).ok_or_else(|| {
                    VaultError::projection(format!("category {} has no hub", category_pk))
                })?;

                Ok(ReportProduct {
                    id: hub.hub_pk.to_string(),
                    name: (*name).to_string(),
                    category: ReportCategory {
                        id: category_pk.to_string(),
                        name: (*category_name).to_string(),
                    },
                })
            })
            .collect()
    }
}

fn owned_by(sat: &Satellite, owner: Uuid) -> VaultResult<&Satellite> {
    if sat.hub_pk == owner {
        Ok(sat)
    } else {
        Err(VaultError::projection(format!(
            "{:?} satellite belongs to {}, expected {}",
            sat.kind(),
            sat.hub_pk,
            owner
        )))
    }
}

fn unexpected(kind: SatelliteKind) -> VaultError {
    VaultError::projection(format!("{:?} slot holds a different satellite kind", kind))
}
