//! Decoded inbound order payload.
//!
//! Decoding fully validates the payload, so building records from an
//! [`OrderPayload`] can no longer fail.

use crate::error::{VaultError, VaultResult};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Wire format of order and report timestamps.
pub const ORDER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A natural business key rendered to its plain string form.
///
/// JSON strings and integers are both accepted, so `42` and `"42"` name the
/// same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "String")]
pub struct BusinessKey(String);

impl BusinessKey {
    pub fn new(value: impl Into<String>) -> VaultResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(VaultError::malformed_payload("business key must not be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<Value> for BusinessKey {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) if !s.is_empty() => Ok(Self(s)),
            Value::String(_) => Err("business key must not be empty".to_string()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Self(n.to_string())),
            other => Err(format!(
                "business key must be a string or an integer, got {}",
                other
            )),
        }
    }
}

impl From<BusinessKey> for String {
    fn from(key: BusinessKey) -> Self {
        key.0
    }
}

impl fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserPayload {
    pub id: BusinessKey,
    pub name: String,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RestaurantPayload {
    pub id: BusinessKey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductPayload {
    pub id: BusinessKey,
    pub name: String,
    /// Category name; it doubles as the category's business key
    pub category: BusinessKey,
}

/// One order as delivered in an inbound event's `payload`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderPayload {
    pub id: BusinessKey,
    #[serde(deserialize_with = "deserialize_order_date")]
    pub date: NaiveDateTime,
    pub status: String,
    pub cost: Decimal,
    pub payment: Decimal,
    pub user: UserPayload,
    pub restaurant: RestaurantPayload,
    pub products: Vec<ProductPayload>,
}

impl OrderPayload {
    /// Decode and validate a raw payload value.
    pub fn from_value(raw: &Value) -> VaultResult<Self> {
        if !raw.is_object() {
            return Err(VaultError::malformed_payload("order payload must be an object"));
        }
        let payload = OrderPayload::deserialize(raw)
            .map_err(|e| VaultError::malformed_payload(e.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    fn validate(&self) -> VaultResult<()> {
        if self.status.trim().is_empty() {
            return Err(VaultError::malformed_payload("order status must not be empty"));
        }
        for (index, product) in self.products.iter().enumerate() {
            if product.name.trim().is_empty() {
                return Err(VaultError::malformed_payload(format!(
                    "products[{}].name must not be empty",
                    index
                )));
            }
        }
        Ok(())
    }
}

fn deserialize_order_date<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, ORDER_DATE_FORMAT).map_err(|e| {
        serde::de::Error::custom(format!(
            "date '{}' does not match {}: {}",
            raw, ORDER_DATE_FORMAT, e
        ))
    })
}
