//! Product/service catalog model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Product,
    Service,
}

impl ProductType {
    /// Translate a QuickBooks item type. Inventory-tracked items become
    /// products; everything unrecognized is treated as a service.
    pub fn from_qbo(item_type: Option<&str>) -> Self {
        match item_type {
            Some("Inventory") | Some("NonInventory") => Self::Product,
            _ => Self::Service,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Service => "service",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_type: String,
    pub unit_price: Option<Decimal>,
    pub is_active: bool,
    pub qbo_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for upserting a product keyed on (company_id, qbo_id).
#[derive(Debug, Clone)]
pub struct ProductUpsert {
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_type: ProductType,
    pub unit_price: Option<Decimal>,
    pub is_active: bool,
    pub qbo_id: String,
}
