//! Item (product/service catalogue) model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub item_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub sale_price: Decimal,
    pub purchase_price: Decimal,
    pub category_id: Option<Uuid>,
    pub tax_id: Option<Uuid>,
    pub enabled: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateItem {
    pub company_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub sale_price: Decimal,
    pub purchase_price: Decimal,
    pub category_id: Option<Uuid>,
    pub tax_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub sale_price: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub tax_id: Option<Uuid>,
    pub enabled: Option<bool>,
}
