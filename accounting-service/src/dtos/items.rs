use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateItem, UpdateItem};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub sku: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub sale_price: Decimal,
    #[serde(default)]
    pub purchase_price: Decimal,
    pub category_id: Option<Uuid>,
    pub tax_id: Option<Uuid>,
}

impl CreateItemRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateItem {
        CreateItem {
            company_id,
            name: self.name,
            sku: self.sku,
            description: self.description,
            sale_price: self.sale_price,
            purchase_price: self.purchase_price,
            category_id: self.category_id,
            tax_id: self.tax_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub sku: Option<String>,
    pub description: Option<String>,
    pub sale_price: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub tax_id: Option<Uuid>,
    pub enabled: Option<bool>,
}

impl From<UpdateItemRequest> for UpdateItem {
    fn from(req: UpdateItemRequest) -> Self {
        Self {
            name: req.name,
            sku: req.sku,
            description: req.description,
            sale_price: req.sale_price,
            purchase_price: req.purchase_price,
            category_id: req.category_id,
            tax_id: req.tax_id,
            enabled: req.enabled,
        }
    }
}
