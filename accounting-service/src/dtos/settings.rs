use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    CategoryType, CreateCategory, CreateCurrency, CreateTax, UpdateCategory, UpdateCurrency,
    UpdateTax,
};

fn default_true() -> bool {
    true
}

fn default_decimal_mark() -> String {
    ".".to_string()
}

fn default_thousands_separator() -> String {
    ",".to_string()
}

fn default_precision() -> u32 {
    2
}

fn default_color() -> String {
    "#6da252".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCurrencyRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(length(equal = 3, message = "Currency code must have 3 letters"))]
    pub code: String,

    pub rate: Decimal,

    #[serde(default = "default_precision")]
    #[validate(range(max = 4, message = "Precision must be between 0 and 4"))]
    pub precision: u32,

    #[validate(length(min = 1, max = 10, message = "Symbol is required"))]
    pub symbol: String,

    #[serde(default = "default_true")]
    pub symbol_first: bool,

    #[serde(default = "default_decimal_mark")]
    #[validate(length(equal = 1))]
    pub decimal_mark: String,

    #[serde(default = "default_thousands_separator")]
    #[validate(length(equal = 1))]
    pub thousands_separator: String,
}

impl CreateCurrencyRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateCurrency {
        CreateCurrency {
            company_id,
            name: self.name,
            code: self.code.to_uppercase(),
            rate: self.rate,
            precision: self.precision,
            symbol: self.symbol,
            symbol_first: self.symbol_first,
            decimal_mark: self.decimal_mark,
            thousands_separator: self.thousands_separator,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateCurrencyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub rate: Option<Decimal>,
    #[validate(range(max = 4, message = "Precision must be between 0 and 4"))]
    pub precision: Option<u32>,
    #[validate(length(min = 1, max = 10))]
    pub symbol: Option<String>,
    pub symbol_first: Option<bool>,
    #[validate(length(equal = 1))]
    pub decimal_mark: Option<String>,
    #[validate(length(equal = 1))]
    pub thousands_separator: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateCurrencyRequest> for UpdateCurrency {
    fn from(req: UpdateCurrencyRequest) -> Self {
        Self {
            name: req.name,
            rate: req.rate,
            precision: req.precision,
            symbol: req.symbol,
            symbol_first: req.symbol_first,
            decimal_mark: req.decimal_mark,
            thousands_separator: req.thousands_separator,
            enabled: req.enabled,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub category_type: CategoryType,
    #[serde(default = "default_color")]
    #[validate(length(min = 1, max = 20))]
    pub color: String,
}

impl CreateCategoryRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateCategory {
        CreateCategory {
            company_id,
            name: self.name,
            category_type: self.category_type,
            color: self.color,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub color: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateCategoryRequest> for UpdateCategory {
    fn from(req: UpdateCategoryRequest) -> Self {
        Self {
            name: req.name,
            color: req.color,
            enabled: req.enabled,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCategoriesParams {
    pub category_type: Option<CategoryType>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaxRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    /// Percent.
    pub rate: Decimal,
}

impl CreateTaxRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateTax {
        CreateTax {
            company_id,
            name: self.name,
            rate: self.rate,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaxRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub rate: Option<Decimal>,
    pub enabled: Option<bool>,
}

impl From<UpdateTaxRequest> for UpdateTax {
    fn from(req: UpdateTaxRequest) -> Self {
        Self {
            name: req.name,
            rate: req.rate,
            enabled: req.enabled,
        }
    }
}
