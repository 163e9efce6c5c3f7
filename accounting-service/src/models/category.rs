//! Category model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Income,
    Expense,
    Item,
    Other,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
            CategoryType::Item => "item",
            CategoryType::Other => "other",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "income" => CategoryType::Income,
            "expense" => CategoryType::Expense,
            "item" => CategoryType::Item,
            _ => CategoryType::Other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub category_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub category_type: String,
    pub color: String,
    pub enabled: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub company_id: Uuid,
    pub name: String,
    pub category_type: CategoryType,
    pub color: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub color: Option<String>,
    pub enabled: Option<bool>,
}
