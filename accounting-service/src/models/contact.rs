//! Contact model: customers, vendors and employees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Customer,
    Vendor,
    Employee,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::Customer => "customer",
            ContactType::Vendor => "vendor",
            ContactType::Employee => "employee",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "vendor" => ContactType::Vendor,
            "employee" => ContactType::Employee,
            _ => ContactType::Customer,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub contact_id: Uuid,
    pub company_id: Uuid,
    pub contact_type: String,
    pub name: String,
    pub email: Option<String>,
    pub tax_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency_code: String,
    pub enabled: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateContact {
    pub company_id: Uuid,
    pub contact_type: ContactType,
    pub name: String,
    pub email: Option<String>,
    pub tax_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency_code: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub tax_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub currency_code: Option<String>,
    pub enabled: Option<bool>,
}

/// Filter for listing contacts.
#[derive(Debug, Clone, Default)]
pub struct ListContactsFilter {
    pub contact_type: Option<ContactType>,
    pub search: Option<String>,
}
