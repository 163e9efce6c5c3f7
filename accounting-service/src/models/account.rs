//! Account model: a bank, cash or credit card bucket holding money.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Bank,
    Cash,
    CreditCard,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Bank => "bank",
            AccountType::Cash => "cash",
            AccountType::CreditCard => "credit_card",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "cash" => AccountType::Cash,
            "credit_card" => AccountType::CreditCard,
            _ => AccountType::Bank,
        }
    }
}

/// The balance is never stored here; it is derived from transactions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub number: Option<String>,
    pub account_type: String,
    pub currency_code: String,
    pub opening_balance: Decimal,
    pub bank_name: Option<String>,
    pub enabled: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub company_id: Uuid,
    pub name: String,
    pub number: Option<String>,
    pub account_type: AccountType,
    pub currency_code: String,
    pub opening_balance: Decimal,
    pub bank_name: Option<String>,
}

/// Opening balance and currency are fixed once the account exists.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccount {
    pub name: Option<String>,
    pub number: Option<String>,
    pub bank_name: Option<String>,
    pub enabled: Option<bool>,
}
