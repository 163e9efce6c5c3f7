//! Currency model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::ledger::money::{CurrencyFormat, CurrencySpec};

/// A company's currency: live exchange rate against the base currency and
/// display rules.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Currency {
    pub currency_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub code: String,
    pub rate: Decimal,
    pub precision: i32,
    pub symbol: String,
    pub symbol_first: bool,
    pub decimal_mark: String,
    pub thousands_separator: String,
    pub enabled: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Currency {
    /// Fractional digits; the column is constrained to 0..=4.
    pub fn precision(&self) -> u32 {
        u32::try_from(self.precision).unwrap_or_default()
    }

    pub fn format(&self) -> CurrencyFormat {
        CurrencyFormat {
            code: self.code.clone(),
            precision: self.precision(),
            symbol: self.symbol.clone(),
            symbol_first: self.symbol_first,
            decimal_mark: self.decimal_mark.clone(),
            thousands_separator: self.thousands_separator.clone(),
        }
    }

    pub fn spec(&self) -> CurrencySpec {
        CurrencySpec {
            format: self.format(),
            rate: self.rate,
        }
    }
}

/// Input for creating a currency.
#[derive(Debug, Clone)]
pub struct CreateCurrency {
    pub company_id: Uuid,
    pub name: String,
    pub code: String,
    pub rate: Decimal,
    pub precision: u32,
    pub symbol: String,
    pub symbol_first: bool,
    pub decimal_mark: String,
    pub thousands_separator: String,
}

/// Input for updating a currency. Changing the rate never touches rows that
/// already froze the old one.
#[derive(Debug, Clone, Default)]
pub struct UpdateCurrency {
    pub name: Option<String>,
    pub rate: Option<Decimal>,
    pub precision: Option<u32>,
    pub symbol: Option<String>,
    pub symbol_first: Option<bool>,
    pub decimal_mark: Option<String>,
    pub thousands_separator: Option<String>,
    pub enabled: Option<bool>,
}
