//! Tax model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::ledger::totals::TaxLine;

/// A named tax rate, in percent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tax {
    pub tax_id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub rate: Decimal,
    pub enabled: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Tax {
    /// Snapshot of the current rate, stored on whatever row applies it.
    pub fn to_line(&self) -> TaxLine {
        TaxLine {
            tax_id: self.tax_id,
            name: self.name.clone(),
            rate: self.rate,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTax {
    pub company_id: Uuid,
    pub name: String,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTax {
    pub name: Option<String>,
    pub rate: Option<Decimal>,
    pub enabled: Option<bool>,
}
