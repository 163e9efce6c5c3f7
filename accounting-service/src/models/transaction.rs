//! Transaction model and the rows hanging off it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::ledger::balance::{Flow, Posting};
use crate::ledger::report::ReportEntry;
use crate::ledger::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
    Payment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Transfer => "transfer",
            TransactionType::Payment => "payment",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            "transfer" => Some(TransactionType::Transfer),
            "payment" => Some(TransactionType::Payment),
            _ => None,
        }
    }

    /// A transfer leg is outgoing when it is the expense side of its
    /// transfer pair.
    pub fn flow(&self, transfer_out: bool) -> Flow {
        match self {
            TransactionType::Income => Flow::Income,
            TransactionType::Expense => Flow::Expense,
            TransactionType::Payment => Flow::Payment,
            TransactionType::Transfer if transfer_out => Flow::TransferOut,
            TransactionType::Transfer => Flow::TransferIn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub company_id: Uuid,
    pub transaction_type: String,
    pub account_id: Uuid,
    pub paid_at: DateTime<Utc>,
    pub amount: Decimal,
    pub currency_code: String,
    pub currency_rate: Decimal,
    pub document_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub payment_method: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionTax {
    pub transaction_tax_id: Uuid,
    pub transaction_id: Uuid,
    pub tax_id: Uuid,
    pub name: String,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    pub transfer_id: Uuid,
    pub company_id: Uuid,
    pub expense_transaction_id: Uuid,
    pub income_transaction_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

/// Minimal projection of a transaction for balance and report arithmetic.
#[derive(Debug, Clone, FromRow)]
pub struct FlowRow {
    pub transaction_type: String,
    pub amount: Decimal,
    pub currency_rate: Decimal,
    pub category_id: Option<Uuid>,
    pub paid_at: DateTime<Utc>,
    pub transfer_out: bool,
}

impl FlowRow {
    /// A stored type outside the known set is corrupted data, never skipped.
    pub fn flow(&self) -> Result<Flow, LedgerError> {
        TransactionType::from_string(&self.transaction_type)
            .map(|t| t.flow(self.transfer_out))
            .ok_or_else(|| {
                LedgerError::Configuration(format!(
                    "transaction type '{}' is not recognised",
                    self.transaction_type
                ))
            })
    }

    pub fn posting(&self) -> Result<Posting, LedgerError> {
        Ok(Posting::new(self.flow()?, self.amount))
    }

    pub fn report_entry(&self) -> Result<ReportEntry, LedgerError> {
        Ok(ReportEntry {
            flow: self.flow()?,
            amount: self.amount,
            currency_rate: self.currency_rate,
            category_id: self.category_id,
            paid_at: self.paid_at,
        })
    }
}

/// Input for creating a transaction. Currency and rate come from the account
/// and are frozen at insert time.
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub company_id: Uuid,
    pub transaction_type: TransactionType,
    pub account_id: Uuid,
    pub paid_at: DateTime<Utc>,
    pub amount: Decimal,
    pub document_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub payment_method: Option<String>,
    pub tax_ids: Vec<Uuid>,
}

/// Only non-monetary fields are editable.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransaction {
    pub paid_at: Option<DateTime<Utc>>,
    pub contact_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateTransfer {
    pub company_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListTransactionsFilter {
    pub account_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub document_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_direction_follows_pair_side() {
        assert_eq!(TransactionType::Transfer.flow(true), Flow::TransferOut);
        assert_eq!(TransactionType::Transfer.flow(false), Flow::TransferIn);
        assert_eq!(TransactionType::Payment.flow(true), Flow::Payment);
    }

    #[test]
    fn unknown_type_is_a_configuration_error() {
        let row = FlowRow {
            transaction_type: "refund".into(),
            amount: Decimal::ONE,
            currency_rate: Decimal::ONE,
            category_id: None,
            paid_at: Utc::now(),
            transfer_out: false,
        };
        assert!(matches!(row.posting(), Err(LedgerError::Configuration(_))));
        assert!(row.report_entry().is_err());
    }
}
