//! Invoice and bill documents with their lines, taxes, totals and history.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::ledger::report::Side;
use crate::ledger::status::DocumentStatus;
use crate::ledger::totals::{Discount, TotalCode};
use service_core::error::AppError;

use super::TransactionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Bill,
    InvoiceRecurring,
    BillRecurring,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Bill => "bill",
            DocumentType::InvoiceRecurring => "invoice_recurring",
            DocumentType::BillRecurring => "bill_recurring",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "bill" => DocumentType::Bill,
            "invoice_recurring" => DocumentType::InvoiceRecurring,
            "bill_recurring" => DocumentType::BillRecurring,
            _ => DocumentType::Invoice,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            DocumentType::Invoice | DocumentType::InvoiceRecurring => Side::Receivable,
            DocumentType::Bill | DocumentType::BillRecurring => Side::Payable,
        }
    }

    /// Transaction type recorded when the document is paid.
    pub fn payment_type(&self) -> TransactionType {
        match self.side() {
            Side::Receivable => TransactionType::Income,
            Side::Payable => TransactionType::Payment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    pub document_id: Uuid,
    pub company_id: Uuid,
    pub document_type: String,
    pub document_number: String,
    pub order_number: Option<String>,
    pub status: String,
    pub issued_at: NaiveDate,
    pub due_at: NaiveDate,
    pub amount: Decimal,
    pub currency_code: String,
    pub currency_rate: Decimal,
    pub contact_id: Uuid,
    pub contact_name: String,
    pub category_id: Option<Uuid>,
    pub discount_type: Option<String>,
    pub discount_value: Option<Decimal>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Document {
    pub fn kind(&self) -> DocumentType {
        DocumentType::from_string(&self.document_type)
    }

    pub fn status(&self) -> Result<DocumentStatus, AppError> {
        DocumentStatus::from_string(&self.status).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Document {} has unknown status '{}'",
                self.document_id,
                self.status
            ))
        })
    }

    pub fn discount(&self) -> Result<Option<Discount>, AppError> {
        match (&self.discount_type, self.discount_value) {
            (Some(kind), Some(value)) => Ok(Some(Discount::from_parts(kind, value)?)),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentItem {
    pub document_item_id: Uuid,
    pub document_id: Uuid,
    pub item_id: Option<Uuid>,
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub tax: Decimal,
    pub line_number: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentItemTax {
    pub document_item_tax_id: Uuid,
    pub document_item_id: Uuid,
    pub tax_id: Uuid,
    pub name: String,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentTotal {
    pub document_total_id: Uuid,
    pub document_id: Uuid,
    pub code: String,
    pub name: String,
    pub amount: Decimal,
    pub sort_order: i32,
}

impl DocumentTotal {
    pub fn code(&self) -> Option<TotalCode> {
        TotalCode::from_string(&self.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentHistory {
    pub document_history_id: Uuid,
    pub document_id: Uuid,
    pub status: String,
    pub notify: bool,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// A document together with its live child rows.
#[derive(Debug, Clone)]
pub struct DocumentDetail {
    pub document: Document,
    pub items: Vec<DocumentItem>,
    pub item_taxes: Vec<DocumentItemTax>,
    pub totals: Vec<DocumentTotal>,
}

/// One line as submitted by the caller; taxes are referenced by id and
/// resolved against the company's tax table.
#[derive(Debug, Clone)]
pub struct CreateDocumentItem {
    pub item_id: Option<Uuid>,
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub tax_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub company_id: Uuid,
    pub document_type: DocumentType,
    pub document_number: String,
    pub order_number: Option<String>,
    pub issued_at: NaiveDate,
    pub due_at: NaiveDate,
    pub currency_code: String,
    pub contact_id: Uuid,
    pub category_id: Option<Uuid>,
    pub discount: Option<Discount>,
    pub notes: Option<String>,
    pub items: Vec<CreateDocumentItem>,
}

/// Full replacement of a draft's editable content. Totals are recomputed; the
/// frozen currency rate is kept.
#[derive(Debug, Clone)]
pub struct UpdateDocument {
    pub order_number: Option<String>,
    pub issued_at: NaiveDate,
    pub due_at: NaiveDate,
    pub category_id: Option<Uuid>,
    pub discount: Option<Discount>,
    pub notes: Option<String>,
    pub items: Vec<CreateDocumentItem>,
}

/// Payment recorded against a document.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub account_id: Uuid,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListDocumentsFilter {
    pub document_type: Option<DocumentType>,
    pub status: Option<DocumentStatus>,
    pub contact_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bills_are_paid_with_payment_transactions() {
        assert_eq!(DocumentType::Bill.payment_type(), TransactionType::Payment);
        assert_eq!(DocumentType::Invoice.payment_type(), TransactionType::Income);
        assert_eq!(DocumentType::BillRecurring.side(), Side::Payable);
    }
}
