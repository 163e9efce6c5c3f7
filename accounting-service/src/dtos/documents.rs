use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::PageParams;
use crate::ledger::status::DocumentStatus;
use crate::ledger::totals::{Discount, DocumentCalculation};
use crate::models::{
    CreateDocument, CreateDocumentItem, CreatePayment, Document, DocumentDetail, DocumentItem,
    DocumentItemTax, DocumentTotal, DocumentType, ListDocumentsFilter, Transaction,
    UpdateDocument,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DocumentItemRequest {
    pub item_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255, message = "Item name is required"))]
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub tax_ids: Vec<Uuid>,
}

impl From<DocumentItemRequest> for CreateDocumentItem {
    fn from(req: DocumentItemRequest) -> Self {
        Self {
            item_id: req.item_id,
            name: req.name,
            quantity: req.quantity,
            price: req.price,
            tax_ids: req.tax_ids,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    pub document_type: DocumentType,
    #[validate(length(min = 1, max = 50, message = "Document number is required"))]
    pub document_number: String,
    #[validate(length(max = 50))]
    pub order_number: Option<String>,
    pub issued_at: NaiveDate,
    pub due_at: NaiveDate,
    #[validate(length(equal = 3, message = "Currency code must have 3 letters"))]
    pub currency_code: String,
    pub contact_id: Uuid,
    pub category_id: Option<Uuid>,
    pub discount: Option<Discount>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<DocumentItemRequest>,
}

impl CreateDocumentRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateDocument {
        CreateDocument {
            company_id,
            document_type: self.document_type,
            document_number: self.document_number,
            order_number: self.order_number,
            issued_at: self.issued_at,
            due_at: self.due_at,
            currency_code: self.currency_code.to_uppercase(),
            contact_id: self.contact_id,
            category_id: self.category_id,
            discount: self.discount,
            notes: self.notes,
            items: self.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Replaces the whole editable content of a draft.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateDocumentRequest {
    #[validate(length(max = 50))]
    pub order_number: Option<String>,
    pub issued_at: NaiveDate,
    pub due_at: NaiveDate,
    pub category_id: Option<Uuid>,
    pub discount: Option<Discount>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<DocumentItemRequest>,
}

impl From<UpdateDocumentRequest> for UpdateDocument {
    fn from(req: UpdateDocumentRequest) -> Self {
        Self {
            order_number: req.order_number,
            issued_at: req.issued_at,
            due_at: req.due_at,
            category_id: req.category_id,
            discount: req.discount,
            notes: req.notes,
            items: req.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListDocumentsParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub document_type: Option<DocumentType>,
    pub status: Option<DocumentStatus>,
    pub contact_id: Option<Uuid>,
}

impl ListDocumentsParams {
    pub fn split(self) -> (ListDocumentsFilter, PageParams) {
        (
            ListDocumentsFilter {
                document_type: self.document_type,
                status: self.status,
                contact_id: self.contact_id,
            },
            PageParams {
                page: self.page,
                page_size: self.page_size,
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentItemResponse {
    #[serde(flatten)]
    pub item: DocumentItem,
    pub taxes: Vec<DocumentItemTax>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub items: Vec<DocumentItemResponse>,
    pub totals: Vec<DocumentTotal>,
}

impl From<DocumentDetail> for DocumentResponse {
    fn from(detail: DocumentDetail) -> Self {
        let mut item_taxes = detail.item_taxes;
        let items = detail
            .items
            .into_iter()
            .map(|item| {
                let (taxes, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut item_taxes)
                    .into_iter()
                    .partition(|t| t.document_item_id == item.document_item_id);
                item_taxes = rest;
                DocumentItemResponse { item, taxes }
            })
            .collect();
        Self {
            document: detail.document,
            items,
            totals: detail.totals,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentRequest {
    pub account_id: Uuid,
    pub amount: Decimal,
    /// Defaults to now.
    pub paid_at: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
}

impl From<PaymentRequest> for CreatePayment {
    fn from(req: PaymentRequest) -> Self {
        Self {
            account_id: req.account_id,
            amount: req.amount,
            paid_at: req.paid_at.unwrap_or_else(Utc::now),
            category_id: req.category_id,
            description: req.description,
            reference: req.reference,
            payment_method: req.payment_method,
        }
    }
}

/// Optional note stored with a status change.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TransitionRequest {
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub document: Document,
    pub transaction: Transaction,
}

/// Recomputed totals of a document whose stored amount matched them.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub document_id: Uuid,
    #[serde(flatten)]
    pub calculation: DocumentCalculation,
}
