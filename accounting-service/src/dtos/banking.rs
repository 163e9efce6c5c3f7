use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::PageParams;
use crate::ledger::balance::AccountBalance;
use crate::models::{
    AccountType, CreateAccount, CreateTransaction, CreateTransfer, ListTransactionsFilter,
    Transaction, TransactionTax, TransactionType, Transfer, UpdateAccount, UpdateTransaction,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 50))]
    pub number: Option<String>,
    pub account_type: AccountType,
    #[validate(length(equal = 3, message = "Currency code must have 3 letters"))]
    pub currency_code: String,
    #[serde(default)]
    pub opening_balance: Decimal,
    #[validate(length(max = 255))]
    pub bank_name: Option<String>,
}

impl CreateAccountRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateAccount {
        CreateAccount {
            company_id,
            name: self.name,
            number: self.number,
            account_type: self.account_type,
            currency_code: self.currency_code.to_uppercase(),
            opening_balance: self.opening_balance,
            bank_name: self.bank_name,
        }
    }
}

/// Opening balance and currency cannot be changed.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub number: Option<String>,
    #[validate(length(max = 255))]
    pub bank_name: Option<String>,
    pub enabled: Option<bool>,
}

impl From<UpdateAccountRequest> for UpdateAccount {
    fn from(req: UpdateAccountRequest) -> Self {
        Self {
            name: req.name,
            number: req.number,
            bank_name: req.bank_name,
            enabled: req.enabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountBalanceResponse {
    pub account_id: Uuid,
    #[serde(flatten)]
    pub balance: AccountBalance,
    /// Balance rendered with the currency's display rules.
    pub formatted: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransactionRequest {
    pub transaction_type: TransactionType,
    pub account_id: Uuid,
    pub paid_at: DateTime<Utc>,
    pub amount: Decimal,
    pub contact_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub tax_ids: Vec<Uuid>,
}

impl CreateTransactionRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateTransaction {
        CreateTransaction {
            company_id,
            transaction_type: self.transaction_type,
            account_id: self.account_id,
            paid_at: self.paid_at,
            amount: self.amount,
            document_id: None,
            contact_id: self.contact_id,
            category_id: self.category_id,
            description: self.description,
            reference: self.reference,
            payment_method: self.payment_method,
            tax_ids: self.tax_ids,
        }
    }
}

/// Only descriptive fields; amount, type and account are rejected as unknown.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateTransactionRequest {
    pub paid_at: Option<DateTime<Utc>>,
    pub contact_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
}

impl From<UpdateTransactionRequest> for UpdateTransaction {
    fn from(req: UpdateTransactionRequest) -> Self {
        Self {
            paid_at: req.paid_at,
            contact_id: req.contact_id,
            category_id: req.category_id,
            description: req.description,
            reference: req.reference,
            payment_method: req.payment_method,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub account_id: Option<Uuid>,
    pub transaction_type: Option<TransactionType>,
    pub document_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ListTransactionsParams {
    pub fn split(self) -> (ListTransactionsFilter, PageParams) {
        (
            ListTransactionsFilter {
                account_id: self.account_id,
                transaction_type: self.transaction_type,
                document_id: self.document_id,
                from: self.from,
                to: self.to,
            },
            PageParams {
                page: self.page,
                page_size: self.page_size,
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub taxes: Vec<TransactionTax>,
    pub tax_total: Decimal,
}

impl TransactionResponse {
    pub fn new(transaction: Transaction, taxes: Vec<TransactionTax>) -> Self {
        let tax_total = taxes.iter().map(|t| t.amount).sum();
        Self {
            transaction,
            taxes,
            tax_total,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTransferRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
}

impl CreateTransferRequest {
    pub fn into_model(self, company_id: Uuid) -> CreateTransfer {
        CreateTransfer {
            company_id,
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount: self.amount,
            paid_at: self.paid_at,
            description: self.description,
            reference: self.reference,
            payment_method: self.payment_method,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transfer: Transfer,
    pub outgoing: Transaction,
    pub incoming: Transaction,
}
