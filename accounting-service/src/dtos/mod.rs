//! Request and response bodies of the REST API.

mod banking;
mod common;
mod contacts;
mod documents;
mod items;
mod reports;
mod settings;

pub use banking::{
    AccountBalanceResponse, CreateAccountRequest, CreateTransactionRequest, CreateTransferRequest,
    ListTransactionsParams, TransactionResponse, TransferResponse, UpdateAccountRequest,
    UpdateTransactionRequest,
};
pub use common::{ListResponse, PageParams};
pub use contacts::{CreateContactRequest, ListContactsParams, UpdateContactRequest};
pub use documents::{
    CreateDocumentRequest, DocumentItemRequest, DocumentResponse, ListDocumentsParams,
    PaymentRequest, PaymentResponse, TransitionRequest, UpdateDocumentRequest, VerifyResponse,
};
pub use items::{CreateItemRequest, UpdateItemRequest};
pub use reports::{DashboardParams, ReportParams, ReportResponse};
pub use settings::{
    CreateCategoryRequest, CreateCurrencyRequest, CreateTaxRequest, ListCategoriesParams,
    UpdateCategoryRequest, UpdateCurrencyRequest, UpdateTaxRequest,
};
