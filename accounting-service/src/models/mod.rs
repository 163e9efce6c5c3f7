//! Domain models for accounting-service.

mod account;
mod category;
mod contact;
mod currency;
mod document;
mod item;
mod tax;
mod transaction;

pub use account::{Account, AccountType, CreateAccount, UpdateAccount};
pub use category::{Category, CategoryType, CreateCategory, UpdateCategory};
pub use contact::{Contact, ContactType, CreateContact, ListContactsFilter, UpdateContact};
pub use currency::{CreateCurrency, Currency, UpdateCurrency};
pub use document::{
    CreateDocument, CreateDocumentItem, CreatePayment, Document, DocumentDetail, DocumentHistory,
    DocumentItem, DocumentItemTax, DocumentTotal, DocumentType, ListDocumentsFilter, UpdateDocument,
};
pub use item::{CreateItem, Item, UpdateItem};
pub use tax::{CreateTax, Tax, UpdateTax};
pub use transaction::{
    CreateTransaction, CreateTransfer, FlowRow, ListTransactionsFilter, Transaction,
    TransactionTax, TransactionType, Transfer, UpdateTransaction,
};
