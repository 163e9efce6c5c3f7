//! Pure arithmetic core of the ledger: balances, document totals, taxes,
//! document status transitions and report aggregation.
//!
//! Nothing in here touches the database or awaits.

pub mod balance;
pub mod error;
pub mod money;
pub mod report;
pub mod status;
pub mod tax;
pub mod totals;

pub use error::LedgerError;
