//! HTTP handlers. Every handler resolves the caller's company from the token,
//! checks one permission and delegates to the database service.

pub mod accounts;
pub mod contacts;
pub mod currencies;
pub mod documents;
pub mod health;
pub mod items;
pub mod reports;
pub mod settings;
pub mod transactions;

use service_core::error::AppError;

pub use health::{health_check, metrics_handler, readiness_check};

pub(crate) fn not_found(what: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("{} not found", what))
}
