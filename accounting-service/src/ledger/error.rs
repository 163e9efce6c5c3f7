//! Error taxonomy of the ledger core.

use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::services::metrics::ERRORS_TOTAL;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Bad input shape, rejected before any computation.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A referenced currency, tax or category does not exist for the company.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A stored document amount disagrees with its recomputed grand total.
    #[error("document {document_id} stores amount {stored} but its totals compute to {computed}")]
    Consistency {
        document_id: Uuid,
        stored: Decimal,
        computed: Decimal,
    },
}

impl LedgerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_currency(code: &str) -> Self {
        LedgerError::Configuration(format!("currency '{}' is not configured", code))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation { field, message } => AppError::InvalidField { field, message },
            LedgerError::Configuration(message) => {
                tracing::error!(error = %message, "Ledger configuration error");
                AppError::ConfigError(anyhow::anyhow!(message))
            }
            err @ LedgerError::Consistency { .. } => {
                tracing::error!(error = %err, "Ledger consistency violation");
                ERRORS_TOTAL.with_label_values(&["consistency"]).inc();
                AppError::InternalError(anyhow::Error::new(err))
            }
        }
    }
}
