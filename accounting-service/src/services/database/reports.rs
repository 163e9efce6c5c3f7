//! Read-only projections feeding the report aggregations.

use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::FromRow;
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{db_error, Database};
use crate::ledger::report::{DateRange, OpenDocument, ReportEntry};
use crate::ledger::status::DocumentStatus;
use crate::models::{DocumentType, FlowRow};
use crate::services::metrics::DB_QUERY_DURATION;

#[derive(Debug, FromRow)]
struct OpenDocumentRow {
    document_id: Uuid,
    document_type: String,
    status: String,
    amount: Decimal,
    currency_rate: Decimal,
    paid: Decimal,
}

impl Database {
    /// Transactions paid within the range, with transfer direction resolved.
    #[instrument(skip(self), fields(company_id = %company_id, from = %range.from, to = %range.to))]
    pub async fn report_entries(
        &self,
        company_id: Uuid,
        range: DateRange,
    ) -> Result<Vec<ReportEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["report_entries"])
            .start_timer();

        let rows = sqlx::query_as::<_, FlowRow>(
            r#"
            SELECT t.transaction_type, t.amount, t.currency_rate, t.category_id, t.paid_at,
                   (tr.transfer_id IS NOT NULL) AS transfer_out
            FROM transactions t
            LEFT JOIN transfers tr
                   ON tr.expense_transaction_id = t.transaction_id AND tr.deleted_utc IS NULL
            WHERE t.company_id = $1 AND t.deleted_utc IS NULL
              AND (t.paid_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
            "#,
        )
        .bind(company_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load report transactions"))?;

        timer.observe_duration();

        Ok(rows
            .iter()
            .map(FlowRow::report_entry)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Documents still owed, with the sum of their payments so far.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn open_documents(&self, company_id: Uuid) -> Result<Vec<OpenDocument>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["open_documents"])
            .start_timer();

        let rows = sqlx::query_as::<_, OpenDocumentRow>(
            r#"
            SELECT d.document_id, d.document_type, d.status, d.amount, d.currency_rate,
                   COALESCE(SUM(t.amount), 0) AS paid
            FROM documents d
            LEFT JOIN transactions t
                   ON t.document_id = d.document_id AND t.deleted_utc IS NULL
            WHERE d.company_id = $1 AND d.deleted_utc IS NULL
              AND d.status IN ('sent', 'viewed', 'approved', 'partial', 'overdue')
            GROUP BY d.document_id
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load open documents"))?;

        timer.observe_duration();

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(status) = DocumentStatus::from_string(&row.status) else {
                warn!(document_id = %row.document_id, status = %row.status, "Skipping document with unknown status");
                continue;
            };
            documents.push(OpenDocument {
                side: DocumentType::from_string(&row.document_type).side(),
                status,
                amount: row.amount,
                paid: row.paid,
                currency_rate: row.currency_rate,
            });
        }
        Ok(documents)
    }

    /// Code of the company's currency at rate one, if any.
    pub async fn base_currency_code(&self, company_id: Uuid) -> Result<Option<String>, AppError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT code FROM currencies
            WHERE company_id = $1 AND rate = 1 AND deleted_utc IS NULL
            ORDER BY code
            LIMIT 1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get base currency"))
    }
}
