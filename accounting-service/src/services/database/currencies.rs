//! Currency operations.

use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{db_error, Database};
use crate::ledger::money::CurrencyBook;
use crate::models::{CreateCurrency, Currency, UpdateCurrency};
use crate::services::metrics::DB_QUERY_DURATION;

const CURRENCY_COLUMNS: &str = "currency_id, company_id, name, code, rate, precision, symbol, \
    symbol_first, decimal_mark, thousands_separator, enabled, created_utc, updated_utc";

impl Database {
    #[instrument(skip(self, input), fields(company_id = %input.company_id, code = %input.code))]
    pub async fn create_currency(&self, input: &CreateCurrency) -> Result<Currency, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_currency"])
            .start_timer();

        let currency = sqlx::query_as::<_, Currency>(&format!(
            r#"
            INSERT INTO currencies (currency_id, company_id, name, code, rate, precision, symbol,
                                    symbol_first, decimal_mark, thousands_separator)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            CURRENCY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.name)
        .bind(&input.code)
        .bind(input.rate)
        .bind(input.precision as i32)
        .bind(&input.symbol)
        .bind(input.symbol_first)
        .bind(&input.decimal_mark)
        .bind(&input.thousands_separator)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Currency '{}' already exists",
                    input.code
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create currency: {}", e)),
        })?;

        timer.observe_duration();

        info!(currency_id = %currency.currency_id, "Currency created");

        Ok(currency)
    }

    #[instrument(skip(self), fields(company_id = %company_id, currency_id = %currency_id))]
    pub async fn get_currency(
        &self,
        company_id: Uuid,
        currency_id: Uuid,
    ) -> Result<Option<Currency>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_currency"])
            .start_timer();

        let currency = sqlx::query_as::<_, Currency>(&format!(
            "SELECT {} FROM currencies WHERE company_id = $1 AND currency_id = $2 AND deleted_utc IS NULL",
            CURRENCY_COLUMNS
        ))
        .bind(company_id)
        .bind(currency_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get currency"))?;

        timer.observe_duration();

        Ok(currency)
    }

    #[instrument(skip(self), fields(company_id = %company_id, code = %code))]
    pub async fn get_currency_by_code(
        &self,
        company_id: Uuid,
        code: &str,
    ) -> Result<Option<Currency>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_currency_by_code"])
            .start_timer();

        let currency = sqlx::query_as::<_, Currency>(&format!(
            "SELECT {} FROM currencies WHERE company_id = $1 AND code = $2 AND deleted_utc IS NULL",
            CURRENCY_COLUMNS
        ))
        .bind(company_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get currency"))?;

        timer.observe_duration();

        Ok(currency)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn list_currencies(&self, company_id: Uuid) -> Result<Vec<Currency>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_currencies"])
            .start_timer();

        let currencies = sqlx::query_as::<_, Currency>(&format!(
            "SELECT {} FROM currencies WHERE company_id = $1 AND deleted_utc IS NULL ORDER BY code",
            CURRENCY_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list currencies"))?;

        timer.observe_duration();

        Ok(currencies)
    }

    /// All live currencies of the company, keyed by code.
    pub async fn currency_book(&self, company_id: Uuid) -> Result<CurrencyBook, AppError> {
        let currencies = self.list_currencies(company_id).await?;
        Ok(CurrencyBook::new(currencies.iter().map(Currency::spec)))
    }

    /// Update a currency. Rows that already froze a rate keep it; the precision
    /// is fixed once a document uses the currency.
    #[instrument(skip(self, input), fields(company_id = %company_id, currency_id = %currency_id))]
    pub async fn update_currency(
        &self,
        company_id: Uuid,
        currency_id: Uuid,
        input: &UpdateCurrency,
    ) -> Result<Option<Currency>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_currency"])
            .start_timer();

        if let Some(precision) = input.precision {
            let repricing = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM documents d
                    JOIN currencies c ON c.company_id = d.company_id AND c.code = d.currency_code
                    WHERE c.company_id = $1 AND c.currency_id = $2
                      AND c.precision <> $3
                      AND d.deleted_utc IS NULL
                )
                "#,
            )
            .bind(company_id)
            .bind(currency_id)
            .bind(precision as i32)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("check currency documents"))?;

            // Stored document totals were rounded at the old precision.
            if repricing {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Currency precision cannot change while documents use it"
                )));
            }
        }

        let currency = sqlx::query_as::<_, Currency>(&format!(
            r#"
            UPDATE currencies SET
                name = COALESCE($3, name),
                rate = COALESCE($4, rate),
                precision = COALESCE($5, precision),
                symbol = COALESCE($6, symbol),
                symbol_first = COALESCE($7, symbol_first),
                decimal_mark = COALESCE($8, decimal_mark),
                thousands_separator = COALESCE($9, thousands_separator),
                enabled = COALESCE($10, enabled),
                updated_utc = NOW()
            WHERE company_id = $1 AND currency_id = $2 AND deleted_utc IS NULL
            RETURNING {}
            "#,
            CURRENCY_COLUMNS
        ))
        .bind(company_id)
        .bind(currency_id)
        .bind(&input.name)
        .bind(input.rate)
        .bind(input.precision.map(|p| p as i32))
        .bind(&input.symbol)
        .bind(input.symbol_first)
        .bind(&input.decimal_mark)
        .bind(&input.thousands_separator)
        .bind(input.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update currency"))?;

        timer.observe_duration();

        if let Some(ref c) = currency {
            info!(code = %c.code, rate = %c.rate, "Currency updated");
        }

        Ok(currency)
    }

    /// Soft-delete a currency that no live account still uses.
    #[instrument(skip(self), fields(company_id = %company_id, currency_id = %currency_id))]
    pub async fn delete_currency(
        &self,
        company_id: Uuid,
        currency_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_currency"])
            .start_timer();

        let in_use = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM accounts a
                JOIN currencies c ON c.company_id = a.company_id AND c.code = a.currency_code
                WHERE c.company_id = $1 AND c.currency_id = $2
                  AND a.deleted_utc IS NULL
            )
            "#,
        )
        .bind(company_id)
        .bind(currency_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check currency usage"))?;

        if in_use {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Currency is used by an account"
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE currencies SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE company_id = $1 AND currency_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(company_id)
        .bind(currency_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("delete currency"))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}
