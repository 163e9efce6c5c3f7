//! Account operations.

use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{db_error, unknown_reference, Database, Paging};
use crate::models::{Account, CreateAccount, FlowRow, UpdateAccount};
use crate::services::metrics::DB_QUERY_DURATION;

const ACCOUNT_COLUMNS: &str = "account_id, company_id, name, number, account_type, currency_code, \
    opening_balance, bank_name, enabled, created_utc, updated_utc";

impl Database {
    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    pub async fn create_account(&self, input: &CreateAccount) -> Result<Account, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_account"])
            .start_timer();

        if self
            .get_currency_by_code(input.company_id, &input.currency_code)
            .await?
            .is_none()
        {
            return Err(unknown_reference("currency_code", &input.currency_code));
        }

        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (account_id, company_id, name, number, account_type,
                                  currency_code, opening_balance, bank_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.name)
        .bind(&input.number)
        .bind(input.account_type.as_str())
        .bind(&input.currency_code)
        .bind(input.opening_balance)
        .bind(&input.bank_name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create account"))?;

        timer.observe_duration();

        info!(
            account_id = %account.account_id,
            currency_code = %account.currency_code,
            "Account created"
        );

        Ok(account)
    }

    #[instrument(skip(self), fields(company_id = %company_id, account_id = %account_id))]
    pub async fn get_account(
        &self,
        company_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Account>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_account"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM accounts WHERE company_id = $1 AND account_id = $2 AND deleted_utc IS NULL",
            ACCOUNT_COLUMNS
        ))
        .bind(company_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get account"))?;

        timer.observe_duration();

        Ok(account)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn list_accounts(
        &self,
        company_id: Uuid,
        paging: Paging,
    ) -> Result<(Vec<Account>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_accounts"])
            .start_timer();

        let accounts = sqlx::query_as::<_, Account>(&format!(
            r#"
            SELECT {} FROM accounts
            WHERE company_id = $1 AND deleted_utc IS NULL
            ORDER BY name, account_id
            LIMIT $2 OFFSET $3
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(company_id)
        .bind(paging.limit)
        .bind(paging.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list accounts"))?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM accounts WHERE company_id = $1 AND deleted_utc IS NULL",
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count accounts"))?;

        timer.observe_duration();

        Ok((accounts, total))
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, account_id = %account_id))]
    pub async fn update_account(
        &self,
        company_id: Uuid,
        account_id: Uuid,
        input: &UpdateAccount,
    ) -> Result<Option<Account>, AppError> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts SET
                name = COALESCE($3, name),
                number = COALESCE($4, number),
                bank_name = COALESCE($5, bank_name),
                enabled = COALESCE($6, enabled),
                updated_utc = NOW()
            WHERE company_id = $1 AND account_id = $2 AND deleted_utc IS NULL
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(company_id)
        .bind(account_id)
        .bind(&input.name)
        .bind(&input.number)
        .bind(&input.bank_name)
        .bind(input.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update account"))
    }

    /// Soft-delete an account with no live transactions.
    #[instrument(skip(self), fields(company_id = %company_id, account_id = %account_id))]
    pub async fn delete_account(&self, company_id: Uuid, account_id: Uuid) -> Result<bool, AppError> {
        let has_transactions = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM transactions
                WHERE company_id = $1 AND account_id = $2 AND deleted_utc IS NULL
            )
            "#,
        )
        .bind(company_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check account usage"))?;

        if has_transactions {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Account has transactions and cannot be deleted"
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE accounts SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE company_id = $1 AND account_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(company_id)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("delete account"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Every live transaction booked on the account, reduced to its flow.
    #[instrument(skip(self), fields(company_id = %company_id, account_id = %account_id))]
    pub async fn account_flows(
        &self,
        company_id: Uuid,
        account_id: Uuid,
    ) -> Result<Vec<FlowRow>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["account_flows"])
            .start_timer();

        let rows = sqlx::query_as::<_, FlowRow>(
            r#"
            SELECT t.transaction_type, t.amount, t.currency_rate, t.category_id, t.paid_at,
                   (tr.transfer_id IS NOT NULL) AS transfer_out
            FROM transactions t
            LEFT JOIN transfers tr
                   ON tr.expense_transaction_id = t.transaction_id AND tr.deleted_utc IS NULL
            WHERE t.company_id = $1 AND t.account_id = $2 AND t.deleted_utc IS NULL
            "#,
        )
        .bind(company_id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load account transactions"))?;

        timer.observe_duration();

        Ok(rows)
    }
}
