//! Transaction and transfer operations.
//!
//! Currency code and rate are copied from the account's currency when a
//! transaction is written and never change afterwards.

use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{db_error, unknown_reference, Database, Paging};
use crate::ledger::money::{check_storable, convert, validate_amount};
use crate::ledger::tax::{transaction_taxes, ComputedTransactionTax};
use crate::ledger::LedgerError;
use crate::models::{
    Account, CreateTransaction, CreateTransfer, Currency, ListTransactionsFilter, Transaction,
    TransactionTax, TransactionType, Transfer, UpdateTransaction,
};
use crate::services::metrics::{DB_QUERY_DURATION, TRANSACTIONS_TOTAL};

pub(super) const TRANSACTION_COLUMNS: &str = "transaction_id, company_id, transaction_type, \
    account_id, paid_at, amount, currency_code, currency_rate, document_id, contact_id, \
    category_id, description, reference, payment_method, created_utc, updated_utc";

const TRANSACTION_TAX_COLUMNS: &str =
    "transaction_tax_id, transaction_id, tax_id, name, rate, amount";

const TRANSFER_COLUMNS: &str =
    "transfer_id, company_id, expense_transaction_id, income_transaction_id, created_utc";

/// Insert a transaction and its tax rows on an open connection.
pub(super) async fn insert_transaction(
    conn: &mut PgConnection,
    input: &CreateTransaction,
    currency: &Currency,
    taxes: &[ComputedTransactionTax],
) -> Result<(Transaction, Vec<TransactionTax>), AppError> {
    let transaction = sqlx::query_as::<_, Transaction>(&format!(
        r#"
        INSERT INTO transactions (transaction_id, company_id, transaction_type, account_id, paid_at,
                                  amount, currency_code, currency_rate, document_id, contact_id,
                                  category_id, description, reference, payment_method)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {}
        "#,
        TRANSACTION_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(input.company_id)
    .bind(input.transaction_type.as_str())
    .bind(input.account_id)
    .bind(input.paid_at)
    .bind(input.amount)
    .bind(&currency.code)
    .bind(currency.rate)
    .bind(input.document_id)
    .bind(input.contact_id)
    .bind(input.category_id)
    .bind(&input.description)
    .bind(&input.reference)
    .bind(&input.payment_method)
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error("create transaction"))?;

    let mut rows = Vec::with_capacity(taxes.len());
    for tax in taxes {
        let row = sqlx::query_as::<_, TransactionTax>(&format!(
            r#"
            INSERT INTO transaction_taxes (transaction_tax_id, company_id, transaction_id, tax_id,
                                           name, rate, amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TRANSACTION_TAX_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(transaction.transaction_id)
        .bind(tax.tax_id)
        .bind(&tax.name)
        .bind(tax.rate)
        .bind(tax.amount)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error("create transaction tax"))?;
        rows.push(row);
    }

    TRANSACTIONS_TOTAL
        .with_label_values(&[input.transaction_type.as_str()])
        .inc();

    Ok((transaction, rows))
}

impl Database {
    /// Load an account the caller referenced, or reject the reference.
    pub(super) async fn require_account(
        &self,
        company_id: Uuid,
        account_id: Uuid,
    ) -> Result<Account, AppError> {
        self.get_account(company_id, account_id)
            .await?
            .ok_or_else(|| unknown_reference("account_id", account_id))
    }

    /// The currency an account is kept in. A dangling code is stored-data
    /// corruption, not a caller mistake.
    pub(super) async fn account_currency(&self, account: &Account) -> Result<Currency, AppError> {
        self.get_currency_by_code(account.company_id, &account.currency_code)
            .await?
            .ok_or_else(|| LedgerError::missing_currency(&account.currency_code).into())
    }

    /// Validate a new transaction and resolve its account currency and taxes.
    pub(super) async fn prepare_transaction(
        &self,
        input: &CreateTransaction,
    ) -> Result<(Currency, Vec<ComputedTransactionTax>), AppError> {
        let account = self.require_account(input.company_id, input.account_id).await?;
        let currency = self.account_currency(&account).await?;
        validate_amount("amount", input.amount, currency.precision())?;

        self.check_references(input.company_id, input.contact_id, input.category_id)
            .await?;

        let lines: Vec<_> = self
            .resolve_taxes(input.company_id, &input.tax_ids)
            .await?
            .iter()
            .map(|t| t.to_line())
            .collect();
        let taxes = transaction_taxes(input.amount, &lines, currency.precision())?;

        Ok((currency, taxes))
    }

    /// Create an income, expense or payment transaction with its taxes.
    #[instrument(skip(self, input), fields(company_id = %input.company_id, transaction_type = input.transaction_type.as_str()))]
    pub async fn create_transaction(
        &self,
        input: &CreateTransaction,
    ) -> Result<(Transaction, Vec<TransactionTax>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_transaction"])
            .start_timer();

        if input.transaction_type == TransactionType::Transfer {
            return Err(LedgerError::validation(
                "transaction_type",
                "transfers are created through the transfers endpoint",
            )
            .into());
        }

        let (currency, taxes) = self.prepare_transaction(input).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;
        let created = insert_transaction(&mut tx, input, &currency, &taxes).await?;
        tx.commit().await.map_err(db_error("commit transaction"))?;

        timer.observe_duration();

        info!(
            transaction_id = %created.0.transaction_id,
            amount = %created.0.amount,
            currency_rate = %created.0.currency_rate,
            "Transaction created"
        );

        Ok(created)
    }

    #[instrument(skip(self), fields(company_id = %company_id, transaction_id = %transaction_id))]
    pub async fn get_transaction(
        &self,
        company_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Option<Transaction>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_transaction"])
            .start_timer();

        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions WHERE company_id = $1 AND transaction_id = $2 AND deleted_utc IS NULL",
            TRANSACTION_COLUMNS
        ))
        .bind(company_id)
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get transaction"))?;

        timer.observe_duration();

        Ok(transaction)
    }

    pub async fn list_transaction_taxes(
        &self,
        company_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Vec<TransactionTax>, AppError> {
        sqlx::query_as::<_, TransactionTax>(&format!(
            r#"
            SELECT {} FROM transaction_taxes
            WHERE company_id = $1 AND transaction_id = $2 AND deleted_utc IS NULL
            ORDER BY name
            "#,
            TRANSACTION_TAX_COLUMNS
        ))
        .bind(company_id)
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list transaction taxes"))
    }

    #[instrument(skip(self, filter), fields(company_id = %company_id))]
    pub async fn list_transactions(
        &self,
        company_id: Uuid,
        filter: &ListTransactionsFilter,
        paging: Paging,
    ) -> Result<(Vec<Transaction>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_transactions"])
            .start_timer();

        let transaction_type = filter.transaction_type.map(|t| t.as_str());
        let conditions = r#"
            company_id = $1 AND deleted_utc IS NULL
              AND ($2::uuid IS NULL OR account_id = $2)
              AND ($3::text IS NULL OR transaction_type = $3)
              AND ($4::uuid IS NULL OR document_id = $4)
              AND ($5::timestamptz IS NULL OR paid_at >= $5)
              AND ($6::timestamptz IS NULL OR paid_at <= $6)
        "#;

        let transactions = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {} FROM transactions WHERE {} ORDER BY paid_at DESC, transaction_id LIMIT $7 OFFSET $8",
            TRANSACTION_COLUMNS, conditions
        ))
        .bind(company_id)
        .bind(filter.account_id)
        .bind(transaction_type)
        .bind(filter.document_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(paging.limit)
        .bind(paging.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list transactions"))?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM transactions WHERE {}",
            conditions
        ))
        .bind(company_id)
        .bind(filter.account_id)
        .bind(transaction_type)
        .bind(filter.document_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count transactions"))?;

        timer.observe_duration();

        Ok((transactions, total))
    }

    /// Update descriptive fields. Amount, type, account and rate stay fixed.
    #[instrument(skip(self, input), fields(company_id = %company_id, transaction_id = %transaction_id))]
    pub async fn update_transaction(
        &self,
        company_id: Uuid,
        transaction_id: Uuid,
        input: &UpdateTransaction,
    ) -> Result<Option<Transaction>, AppError> {
        self.check_references(company_id, input.contact_id, input.category_id)
            .await?;

        sqlx::query_as::<_, Transaction>(&format!(
            r#"
            UPDATE transactions SET
                paid_at = COALESCE($3, paid_at),
                contact_id = COALESCE($4, contact_id),
                category_id = COALESCE($5, category_id),
                description = COALESCE($6, description),
                reference = COALESCE($7, reference),
                payment_method = COALESCE($8, payment_method),
                updated_utc = NOW()
            WHERE company_id = $1 AND transaction_id = $2 AND deleted_utc IS NULL
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(company_id)
        .bind(transaction_id)
        .bind(input.paid_at)
        .bind(input.contact_id)
        .bind(input.category_id)
        .bind(&input.description)
        .bind(&input.reference)
        .bind(&input.payment_method)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update transaction"))
    }

    #[instrument(skip(self), fields(company_id = %company_id, transaction_id = %transaction_id))]
    pub async fn get_transfer_for(
        &self,
        company_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Option<Transfer>, AppError> {
        sqlx::query_as::<_, Transfer>(&format!(
            r#"
            SELECT {} FROM transfers
            WHERE company_id = $1 AND deleted_utc IS NULL
              AND (expense_transaction_id = $2 OR income_transaction_id = $2)
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(company_id)
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get transfer"))
    }

    /// Soft-delete a transaction and its taxes. Deleting either leg of a
    /// transfer removes the whole pair. Document payments cannot be removed
    /// here since the document status depends on them.
    #[instrument(skip(self), fields(company_id = %company_id, transaction_id = %transaction_id))]
    pub async fn delete_transaction(
        &self,
        company_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<bool, AppError> {
        let Some(transaction) = self.get_transaction(company_id, transaction_id).await? else {
            return Ok(false);
        };

        if let Some(document_id) = transaction.document_id {
            warn!(document_id = %document_id, "Refusing to delete a document payment");
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Transaction is a payment of document {}",
                document_id
            )));
        }

        let transfer = self.get_transfer_for(company_id, transaction_id).await?;
        let ids = match transfer {
            Some(ref t) => vec![t.expense_transaction_id, t.income_transaction_id],
            None => vec![transaction_id],
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;

        sqlx::query(
            r#"
            UPDATE transaction_taxes SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE company_id = $1 AND transaction_id = ANY($2) AND deleted_utc IS NULL
            "#,
        )
        .bind(company_id)
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(db_error("delete transaction taxes"))?;

        if let Some(ref t) = transfer {
            sqlx::query(
                "UPDATE transfers SET deleted_utc = NOW(), updated_utc = NOW() WHERE transfer_id = $1",
            )
            .bind(t.transfer_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete transfer"))?;
        }

        let result = sqlx::query(
            r#"
            UPDATE transactions SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE company_id = $1 AND transaction_id = ANY($2) AND deleted_utc IS NULL
            "#,
        )
        .bind(company_id)
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(db_error("delete transaction"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        info!(deleted = result.rows_affected(), "Transaction deleted");

        Ok(result.rows_affected() > 0)
    }

    /// Move money between two of the company's accounts. The incoming leg is
    /// converted into the destination currency through the base currency.
    #[instrument(skip(self, input), fields(company_id = %input.company_id, from = %input.from_account_id, to = %input.to_account_id))]
    pub async fn create_transfer(
        &self,
        input: &CreateTransfer,
    ) -> Result<(Transfer, Transaction, Transaction), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_transfer"])
            .start_timer();

        if input.from_account_id == input.to_account_id {
            return Err(LedgerError::validation(
                "to_account_id",
                "a transfer needs two different accounts",
            )
            .into());
        }
        if input.amount <= Decimal::ZERO {
            return Err(
                LedgerError::validation("amount", "amount must be greater than zero").into(),
            );
        }

        let from = self
            .require_account(input.company_id, input.from_account_id)
            .await?;
        let to = self
            .require_account(input.company_id, input.to_account_id)
            .await?;
        let from_currency = self.account_currency(&from).await?;
        let to_currency = self.account_currency(&to).await?;

        validate_amount("amount", input.amount, from_currency.precision())?;
        let incoming = check_storable(
            "amount",
            convert(
                input.amount,
                from_currency.rate,
                to_currency.rate,
                to_currency.precision(),
            )?,
        )?;

        let leg = |account_id: Uuid, amount: Decimal| CreateTransaction {
            company_id: input.company_id,
            transaction_type: TransactionType::Transfer,
            account_id,
            paid_at: input.paid_at,
            amount,
            document_id: None,
            contact_id: None,
            category_id: None,
            description: input.description.clone(),
            reference: input.reference.clone(),
            payment_method: input.payment_method.clone(),
            tax_ids: Vec::new(),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;

        let (outgoing, _) =
            insert_transaction(&mut tx, &leg(from.account_id, input.amount), &from_currency, &[])
                .await?;
        let (incoming, _) =
            insert_transaction(&mut tx, &leg(to.account_id, incoming), &to_currency, &[]).await?;

        let transfer = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            INSERT INTO transfers (transfer_id, company_id, expense_transaction_id, income_transaction_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            TRANSFER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(outgoing.transaction_id)
        .bind(incoming.transaction_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create transfer"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        timer.observe_duration();

        info!(
            transfer_id = %transfer.transfer_id,
            sent = %outgoing.amount,
            received = %incoming.amount,
            "Transfer created"
        );

        Ok((transfer, outgoing, incoming))
    }
}
