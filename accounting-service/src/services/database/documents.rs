//! Invoice and bill operations.
//!
//! A document, its lines, line taxes and totals rows are always written
//! together in one transaction. Line taxes keep the rate that applied when
//! the line was written, so a document can be recomputed later without
//! consulting the live tax table.

use std::collections::HashMap;

use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::transactions::insert_transaction;
use super::{db_error, unknown_reference, Database, Paging};
use crate::ledger::money::validate_amount;
use crate::ledger::status::{apply_action, settle, DocumentAction, DocumentStatus};
use crate::ledger::totals::{
    compute_document_totals, verify_amount, DocumentCalculation, LineInput, TaxLine,
};
use crate::ledger::LedgerError;
use crate::models::{
    CreateDocument, CreateDocumentItem, CreatePayment, CreateTransaction, Currency, Document,
    DocumentDetail, DocumentHistory, DocumentItem, DocumentItemTax, DocumentTotal,
    ListDocumentsFilter, Transaction, UpdateDocument,
};
use crate::services::metrics::{DB_QUERY_DURATION, DOCUMENTS_TOTAL};

const DOCUMENT_COLUMNS: &str = "document_id, company_id, document_type, document_number, \
    order_number, status, issued_at, due_at, amount, currency_code, currency_rate, contact_id, \
    contact_name, category_id, discount_type, discount_value, notes, created_utc, updated_utc";

const DOCUMENT_ITEM_COLUMNS: &str =
    "document_item_id, document_id, item_id, name, quantity, price, total, tax, line_number";

const DOCUMENT_ITEM_TAX_COLUMNS: &str =
    "document_item_tax_id, document_item_id, tax_id, name, rate, amount";

const DOCUMENT_TOTAL_COLUMNS: &str =
    "document_total_id, document_id, code, name, amount, sort_order";

const DOCUMENT_HISTORY_COLUMNS: &str =
    "document_history_id, document_id, status, notify, description, created_utc";

/// Child tables cleared when a draft is rewritten or a document is deleted.
const DOCUMENT_CHILD_TABLES: [&str; 3] = ["document_item_taxes", "document_items", "document_totals"];

/// Persist computed lines, their taxes and the totals rows.
async fn write_calculation(
    conn: &mut PgConnection,
    company_id: Uuid,
    document_id: Uuid,
    calculation: &DocumentCalculation,
) -> Result<(), AppError> {
    for (index, item) in calculation.items.iter().enumerate() {
        let document_item_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO document_items (document_item_id, company_id, document_id, item_id, name,
                                        quantity, price, total, tax, line_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(document_item_id)
        .bind(company_id)
        .bind(document_id)
        .bind(item.item_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.price)
        .bind(item.total)
        .bind(item.tax)
        .bind(index as i32 + 1)
        .execute(&mut *conn)
        .await
        .map_err(db_error("create document item"))?;

        for tax in &item.taxes {
            sqlx::query(
                r#"
                INSERT INTO document_item_taxes (document_item_tax_id, company_id, document_id,
                                                 document_item_id, tax_id, name, rate, amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(company_id)
            .bind(document_id)
            .bind(document_item_id)
            .bind(tax.tax_id)
            .bind(&tax.name)
            .bind(tax.rate)
            .bind(tax.amount)
            .execute(&mut *conn)
            .await
            .map_err(db_error("create document item tax"))?;
        }
    }

    for total in &calculation.totals {
        sqlx::query(
            r#"
            INSERT INTO document_totals (document_total_id, company_id, document_id, code, name,
                                         amount, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(document_id)
        .bind(total.code.as_str())
        .bind(&total.name)
        .bind(total.amount)
        .bind(total.sort_order)
        .execute(&mut *conn)
        .await
        .map_err(db_error("create document total"))?;
    }

    Ok(())
}

async fn clear_children(
    conn: &mut PgConnection,
    company_id: Uuid,
    document_id: Uuid,
) -> Result<(), AppError> {
    for table in DOCUMENT_CHILD_TABLES {
        sqlx::query(&format!(
            r#"
            UPDATE {} SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            "#,
            table
        ))
        .bind(company_id)
        .bind(document_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error("clear document rows"))?;
    }
    Ok(())
}

async fn insert_history(
    conn: &mut PgConnection,
    company_id: Uuid,
    document_id: Uuid,
    status: DocumentStatus,
    description: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO document_histories (document_history_id, company_id, document_id, status,
                                        notify, description)
        VALUES ($1, $2, $3, $4, FALSE, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(document_id)
    .bind(status.as_str())
    .bind(description)
    .execute(&mut *conn)
    .await
    .map_err(db_error("create document history"))?;
    Ok(())
}

/// Fetch a live document with a row lock held until the transaction ends.
async fn lock_document(
    conn: &mut PgConnection,
    company_id: Uuid,
    document_id: Uuid,
) -> Result<Option<Document>, AppError> {
    sqlx::query_as::<_, Document>(&format!(
        r#"
        SELECT {} FROM documents
        WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL
        FOR UPDATE
        "#,
        DOCUMENT_COLUMNS
    ))
    .bind(company_id)
    .bind(document_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error("lock document"))
}

impl Database {
    /// Resolve submitted lines into ledger input, snapshotting each tax rate.
    async fn resolve_lines(
        &self,
        company_id: Uuid,
        items: &[CreateDocumentItem],
    ) -> Result<Vec<LineInput>, AppError> {
        let mut tax_ids: Vec<Uuid> = items.iter().flat_map(|i| i.tax_ids.iter().copied()).collect();
        tax_ids.sort_unstable();
        tax_ids.dedup();

        let taxes: HashMap<Uuid, TaxLine> = self
            .resolve_taxes(company_id, &tax_ids)
            .await?
            .iter()
            .map(|t| (t.tax_id, t.to_line()))
            .collect();

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            if let Some(item_id) = item.item_id {
                if !self.exists("items", "item_id", company_id, item_id).await? {
                    return Err(unknown_reference("item_id", item_id));
                }
            }
            let line_taxes = item
                .tax_ids
                .iter()
                .map(|id| {
                    taxes
                        .get(id)
                        .cloned()
                        .ok_or_else(|| unknown_reference("tax_ids", id))
                })
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(LineInput {
                item_id: item.item_id,
                name: item.name.clone(),
                quantity: item.quantity,
                price: item.price,
                taxes: line_taxes,
            });
        }
        Ok(lines)
    }

    /// The currency a stored document was issued in.
    async fn document_currency(&self, document: &Document) -> Result<Currency, AppError> {
        self.get_currency_by_code(document.company_id, &document.currency_code)
            .await?
            .ok_or_else(|| LedgerError::missing_currency(&document.currency_code).into())
    }

    /// Create a draft document with its lines, taxes and totals.
    #[instrument(skip(self, input), fields(company_id = %input.company_id, document_type = input.document_type.as_str()))]
    pub async fn create_document(&self, input: &CreateDocument) -> Result<DocumentDetail, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_document"])
            .start_timer();

        if input.due_at < input.issued_at {
            return Err(LedgerError::validation("due_at", "due date is before the issue date").into());
        }

        let contact = self
            .get_contact(input.company_id, input.contact_id)
            .await?
            .ok_or_else(|| unknown_reference("contact_id", input.contact_id))?;
        self.check_references(input.company_id, None, input.category_id)
            .await?;
        let currency = self
            .get_currency_by_code(input.company_id, &input.currency_code)
            .await?
            .ok_or_else(|| unknown_reference("currency_code", &input.currency_code))?;

        let lines = self.resolve_lines(input.company_id, &input.items).await?;
        let calculation = compute_document_totals(&lines, input.discount, currency.precision())?;

        let document_id = Uuid::new_v4();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO documents (document_id, company_id, document_type, document_number,
                                   order_number, status, issued_at, due_at, amount, currency_code,
                                   currency_rate, contact_id, contact_name, category_id,
                                   discount_type, discount_value, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(document_id)
        .bind(input.company_id)
        .bind(input.document_type.as_str())
        .bind(&input.document_number)
        .bind(&input.order_number)
        .bind(DocumentStatus::Draft.as_str())
        .bind(input.issued_at)
        .bind(input.due_at)
        .bind(calculation.amount)
        .bind(&currency.code)
        .bind(currency.rate)
        .bind(contact.contact_id)
        .bind(&contact.name)
        .bind(input.category_id)
        .bind(input.discount.map(|d| d.kind()))
        .bind(input.discount.map(|d| d.value()))
        .bind(&input.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Document number '{}' already exists",
                    input.document_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create document: {}", e)),
        })?;

        write_calculation(&mut tx, input.company_id, document_id, &calculation).await?;
        insert_history(
            &mut tx,
            input.company_id,
            document_id,
            DocumentStatus::Draft,
            Some("created"),
        )
        .await?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        timer.observe_duration();

        DOCUMENTS_TOTAL
            .with_label_values(&[input.document_type.as_str(), DocumentStatus::Draft.as_str()])
            .inc();

        info!(
            document_id = %document_id,
            amount = %calculation.amount,
            currency_rate = %currency.rate,
            "Document created"
        );

        self.get_document_detail(input.company_id, document_id)
            .await?
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Created document vanished")))
    }

    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id))]
    pub async fn get_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_document"])
            .start_timer();

        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL",
            DOCUMENT_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get document"))?;

        timer.observe_duration();

        Ok(document)
    }

    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id))]
    pub async fn get_document_detail(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<DocumentDetail>, AppError> {
        let Some(document) = self.get_document(company_id, document_id).await? else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, DocumentItem>(&format!(
            r#"
            SELECT {} FROM document_items
            WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            ORDER BY line_number
            "#,
            DOCUMENT_ITEM_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list document items"))?;

        let item_taxes = sqlx::query_as::<_, DocumentItemTax>(&format!(
            r#"
            SELECT {} FROM document_item_taxes
            WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            ORDER BY document_item_id, name
            "#,
            DOCUMENT_ITEM_TAX_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list document item taxes"))?;

        let totals = sqlx::query_as::<_, DocumentTotal>(&format!(
            r#"
            SELECT {} FROM document_totals
            WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            ORDER BY sort_order
            "#,
            DOCUMENT_TOTAL_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list document totals"))?;

        Ok(Some(DocumentDetail {
            document,
            items,
            item_taxes,
            totals,
        }))
    }

    #[instrument(skip(self, filter), fields(company_id = %company_id))]
    pub async fn list_documents(
        &self,
        company_id: Uuid,
        filter: &ListDocumentsFilter,
        paging: Paging,
    ) -> Result<(Vec<Document>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_documents"])
            .start_timer();

        let document_type = filter.document_type.map(|t| t.as_str());
        let status = filter.status.map(|s| s.as_str());
        let conditions = r#"
            company_id = $1 AND deleted_utc IS NULL
              AND ($2::text IS NULL OR document_type = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR contact_id = $4)
        "#;

        let documents = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE {} ORDER BY issued_at DESC, document_number LIMIT $5 OFFSET $6",
            DOCUMENT_COLUMNS, conditions
        ))
        .bind(company_id)
        .bind(document_type)
        .bind(status)
        .bind(filter.contact_id)
        .bind(paging.limit)
        .bind(paging.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list documents"))?;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM documents WHERE {}",
            conditions
        ))
        .bind(company_id)
        .bind(document_type)
        .bind(status)
        .bind(filter.contact_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count documents"))?;

        timer.observe_duration();

        Ok((documents, total))
    }

    /// Replace a draft's content and recompute its totals. The currency rate
    /// frozen at creation is kept.
    #[instrument(skip(self, input), fields(company_id = %company_id, document_id = %document_id))]
    pub async fn update_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
        input: &UpdateDocument,
    ) -> Result<Option<DocumentDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_document"])
            .start_timer();

        let Some(document) = self.get_document(company_id, document_id).await? else {
            return Ok(None);
        };
        if input.due_at < input.issued_at {
            return Err(LedgerError::validation("due_at", "due date is before the issue date").into());
        }
        self.check_references(company_id, None, input.category_id)
            .await?;

        let currency = self.document_currency(&document).await?;
        let lines = self.resolve_lines(company_id, &input.items).await?;
        let calculation = compute_document_totals(&lines, input.discount, currency.precision())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;

        let Some(locked) = lock_document(&mut tx, company_id, document_id).await? else {
            return Ok(None);
        };
        let status = locked.status()?;
        if status != DocumentStatus::Draft {
            return Err(LedgerError::validation(
                "status",
                format!("only draft documents can be edited, this one is {}", status),
            )
            .into());
        }

        clear_children(&mut tx, company_id, document_id).await?;
        write_calculation(&mut tx, company_id, document_id, &calculation).await?;

        sqlx::query(
            r#"
            UPDATE documents SET
                order_number = $3,
                issued_at = $4,
                due_at = $5,
                category_id = $6,
                discount_type = $7,
                discount_value = $8,
                notes = $9,
                amount = $10,
                updated_utc = NOW()
            WHERE company_id = $1 AND document_id = $2
            "#,
        )
        .bind(company_id)
        .bind(document_id)
        .bind(&input.order_number)
        .bind(input.issued_at)
        .bind(input.due_at)
        .bind(input.category_id)
        .bind(input.discount.map(|d| d.kind()))
        .bind(input.discount.map(|d| d.value()))
        .bind(&input.notes)
        .bind(calculation.amount)
        .execute(&mut *tx)
        .await
        .map_err(db_error("update document"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        timer.observe_duration();

        info!(amount = %calculation.amount, "Draft document updated");

        self.get_document_detail(company_id, document_id).await
    }

    /// Soft-delete a document and its child rows. Documents with recorded
    /// payments are kept.
    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id))]
    pub async fn delete_document(&self, company_id: Uuid, document_id: Uuid) -> Result<bool, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;

        if lock_document(&mut tx, company_id, document_id).await?.is_none() {
            return Ok(false);
        }

        let paid = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM transactions
                WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            )
            "#,
        )
        .bind(company_id)
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("check document payments"))?;

        if paid {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Document has recorded payments and cannot be deleted"
            )));
        }

        clear_children(&mut tx, company_id, document_id).await?;
        sqlx::query(
            r#"
            UPDATE documents SET deleted_utc = NOW(), updated_utc = NOW()
            WHERE company_id = $1 AND document_id = $2
            "#,
        )
        .bind(company_id)
        .bind(document_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("delete document"))?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        info!("Document deleted");

        Ok(true)
    }

    /// Apply a user-triggered status change and record it in the history.
    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id, action = action.as_str()))]
    pub async fn transition_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
        action: DocumentAction,
        description: Option<&str>,
    ) -> Result<Option<Document>, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;

        let Some(document) = lock_document(&mut tx, company_id, document_id).await? else {
            return Ok(None);
        };
        let current = document.status()?;

        let item_count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM document_items
            WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(company_id)
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("count document items"))?;

        let next = apply_action(current, action, item_count as usize)?;

        let document = sqlx::query_as::<_, Document>(&format!(
            r#"
            UPDATE documents SET status = $3, updated_utc = NOW()
            WHERE company_id = $1 AND document_id = $2
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("update document status"))?;

        insert_history(&mut tx, company_id, document_id, next, description).await?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        DOCUMENTS_TOTAL
            .with_label_values(&[document.kind().as_str(), next.as_str()])
            .inc();

        info!(from = %current, to = %next, "Document status changed");

        Ok(Some(document))
    }

    /// Record a payment against a document and reclassify it as paid or
    /// partial from the sum of all its payments.
    #[instrument(skip(self, input), fields(company_id = %company_id, document_id = %document_id, amount = %input.amount))]
    pub async fn record_payment(
        &self,
        company_id: Uuid,
        document_id: Uuid,
        input: &CreatePayment,
    ) -> Result<Option<(Document, Transaction)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        let Some(document) = self.get_document(company_id, document_id).await? else {
            return Ok(None);
        };

        let account = self.require_account(company_id, input.account_id).await?;
        if account.currency_code != document.currency_code {
            return Err(LedgerError::validation(
                "account_id",
                format!(
                    "account currency {} differs from document currency {}",
                    account.currency_code, document.currency_code
                ),
            )
            .into());
        }
        let currency = self.account_currency(&account).await?;
        let precision = currency.precision();
        validate_amount("amount", input.amount, precision)?;
        if input.amount.is_zero() {
            return Err(
                LedgerError::validation("amount", "payment amount must be greater than zero").into(),
            );
        }
        self.check_references(company_id, None, input.category_id)
            .await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin transaction"))?;

        let Some(document) = lock_document(&mut tx, company_id, document_id).await? else {
            return Ok(None);
        };
        let current = document.status()?;

        let already_paid = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount), 0) FROM transactions
            WHERE company_id = $1 AND document_id = $2 AND deleted_utc IS NULL
            "#,
        )
        .bind(company_id)
        .bind(document_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("sum document payments"))?;

        let paid_total = already_paid + input.amount;
        let next = settle(current, document.amount, paid_total, precision).map_err(|e| {
            warn!(paid_total = %paid_total, document_amount = %document.amount, "Payment rejected");
            e
        })?;

        let payment = CreateTransaction {
            company_id,
            transaction_type: document.kind().payment_type(),
            account_id: account.account_id,
            paid_at: input.paid_at,
            amount: input.amount,
            document_id: Some(document_id),
            contact_id: Some(document.contact_id),
            category_id: input.category_id.or(document.category_id),
            description: input.description.clone(),
            reference: input.reference.clone(),
            payment_method: input.payment_method.clone(),
            tax_ids: Vec::new(),
        };
        let (transaction, _) = insert_transaction(&mut tx, &payment, &currency, &[]).await?;

        let document = sqlx::query_as::<_, Document>(&format!(
            r#"
            UPDATE documents SET status = $3, updated_utc = NOW()
            WHERE company_id = $1 AND document_id = $2
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("update document status"))?;

        let note = format!("payment of {} recorded", input.amount);
        insert_history(&mut tx, company_id, document_id, next, Some(&note)).await?;

        tx.commit().await.map_err(db_error("commit transaction"))?;

        timer.observe_duration();

        DOCUMENTS_TOTAL
            .with_label_values(&[document.kind().as_str(), next.as_str()])
            .inc();

        info!(
            transaction_id = %transaction.transaction_id,
            paid_total = %paid_total,
            status = %next,
            "Document payment recorded"
        );

        Ok(Some((document, transaction)))
    }

    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id))]
    pub async fn list_document_history(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<DocumentHistory>, AppError> {
        sqlx::query_as::<_, DocumentHistory>(&format!(
            r#"
            SELECT {} FROM document_histories
            WHERE company_id = $1 AND document_id = $2
            ORDER BY created_utc, document_history_id
            "#,
            DOCUMENT_HISTORY_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list document history"))
    }

    /// Recompute a stored document from its lines and frozen tax rates and
    /// compare the grand total with the stored amount.
    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id))]
    pub async fn verify_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<DocumentCalculation>, AppError> {
        let Some(detail) = self.get_document_detail(company_id, document_id).await? else {
            return Ok(None);
        };

        let currency = self.document_currency(&detail.document).await?;

        let lines: Vec<LineInput> = detail
            .items
            .iter()
            .map(|item| LineInput {
                item_id: item.item_id,
                name: item.name.clone(),
                quantity: item.quantity,
                price: item.price,
                taxes: detail
                    .item_taxes
                    .iter()
                    .filter(|t| t.document_item_id == item.document_item_id)
                    .map(|t| TaxLine {
                        tax_id: t.tax_id,
                        name: t.name.clone(),
                        rate: t.rate,
                    })
                    .collect(),
            })
            .collect();

        let calculation =
            compute_document_totals(&lines, detail.document.discount()?, currency.precision())?;
        verify_amount(document_id, detail.document.amount, &calculation)?;

        Ok(Some(calculation))
    }
}
