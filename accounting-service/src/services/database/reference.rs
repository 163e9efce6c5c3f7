//! Categories, contacts, taxes and items.

use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{db_error, unknown_reference, Database, Paging};
use crate::models::{
    Category, CategoryType, Contact, CreateCategory, CreateContact, CreateItem, CreateTax, Item,
    ListContactsFilter, Tax, UpdateCategory, UpdateContact, UpdateItem, UpdateTax,
};
use crate::services::metrics::DB_QUERY_DURATION;

const CATEGORY_COLUMNS: &str =
    "category_id, company_id, name, category_type, color, enabled, created_utc, updated_utc";

const CONTACT_COLUMNS: &str = "contact_id, company_id, contact_type, name, email, tax_number, \
    phone, address, currency_code, enabled, created_utc, updated_utc";

const TAX_COLUMNS: &str = "tax_id, company_id, name, rate, enabled, created_utc, updated_utc";

const ITEM_COLUMNS: &str = "item_id, company_id, name, sku, description, sale_price, \
    purchase_price, category_id, tax_id, enabled, created_utc, updated_utc";

impl Database {
    /// Soft-delete a row in one of the reference tables.
    async fn soft_delete(
        &self,
        table: &'static str,
        id_column: &'static str,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE {} SET deleted_utc = NOW(), updated_utc = NOW() \
             WHERE company_id = $1 AND {} = $2 AND deleted_utc IS NULL",
            table, id_column
        );
        let result = sqlx::query(&sql)
            .bind(company_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete record"))?;
        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Category Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    pub async fn create_category(&self, input: &CreateCategory) -> Result<Category, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_category"])
            .start_timer();

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (category_id, company_id, name, category_type, color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.name)
        .bind(input.category_type.as_str())
        .bind(&input.color)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create category"))?;

        timer.observe_duration();

        info!(category_id = %category.category_id, "Category created");

        Ok(category)
    }

    #[instrument(skip(self), fields(company_id = %company_id, category_id = %category_id))]
    pub async fn get_category(
        &self,
        company_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE company_id = $1 AND category_id = $2 AND deleted_utc IS NULL",
            CATEGORY_COLUMNS
        ))
        .bind(company_id)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get category"))
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn list_categories(
        &self,
        company_id: Uuid,
        category_type: Option<CategoryType>,
    ) -> Result<Vec<Category>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_categories"])
            .start_timer();

        let categories = sqlx::query_as::<_, Category>(&format!(
            r#"
            SELECT {} FROM categories
            WHERE company_id = $1 AND deleted_utc IS NULL
              AND ($2::text IS NULL OR category_type = $2)
            ORDER BY name
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(company_id)
        .bind(category_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list categories"))?;

        timer.observe_duration();

        Ok(categories)
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, category_id = %category_id))]
    pub async fn update_category(
        &self,
        company_id: Uuid,
        category_id: Uuid,
        input: &UpdateCategory,
    ) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories SET
                name = COALESCE($3, name),
                color = COALESCE($4, color),
                enabled = COALESCE($5, enabled),
                updated_utc = NOW()
            WHERE company_id = $1 AND category_id = $2 AND deleted_utc IS NULL
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(company_id)
        .bind(category_id)
        .bind(&input.name)
        .bind(&input.color)
        .bind(input.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update category"))
    }

    pub async fn delete_category(&self, company_id: Uuid, category_id: Uuid) -> Result<bool, AppError> {
        self.soft_delete("categories", "category_id", company_id, category_id)
            .await
    }

    // -------------------------------------------------------------------------
    // Contact Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    pub async fn create_contact(&self, input: &CreateContact) -> Result<Contact, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_contact"])
            .start_timer();

        if self
            .get_currency_by_code(input.company_id, &input.currency_code)
            .await?
            .is_none()
        {
            return Err(unknown_reference("currency_code", &input.currency_code));
        }

        let contact = sqlx::query_as::<_, Contact>(&format!(
            r#"
            INSERT INTO contacts (contact_id, company_id, contact_type, name, email, tax_number,
                                  phone, address, currency_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            CONTACT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(input.contact_type.as_str())
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.tax_number)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.currency_code)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create contact"))?;

        timer.observe_duration();

        info!(contact_id = %contact.contact_id, contact_type = %contact.contact_type, "Contact created");

        Ok(contact)
    }

    #[instrument(skip(self), fields(company_id = %company_id, contact_id = %contact_id))]
    pub async fn get_contact(
        &self,
        company_id: Uuid,
        contact_id: Uuid,
    ) -> Result<Option<Contact>, AppError> {
        sqlx::query_as::<_, Contact>(&format!(
            "SELECT {} FROM contacts WHERE company_id = $1 AND contact_id = $2 AND deleted_utc IS NULL",
            CONTACT_COLUMNS
        ))
        .bind(company_id)
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get contact"))
    }

    #[instrument(skip(self, filter), fields(company_id = %company_id))]
    pub async fn list_contacts(
        &self,
        company_id: Uuid,
        filter: &ListContactsFilter,
        paging: Paging,
    ) -> Result<(Vec<Contact>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_contacts"])
            .start_timer();

        let contact_type = filter.contact_type.map(|t| t.as_str());
        let search = filter.search.as_ref().map(|s| format!("%{}%", s));

        let contacts = sqlx::query_as::<_, Contact>(&format!(
            r#"
            SELECT {} FROM contacts
            WHERE company_id = $1 AND deleted_utc IS NULL
              AND ($2::text IS NULL OR contact_type = $2)
              AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
            ORDER BY name, contact_id
            LIMIT $4 OFFSET $5
            "#,
            CONTACT_COLUMNS
        ))
        .bind(company_id)
        .bind(contact_type)
        .bind(&search)
        .bind(paging.limit)
        .bind(paging.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list contacts"))?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM contacts
            WHERE company_id = $1 AND deleted_utc IS NULL
              AND ($2::text IS NULL OR contact_type = $2)
              AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
            "#,
        )
        .bind(company_id)
        .bind(contact_type)
        .bind(&search)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count contacts"))?;

        timer.observe_duration();

        Ok((contacts, total))
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, contact_id = %contact_id))]
    pub async fn update_contact(
        &self,
        company_id: Uuid,
        contact_id: Uuid,
        input: &UpdateContact,
    ) -> Result<Option<Contact>, AppError> {
        if let Some(ref code) = input.currency_code {
            if self.get_currency_by_code(company_id, code).await?.is_none() {
                return Err(unknown_reference("currency_code", code));
            }
        }

        sqlx::query_as::<_, Contact>(&format!(
            r#"
            UPDATE contacts SET
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                tax_number = COALESCE($5, tax_number),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                currency_code = COALESCE($8, currency_code),
                enabled = COALESCE($9, enabled),
                updated_utc = NOW()
            WHERE company_id = $1 AND contact_id = $2 AND deleted_utc IS NULL
            RETURNING {}
            "#,
            CONTACT_COLUMNS
        ))
        .bind(company_id)
        .bind(contact_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.tax_number)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.currency_code)
        .bind(input.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update contact"))
    }

    pub async fn delete_contact(&self, company_id: Uuid, contact_id: Uuid) -> Result<bool, AppError> {
        self.soft_delete("contacts", "contact_id", company_id, contact_id)
            .await
    }

    // -------------------------------------------------------------------------
    // Tax Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    pub async fn create_tax(&self, input: &CreateTax) -> Result<Tax, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_tax"])
            .start_timer();

        let tax = sqlx::query_as::<_, Tax>(&format!(
            r#"
            INSERT INTO taxes (tax_id, company_id, name, rate)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            TAX_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.name)
        .bind(input.rate)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create tax"))?;

        timer.observe_duration();

        info!(tax_id = %tax.tax_id, rate = %tax.rate, "Tax created");

        Ok(tax)
    }

    #[instrument(skip(self), fields(company_id = %company_id, tax_id = %tax_id))]
    pub async fn get_tax(&self, company_id: Uuid, tax_id: Uuid) -> Result<Option<Tax>, AppError> {
        sqlx::query_as::<_, Tax>(&format!(
            "SELECT {} FROM taxes WHERE company_id = $1 AND tax_id = $2 AND deleted_utc IS NULL",
            TAX_COLUMNS
        ))
        .bind(company_id)
        .bind(tax_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get tax"))
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn list_taxes(&self, company_id: Uuid) -> Result<Vec<Tax>, AppError> {
        sqlx::query_as::<_, Tax>(&format!(
            "SELECT {} FROM taxes WHERE company_id = $1 AND deleted_utc IS NULL ORDER BY name",
            TAX_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list taxes"))
    }

    /// Resolve tax ids to enabled taxes, preserving the caller's order.
    #[instrument(skip(self, tax_ids), fields(company_id = %company_id, count = tax_ids.len()))]
    pub async fn resolve_taxes(
        &self,
        company_id: Uuid,
        tax_ids: &[Uuid],
    ) -> Result<Vec<Tax>, AppError> {
        if tax_ids.is_empty() {
            return Ok(Vec::new());
        }

        let found = sqlx::query_as::<_, Tax>(&format!(
            r#"
            SELECT {} FROM taxes
            WHERE company_id = $1 AND tax_id = ANY($2) AND enabled AND deleted_utc IS NULL
            "#,
            TAX_COLUMNS
        ))
        .bind(company_id)
        .bind(tax_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("resolve taxes"))?;

        tax_ids
            .iter()
            .map(|id| {
                found
                    .iter()
                    .find(|t| t.tax_id == *id)
                    .cloned()
                    .ok_or_else(|| unknown_reference("tax_ids", id))
            })
            .collect()
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, tax_id = %tax_id))]
    pub async fn update_tax(
        &self,
        company_id: Uuid,
        tax_id: Uuid,
        input: &UpdateTax,
    ) -> Result<Option<Tax>, AppError> {
        sqlx::query_as::<_, Tax>(&format!(
            r#"
            UPDATE taxes SET
                name = COALESCE($3, name),
                rate = COALESCE($4, rate),
                enabled = COALESCE($5, enabled),
                updated_utc = NOW()
            WHERE company_id = $1 AND tax_id = $2 AND deleted_utc IS NULL
            RETURNING {}
            "#,
            TAX_COLUMNS
        ))
        .bind(company_id)
        .bind(tax_id)
        .bind(&input.name)
        .bind(input.rate)
        .bind(input.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update tax"))
    }

    pub async fn delete_tax(&self, company_id: Uuid, tax_id: Uuid) -> Result<bool, AppError> {
        self.soft_delete("taxes", "tax_id", company_id, tax_id).await
    }

    // -------------------------------------------------------------------------
    // Item Operations
    // -------------------------------------------------------------------------

    async fn check_item_references(
        &self,
        company_id: Uuid,
        category_id: Option<Uuid>,
        tax_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        self.check_references(company_id, None, category_id).await?;
        if let Some(id) = tax_id {
            if !self.exists("taxes", "tax_id", company_id, id).await? {
                return Err(unknown_reference("tax_id", id));
            }
        }
        Ok(())
    }

    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    pub async fn create_item(&self, input: &CreateItem) -> Result<Item, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_item"])
            .start_timer();

        self.check_item_references(input.company_id, input.category_id, input.tax_id)
            .await?;

        let item = sqlx::query_as::<_, Item>(&format!(
            r#"
            INSERT INTO items (item_id, company_id, name, sku, description, sale_price,
                               purchase_price, category_id, tax_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.name)
        .bind(&input.sku)
        .bind(&input.description)
        .bind(input.sale_price)
        .bind(input.purchase_price)
        .bind(input.category_id)
        .bind(input.tax_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "An item with SKU '{}' already exists",
                    input.sku.as_deref().unwrap_or_default()
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create item: {}", e)),
        })?;

        timer.observe_duration();

        info!(item_id = %item.item_id, "Item created");

        Ok(item)
    }

    #[instrument(skip(self), fields(company_id = %company_id, item_id = %item_id))]
    pub async fn get_item(&self, company_id: Uuid, item_id: Uuid) -> Result<Option<Item>, AppError> {
        sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE company_id = $1 AND item_id = $2 AND deleted_utc IS NULL",
            ITEM_COLUMNS
        ))
        .bind(company_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get item"))
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn list_items(
        &self,
        company_id: Uuid,
        paging: Paging,
    ) -> Result<(Vec<Item>, i64), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_items"])
            .start_timer();

        let items = sqlx::query_as::<_, Item>(&format!(
            r#"
            SELECT {} FROM items
            WHERE company_id = $1 AND deleted_utc IS NULL
            ORDER BY name, item_id
            LIMIT $2 OFFSET $3
            "#,
            ITEM_COLUMNS
        ))
        .bind(company_id)
        .bind(paging.limit)
        .bind(paging.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list items"))?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM items WHERE company_id = $1 AND deleted_utc IS NULL",
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count items"))?;

        timer.observe_duration();

        Ok((items, total))
    }

    #[instrument(skip(self, input), fields(company_id = %company_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        input: &UpdateItem,
    ) -> Result<Option<Item>, AppError> {
        self.check_item_references(company_id, input.category_id, input.tax_id)
            .await?;

        sqlx::query_as::<_, Item>(&format!(
            r#"
            UPDATE items SET
                name = COALESCE($3, name),
                sku = COALESCE($4, sku),
                description = COALESCE($5, description),
                sale_price = COALESCE($6, sale_price),
                purchase_price = COALESCE($7, purchase_price),
                category_id = COALESCE($8, category_id),
                tax_id = COALESCE($9, tax_id),
                enabled = COALESCE($10, enabled),
                updated_utc = NOW()
            WHERE company_id = $1 AND item_id = $2 AND deleted_utc IS NULL
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(company_id)
        .bind(item_id)
        .bind(&input.name)
        .bind(&input.sku)
        .bind(&input.description)
        .bind(input.sale_price)
        .bind(input.purchase_price)
        .bind(input.category_id)
        .bind(input.tax_id)
        .bind(input.enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update item"))
    }

    pub async fn delete_item(&self, company_id: Uuid, item_id: Uuid) -> Result<bool, AppError> {
        self.soft_delete("items", "item_id", company_id, item_id).await
    }
}
