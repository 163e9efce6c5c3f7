//! Database service for accounting-service.
//!
//! Every query is scoped by `company_id` and ignores soft-deleted rows. Writes
//! that touch more than one table run inside a single transaction.

mod accounts;
mod currencies;
mod documents;
mod reference;
mod reports;
mod transactions;

use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::ledger::LedgerError;
use crate::services::metrics::ERRORS_TOTAL;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Limit/offset pair derived from page parameters.
#[derive(Debug, Clone, Copy)]
pub struct Paging {
    pub limit: i64,
    pub offset: i64,
}

impl Paging {
    pub const DEFAULT_PAGE_SIZE: u32 = 25;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE);
        Self {
            limit: i64::from(page_size),
            offset: i64::from(page - 1) * i64::from(page_size),
        }
    }
}

/// Map a sqlx error, turning constraint violations into caller errors.
pub(crate) fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(anyhow::anyhow!("Failed to {}: value already exists", operation))
        }
        sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
            AppError::BadRequest(anyhow::anyhow!(
                "Failed to {}: referenced record does not exist",
                operation
            ))
        }
        _ => {
            ERRORS_TOTAL.with_label_values(&["database"]).inc();
            AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", operation, e))
        }
    }
}

/// A reference supplied by the caller that does not resolve within the company.
pub(crate) fn unknown_reference(field: &str, id: impl std::fmt::Display) -> AppError {
    LedgerError::validation(field, format!("'{}' does not exist", id)).into()
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "accounting-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Check that a live row with `id` exists for the company. `table` and
    /// `id_column` are always compile-time constants.
    pub(crate) async fn exists(
        &self,
        table: &'static str,
        id_column: &'static str,
        company_id: Uuid,
        id: Uuid,
    ) -> Result<bool, AppError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE company_id = $1 AND {} = $2 AND deleted_utc IS NULL)",
            table, id_column
        );
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(company_id)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("check reference"))
    }

    /// Validate optional contact/category references on a write.
    pub(crate) async fn check_references(
        &self,
        company_id: Uuid,
        contact_id: Option<Uuid>,
        category_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(id) = contact_id {
            if !self.exists("contacts", "contact_id", company_id, id).await? {
                return Err(unknown_reference("contact_id", id));
            }
        }
        if let Some(id) = category_id {
            if !self.exists("categories", "category_id", company_id, id).await? {
                return Err(unknown_reference("category_id", id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_clamps() {
        let p = Paging::new(None, None);
        assert_eq!((p.limit, p.offset), (25, 0));

        let p = Paging::new(Some(3), Some(500));
        assert_eq!((p.limit, p.offset), (100, 200));

        let p = Paging::new(Some(0), Some(0));
        assert_eq!((p.limit, p.offset), (1, 0));
    }
}
