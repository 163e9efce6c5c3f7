//! Application startup and lifecycle management.

use std::sync::Arc;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::TokenVerifier;
use crate::config::AccountingConfig;
use crate::handlers::{
    self, accounts, contacts, currencies, documents, items, reports, settings, transactions,
};
use crate::services::{init_metrics, Database};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AccountingConfig,
    pub db: Arc<Database>,
    pub verifier: TokenVerifier,
}

/// Every route of the service, wrapped in the common middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        // Settings
        .route(
            "/currencies",
            post(currencies::create_currency).get(currencies::list_currencies),
        )
        .route(
            "/currencies/:id",
            get(currencies::get_currency)
                .patch(currencies::update_currency)
                .delete(currencies::delete_currency),
        )
        .route(
            "/categories",
            post(settings::create_category).get(settings::list_categories),
        )
        .route(
            "/categories/:id",
            get(settings::get_category)
                .patch(settings::update_category)
                .delete(settings::delete_category),
        )
        .route("/taxes", post(settings::create_tax).get(settings::list_taxes))
        .route(
            "/taxes/:id",
            get(settings::get_tax)
                .patch(settings::update_tax)
                .delete(settings::delete_tax),
        )
        // Contacts and items
        .route(
            "/contacts",
            post(contacts::create_contact).get(contacts::list_contacts),
        )
        .route(
            "/contacts/:id",
            get(contacts::get_contact)
                .patch(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .route("/items", post(items::create_item).get(items::list_items))
        .route(
            "/items/:id",
            get(items::get_item)
                .patch(items::update_item)
                .delete(items::delete_item),
        )
        // Banking
        .route(
            "/accounts",
            post(accounts::create_account).get(accounts::list_accounts),
        )
        .route(
            "/accounts/:id",
            get(accounts::get_account)
                .patch(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route("/accounts/:id/balance", get(accounts::get_account_balance))
        .route(
            "/transactions",
            post(transactions::create_transaction).get(transactions::list_transactions),
        )
        .route(
            "/transactions/:id",
            get(transactions::get_transaction)
                .patch(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route("/transfers", post(transactions::create_transfer))
        // Documents
        .route(
            "/documents",
            post(documents::create_document).get(documents::list_documents),
        )
        .route(
            "/documents/:id",
            get(documents::get_document)
                .put(documents::update_document)
                .delete(documents::delete_document),
        )
        .route("/documents/:id/send", post(documents::send_document))
        .route("/documents/:id/view", post(documents::mark_document_viewed))
        .route("/documents/:id/approve", post(documents::approve_document))
        .route("/documents/:id/overdue", post(documents::mark_document_overdue))
        .route("/documents/:id/cancel", post(documents::cancel_document))
        .route("/documents/:id/payments", post(documents::record_payment))
        .route("/documents/:id/history", get(documents::list_document_history))
        .route("/documents/:id/verify", get(documents::verify_document))
        // Reports
        .route("/reports/profit-loss", get(reports::profit_loss))
        .route("/reports/income-summary", get(reports::income_summary))
        .route("/reports/expense-summary", get(reports::expense_summary))
        .route("/reports/dashboard", get(reports::get_dashboard))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    company_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: AccountingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: AccountingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: AccountingConfig, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let state = AppState {
            verifier: TokenVerifier::new(config.auth.secret_bytes()),
            config: config.clone(),
            db: Arc::new(db),
        };

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Accounting service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = %self.state.config.service_name,
            version = %self.state.config.service_version,
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router(self.state)).await
    }
}
