//! Read-only reports in the company's base currency.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use crate::auth::{CompanyContext, Permission};
use crate::dtos::{DashboardParams, ReportParams, ReportResponse};
use crate::ledger::report::{
    dashboard, monthly_summary, profit_and_loss, DashboardSummary, MonthlySummary, ProfitAndLoss,
    ReportKind,
};
use crate::startup::AppState;

/// The company's rate-one currency, or the configured default.
async fn report_currency(state: &AppState, company_id: Uuid) -> Result<String, AppError> {
    Ok(state
        .db
        .base_currency_code(company_id)
        .await?
        .unwrap_or_else(|| state.config.base_currency.clone()))
}

/// GET /reports/profit-loss
pub async fn profit_loss(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(params): Query<ReportParams>,
) -> Result<Json<ReportResponse<ProfitAndLoss>>, AppError> {
    ctx.require(Permission::ReadReports)?;
    let range = params.range()?;
    let entries = state.db.report_entries(ctx.company_id, range).await?;
    Ok(Json(ReportResponse {
        currency_code: report_currency(&state, ctx.company_id).await?,
        report: profit_and_loss(&entries, range)?,
    }))
}

async fn summary(
    state: AppState,
    ctx: CompanyContext,
    params: ReportParams,
    kind: ReportKind,
) -> Result<Json<ReportResponse<MonthlySummary>>, AppError> {
    ctx.require(Permission::ReadReports)?;
    let range = params.range()?;
    let entries = state.db.report_entries(ctx.company_id, range).await?;
    Ok(Json(ReportResponse {
        currency_code: report_currency(&state, ctx.company_id).await?,
        report: monthly_summary(&entries, kind, range)?,
    }))
}

/// GET /reports/income-summary
pub async fn income_summary(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(params): Query<ReportParams>,
) -> Result<Json<ReportResponse<MonthlySummary>>, AppError> {
    summary(state, ctx, params, ReportKind::Income).await
}

/// GET /reports/expense-summary
pub async fn expense_summary(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(params): Query<ReportParams>,
) -> Result<Json<ReportResponse<MonthlySummary>>, AppError> {
    summary(state, ctx, params, ReportKind::Expense).await
}

/// GET /reports/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(params): Query<DashboardParams>,
) -> Result<Json<ReportResponse<DashboardSummary>>, AppError> {
    ctx.require(Permission::ReadReports)?;
    let range = params.range(Utc::now().date_naive())?;
    let entries = state.db.report_entries(ctx.company_id, range).await?;
    let open = state.db.open_documents(ctx.company_id).await?;
    Ok(Json(ReportResponse {
        currency_code: report_currency(&state, ctx.company_id).await?,
        report: dashboard(&entries, range, &open)?,
    }))
}
