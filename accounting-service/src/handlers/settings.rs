//! Categories and taxes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use super::not_found;
use crate::auth::{Access, CompanyContext};
use crate::dtos::{
    CreateCategoryRequest, CreateTaxRequest, ListCategoriesParams, UpdateCategoryRequest,
    UpdateTaxRequest,
};
use crate::ledger::money::check_storable;
use crate::ledger::LedgerError;
use crate::models::{Category, Tax};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

fn check_tax_rate(rate: Decimal) -> Result<(), LedgerError> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(LedgerError::validation("rate", "tax rate must not be negative"));
    }
    check_storable("rate", rate)?;
    Ok(())
}

// ============================================================================
// Categories
// ============================================================================

/// POST /categories
pub async fn create_category(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    ctx.require(Access::Create.settings())?;
    let category = state
        .db
        .create_category(&req.into_model(ctx.company_id))
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /categories
pub async fn list_categories(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(params): Query<ListCategoriesParams>,
) -> Result<Json<Vec<Category>>, AppError> {
    ctx.require(Access::Read.settings())?;
    Ok(Json(
        state
            .db
            .list_categories(ctx.company_id, params.category_type)
            .await?,
    ))
}

/// GET /categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Category>, AppError> {
    ctx.require(Access::Read.settings())?;
    state
        .db
        .get_category(ctx.company_id, category_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Category"))
}

/// PATCH /categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(category_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    ctx.require(Access::Update.settings())?;
    state
        .db
        .update_category(ctx.company_id, category_id, &req.into())
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Category"))
}

/// DELETE /categories/:id
pub async fn delete_category(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require(Access::Delete.settings())?;
    if state.db.delete_category(ctx.company_id, category_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Category"))
    }
}

// ============================================================================
// Taxes
// ============================================================================

/// POST /taxes
pub async fn create_tax(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateTaxRequest>,
) -> Result<(StatusCode, Json<Tax>), AppError> {
    ctx.require(Access::Create.settings())?;
    check_tax_rate(req.rate)?;
    let tax = state.db.create_tax(&req.into_model(ctx.company_id)).await?;
    Ok((StatusCode::CREATED, Json(tax)))
}

/// GET /taxes
pub async fn list_taxes(
    State(state): State<AppState>,
    ctx: CompanyContext,
) -> Result<Json<Vec<Tax>>, AppError> {
    ctx.require(Access::Read.settings())?;
    Ok(Json(state.db.list_taxes(ctx.company_id).await?))
}

/// GET /taxes/:id
pub async fn get_tax(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(tax_id): Path<Uuid>,
) -> Result<Json<Tax>, AppError> {
    ctx.require(Access::Read.settings())?;
    state
        .db
        .get_tax(ctx.company_id, tax_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Tax"))
}

/// PATCH /taxes/:id
///
/// Documents and transactions keep the rate they were written with.
pub async fn update_tax(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(tax_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTaxRequest>,
) -> Result<Json<Tax>, AppError> {
    ctx.require(Access::Update.settings())?;
    if let Some(rate) = req.rate {
        check_tax_rate(rate)?;
    }
    state
        .db
        .update_tax(ctx.company_id, tax_id, &req.into())
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Tax"))
}

/// DELETE /taxes/:id
pub async fn delete_tax(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(tax_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require(Access::Delete.settings())?;
    if state.db.delete_tax(ctx.company_id, tax_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Tax"))
    }
}
