use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use super::not_found;
use crate::auth::{CompanyContext, Permission};
use crate::dtos::{CreateItemRequest, ListResponse, PageParams, UpdateItemRequest};
use crate::ledger::money::check_storable;
use crate::ledger::LedgerError;
use crate::models::Item;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

fn check_price(field: &str, price: Option<Decimal>) -> Result<(), LedgerError> {
    match price {
        Some(p) if p.is_sign_negative() && !p.is_zero() => Err(LedgerError::validation(
            field,
            "price must not be negative",
        )),
        Some(p) => check_storable(field, p).map(|_| ()),
        None => Ok(()),
    }
}

/// POST /items
pub async fn create_item(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    ctx.require(Permission::CreateItems)?;
    check_price("sale_price", Some(req.sale_price))?;
    check_price("purchase_price", Some(req.purchase_price))?;

    let item = state.db.create_item(&req.into_model(ctx.company_id)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /items
pub async fn list_items(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(page): Query<PageParams>,
) -> Result<Json<ListResponse<Item>>, AppError> {
    ctx.require(Permission::ReadItems)?;
    let paging = page.paging();
    let (items, total) = state.db.list_items(ctx.company_id, paging).await?;
    Ok(Json(ListResponse::new(items, total, paging)))
}

/// GET /items/:id
pub async fn get_item(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(item_id): Path<Uuid>,
) -> Result<Json<Item>, AppError> {
    ctx.require(Permission::ReadItems)?;
    state
        .db
        .get_item(ctx.company_id, item_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Item"))
}

/// PATCH /items/:id
pub async fn update_item(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(item_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateItemRequest>,
) -> Result<Json<Item>, AppError> {
    ctx.require(Permission::UpdateItems)?;
    check_price("sale_price", req.sale_price)?;
    check_price("purchase_price", req.purchase_price)?;

    state
        .db
        .update_item(ctx.company_id, item_id, &req.into())
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Item"))
}

/// DELETE /items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require(Permission::DeleteItems)?;
    if state.db.delete_item(ctx.company_id, item_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Item"))
    }
}
