//! Bank and cash accounts, and their derived balance.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::not_found;
use crate::auth::{CompanyContext, Permission};
use crate::dtos::{
    AccountBalanceResponse, CreateAccountRequest, ListResponse, PageParams, UpdateAccountRequest,
};
use crate::ledger::balance::{account_balance, Posting};
use crate::ledger::money::format_amount;
use crate::models::{Account, FlowRow};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

/// POST /accounts
pub async fn create_account(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), AppError> {
    ctx.require(Permission::CreateBankingAccounts)?;
    let account = state
        .db
        .create_account(&req.into_model(ctx.company_id))
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(page): Query<PageParams>,
) -> Result<Json<ListResponse<Account>>, AppError> {
    ctx.require(Permission::ReadBankingAccounts)?;
    let paging = page.paging();
    let (accounts, total) = state.db.list_accounts(ctx.company_id, paging).await?;
    Ok(Json(ListResponse::new(accounts, total, paging)))
}

/// GET /accounts/:id
pub async fn get_account(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Account>, AppError> {
    ctx.require(Permission::ReadBankingAccounts)?;
    state
        .db
        .get_account(ctx.company_id, account_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Account"))
}

/// PATCH /accounts/:id
pub async fn update_account(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(account_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    ctx.require(Permission::UpdateBankingAccounts)?;
    state
        .db
        .update_account(ctx.company_id, account_id, &req.into())
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Account"))
}

/// DELETE /accounts/:id
pub async fn delete_account(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require(Permission::DeleteBankingAccounts)?;
    if state.db.delete_account(ctx.company_id, account_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Account"))
    }
}

/// GET /accounts/:id/balance
///
/// Recomputed from the opening balance and every live transaction on each
/// call.
pub async fn get_account_balance(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountBalanceResponse>, AppError> {
    ctx.require(Permission::ReadBankingAccounts)?;

    let account = state
        .db
        .get_account(ctx.company_id, account_id)
        .await?
        .ok_or_else(|| not_found("Account"))?;

    let rows = state.db.account_flows(ctx.company_id, account_id).await?;
    let postings = rows
        .iter()
        .map(FlowRow::posting)
        .collect::<Result<Vec<Posting>, _>>()?;

    let book = state.db.currency_book(ctx.company_id).await?;
    let balance = account_balance(
        account.opening_balance,
        &account.currency_code,
        &postings,
        &book,
    )?;
    let formatted = format_amount(balance.balance, &book.get(&account.currency_code)?.format);

    Ok(Json(AccountBalanceResponse {
        account_id,
        balance,
        formatted,
    }))
}
