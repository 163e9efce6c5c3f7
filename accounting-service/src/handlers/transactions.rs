//! Income, expense and payment transactions, plus transfers.

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
    CreateTransactionRequest, CreateTransferRequest, ListResponse, ListTransactionsParams,
    TransactionResponse, TransferResponse, UpdateTransactionRequest,
};
use crate::models::Transaction;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

/// POST /transactions
pub async fn create_transaction(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    ctx.require(Permission::CreateBankingTransactions)?;
    let (transaction, taxes) = state
        .db
        .create_transaction(&req.into_model(ctx.company_id))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse::new(transaction, taxes)),
    ))
}

/// GET /transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(params): Query<ListTransactionsParams>,
) -> Result<Json<ListResponse<Transaction>>, AppError> {
    ctx.require(Permission::ReadBankingTransactions)?;
    let (filter, page) = params.split();
    let paging = page.paging();
    let (transactions, total) = state
        .db
        .list_transactions(ctx.company_id, &filter, paging)
        .await?;
    Ok(Json(ListResponse::new(transactions, total, paging)))
}

/// GET /transactions/:id
pub async fn get_transaction(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    ctx.require(Permission::ReadBankingTransactions)?;
    let transaction = state
        .db
        .get_transaction(ctx.company_id, transaction_id)
        .await?
        .ok_or_else(|| not_found("Transaction"))?;
    let taxes = state
        .db
        .list_transaction_taxes(ctx.company_id, transaction_id)
        .await?;
    Ok(Json(TransactionResponse::new(transaction, taxes)))
}

/// PATCH /transactions/:id
pub async fn update_transaction(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(transaction_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTransactionRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    ctx.require(Permission::UpdateBankingTransactions)?;
    let transaction = state
        .db
        .update_transaction(ctx.company_id, transaction_id, &req.into())
        .await?
        .ok_or_else(|| not_found("Transaction"))?;
    let taxes = state
        .db
        .list_transaction_taxes(ctx.company_id, transaction_id)
        .await?;
    Ok(Json(TransactionResponse::new(transaction, taxes)))
}

/// DELETE /transactions/:id
pub async fn delete_transaction(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(transaction_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require(Permission::DeleteBankingTransactions)?;
    if state
        .db
        .delete_transaction(ctx.company_id, transaction_id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Transaction"))
    }
}

/// POST /transfers
pub async fn create_transfer(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateTransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>), AppError> {
    ctx.require(Permission::CreateBankingTransactions)?;
    let (transfer, outgoing, incoming) = state
        .db
        .create_transfer(&req.into_model(ctx.company_id))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TransferResponse {
            transfer,
            outgoing,
            incoming,
        }),
    ))
}
