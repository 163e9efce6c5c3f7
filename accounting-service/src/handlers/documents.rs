//! Invoices and bills: drafting, status changes, payments and history.
//!
//! Invoices are guarded by the sales permissions and bills by the purchases
//! permissions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::not_found;
use crate::auth::{Access, CompanyContext, Permission};
use crate::dtos::{
    CreateDocumentRequest, DocumentResponse, ListDocumentsParams, ListResponse, PaymentRequest,
    PaymentResponse, TransitionRequest, UpdateDocumentRequest, VerifyResponse,
};
use crate::ledger::report::Side;
use crate::ledger::status::DocumentAction;
use crate::models::{Document, DocumentHistory, DocumentType};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

fn is_receivable(kind: DocumentType) -> bool {
    kind.side() == Side::Receivable
}

async fn load_document(
    state: &AppState,
    ctx: &CompanyContext,
    document_id: Uuid,
    access: Access,
) -> Result<Document, AppError> {
    let document = state
        .db
        .get_document(ctx.company_id, document_id)
        .await?
        .ok_or_else(|| not_found("Document"))?;
    ctx.require(access.documents(is_receivable(document.kind())))?;
    Ok(document)
}

/// POST /documents
pub async fn create_document(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    ctx.require(Access::Create.documents(is_receivable(req.document_type)))?;
    let detail = state
        .db
        .create_document(&req.into_model(ctx.company_id))
        .await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

/// GET /documents
pub async fn list_documents(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(params): Query<ListDocumentsParams>,
) -> Result<Json<ListResponse<Document>>, AppError> {
    let (filter, page) = params.split();
    match filter.document_type {
        Some(kind) => ctx.require(Access::Read.documents(is_receivable(kind)))?,
        None => {
            ctx.require(Access::Read.documents(true))?;
            ctx.require(Access::Read.documents(false))?;
        }
    }

    let paging = page.paging();
    let (documents, total) = state
        .db
        .list_documents(ctx.company_id, &filter, paging)
        .await?;
    Ok(Json(ListResponse::new(documents, total, paging)))
}

/// GET /documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    load_document(&state, &ctx, document_id, Access::Read).await?;
    state
        .db
        .get_document_detail(ctx.company_id, document_id)
        .await?
        .map(|detail| Json(detail.into()))
        .ok_or_else(|| not_found("Document"))
}

/// PUT /documents/:id
///
/// Drafts only.
pub async fn update_document(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    load_document(&state, &ctx, document_id, Access::Update).await?;
    state
        .db
        .update_document(ctx.company_id, document_id, &req.into())
        .await?
        .map(|detail| Json(detail.into()))
        .ok_or_else(|| not_found("Document"))
}

/// DELETE /documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_document(&state, &ctx, document_id, Access::Delete).await?;
    if state.db.delete_document(ctx.company_id, document_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Document"))
    }
}

async fn transition(
    state: AppState,
    ctx: CompanyContext,
    document_id: Uuid,
    action: DocumentAction,
    req: Option<ValidatedJson<TransitionRequest>>,
) -> Result<Json<Document>, AppError> {
    load_document(&state, &ctx, document_id, Access::Update).await?;
    let description = req.and_then(|ValidatedJson(r)| r.description);
    state
        .db
        .transition_document(ctx.company_id, document_id, action, description.as_deref())
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Document"))
}

/// POST /documents/:id/send
pub async fn send_document(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
    req: Option<ValidatedJson<TransitionRequest>>,
) -> Result<Json<Document>, AppError> {
    transition(state, ctx, document_id, DocumentAction::Send, req).await
}

/// POST /documents/:id/view
pub async fn mark_document_viewed(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
    req: Option<ValidatedJson<TransitionRequest>>,
) -> Result<Json<Document>, AppError> {
    transition(state, ctx, document_id, DocumentAction::MarkViewed, req).await
}

/// POST /documents/:id/approve
pub async fn approve_document(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
    req: Option<ValidatedJson<TransitionRequest>>,
) -> Result<Json<Document>, AppError> {
    transition(state, ctx, document_id, DocumentAction::Approve, req).await
}

/// POST /documents/:id/overdue
pub async fn mark_document_overdue(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
    req: Option<ValidatedJson<TransitionRequest>>,
) -> Result<Json<Document>, AppError> {
    transition(state, ctx, document_id, DocumentAction::MarkOverdue, req).await
}

/// POST /documents/:id/cancel
pub async fn cancel_document(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
    req: Option<ValidatedJson<TransitionRequest>>,
) -> Result<Json<Document>, AppError> {
    transition(state, ctx, document_id, DocumentAction::Cancel, req).await
}

/// POST /documents/:id/payments
///
/// Books an income (invoice) or payment (bill) transaction on the account
/// and moves the document to partial or paid.
pub async fn record_payment(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    load_document(&state, &ctx, document_id, Access::Update).await?;
    ctx.require(Permission::CreateBankingTransactions)?;

    let (document, transaction) = state
        .db
        .record_payment(ctx.company_id, document_id, &req.into())
        .await?
        .ok_or_else(|| not_found("Document"))?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            document,
            transaction,
        }),
    ))
}

/// GET /documents/:id/history
pub async fn list_document_history(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Vec<DocumentHistory>>, AppError> {
    load_document(&state, &ctx, document_id, Access::Read).await?;
    Ok(Json(
        state
            .db
            .list_document_history(ctx.company_id, document_id)
            .await?,
    ))
}

/// GET /documents/:id/verify
///
/// A stored amount that disagrees with the recomputed totals is reported as
/// an internal error.
pub async fn verify_document(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(document_id): Path<Uuid>,
) -> Result<Json<VerifyResponse>, AppError> {
    load_document(&state, &ctx, document_id, Access::Read).await?;
    let calculation = state
        .db
        .verify_document(ctx.company_id, document_id)
        .await?
        .ok_or_else(|| not_found("Document"))?;
    Ok(Json(VerifyResponse {
        document_id,
        calculation,
    }))
}
