//! Customers, vendors and employees.
//!
//! Customers are guarded by the sales permissions, everyone else by the
//! purchases permissions, so most handlers load the record before checking.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use super::not_found;
use crate::auth::{Access, CompanyContext};
use crate::dtos::{CreateContactRequest, ListContactsParams, ListResponse, UpdateContactRequest};
use crate::models::{Contact, ContactType};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

fn is_customer(contact_type: ContactType) -> bool {
    contact_type == ContactType::Customer
}

async fn load_contact(
    state: &AppState,
    ctx: &CompanyContext,
    contact_id: Uuid,
    access: Access,
) -> Result<Contact, AppError> {
    let contact = state
        .db
        .get_contact(ctx.company_id, contact_id)
        .await?
        .ok_or_else(|| not_found("Contact"))?;
    let kind = ContactType::from_string(&contact.contact_type);
    ctx.require(access.contacts(is_customer(kind)))?;
    Ok(contact)
}

/// POST /contacts
pub async fn create_contact(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateContactRequest>,
) -> Result<(StatusCode, Json<Contact>), AppError> {
    ctx.require(Access::Create.contacts(is_customer(req.contact_type)))?;
    let contact = state
        .db
        .create_contact(&req.into_model(ctx.company_id))
        .await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// GET /contacts
///
/// Without a `contact_type` filter the caller needs read access to both
/// families.
pub async fn list_contacts(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Query(params): Query<ListContactsParams>,
) -> Result<Json<ListResponse<Contact>>, AppError> {
    let (filter, page) = params.split();
    match filter.contact_type {
        Some(kind) => ctx.require(Access::Read.contacts(is_customer(kind)))?,
        None => {
            ctx.require(Access::Read.contacts(true))?;
            ctx.require(Access::Read.contacts(false))?;
        }
    }

    let paging = page.paging();
    let (contacts, total) = state
        .db
        .list_contacts(ctx.company_id, &filter, paging)
        .await?;
    Ok(Json(ListResponse::new(contacts, total, paging)))
}

/// GET /contacts/:id
pub async fn get_contact(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(contact_id): Path<Uuid>,
) -> Result<Json<Contact>, AppError> {
    load_contact(&state, &ctx, contact_id, Access::Read)
        .await
        .map(Json)
}

/// PATCH /contacts/:id
pub async fn update_contact(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(contact_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateContactRequest>,
) -> Result<Json<Contact>, AppError> {
    load_contact(&state, &ctx, contact_id, Access::Update).await?;
    state
        .db
        .update_contact(ctx.company_id, contact_id, &req.into())
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Contact"))
}

/// DELETE /contacts/:id
pub async fn delete_contact(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(contact_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    load_contact(&state, &ctx, contact_id, Access::Delete).await?;
    if state.db.delete_contact(ctx.company_id, contact_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Contact"))
    }
}
