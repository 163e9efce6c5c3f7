use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use super::not_found;
use crate::auth::{Access, CompanyContext};
use crate::dtos::{CreateCurrencyRequest, UpdateCurrencyRequest};
use crate::ledger::money::CurrencyFormat;
use crate::ledger::LedgerError;
use crate::models::{Currency, UpdateCurrency};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

fn check_rate(rate: Decimal) -> Result<(), LedgerError> {
    if rate <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "rate",
            "rate must be greater than zero",
        ));
    }
    Ok(())
}

/// Display rules after applying an update on top of the stored ones.
fn merged_format(current: &Currency, update: &UpdateCurrency) -> CurrencyFormat {
    let mut format = current.format();
    if let Some(precision) = update.precision {
        format.precision = precision;
    }
    if let Some(ref symbol) = update.symbol {
        format.symbol = symbol.clone();
    }
    if let Some(symbol_first) = update.symbol_first {
        format.symbol_first = symbol_first;
    }
    if let Some(ref mark) = update.decimal_mark {
        format.decimal_mark = mark.clone();
    }
    if let Some(ref separator) = update.thousands_separator {
        format.thousands_separator = separator.clone();
    }
    format
}

/// POST /currencies
pub async fn create_currency(
    State(state): State<AppState>,
    ctx: CompanyContext,
    ValidatedJson(req): ValidatedJson<CreateCurrencyRequest>,
) -> Result<(StatusCode, Json<Currency>), AppError> {
    ctx.require(Access::Create.settings())?;

    let input = req.into_model(ctx.company_id);
    check_rate(input.rate)?;
    CurrencyFormat {
        code: input.code.clone(),
        precision: input.precision,
        symbol: input.symbol.clone(),
        symbol_first: input.symbol_first,
        decimal_mark: input.decimal_mark.clone(),
        thousands_separator: input.thousands_separator.clone(),
    }
    .validate()?;

    let currency = state.db.create_currency(&input).await?;

    Ok((StatusCode::CREATED, Json(currency)))
}

/// GET /currencies
pub async fn list_currencies(
    State(state): State<AppState>,
    ctx: CompanyContext,
) -> Result<Json<Vec<Currency>>, AppError> {
    ctx.require(Access::Read.settings())?;
    Ok(Json(state.db.list_currencies(ctx.company_id).await?))
}

/// GET /currencies/:id
pub async fn get_currency(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(currency_id): Path<Uuid>,
) -> Result<Json<Currency>, AppError> {
    ctx.require(Access::Read.settings())?;
    state
        .db
        .get_currency(ctx.company_id, currency_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Currency"))
}

/// PATCH /currencies/:id
///
/// A new rate applies to documents and transactions written from now on.
/// Precision is fixed once a document uses the currency.
pub async fn update_currency(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(currency_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCurrencyRequest>,
) -> Result<Json<Currency>, AppError> {
    ctx.require(Access::Update.settings())?;

    let update = UpdateCurrency::from(req);
    if let Some(rate) = update.rate {
        check_rate(rate)?;
    }

    let current = state
        .db
        .get_currency(ctx.company_id, currency_id)
        .await?
        .ok_or_else(|| not_found("Currency"))?;
    merged_format(&current, &update).validate()?;

    state
        .db
        .update_currency(ctx.company_id, currency_id, &update)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Currency"))
}

/// DELETE /currencies/:id
pub async fn delete_currency(
    State(state): State<AppState>,
    ctx: CompanyContext,
    Path(currency_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ctx.require(Access::Delete.settings())?;
    if state.db.delete_currency(ctx.company_id, currency_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Currency"))
    }
}
