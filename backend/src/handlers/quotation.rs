//! Quotation and payment HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use shared::{DispatchManifest, LedgerSummary, PaginatedResponse, Pagination, Quotation, QuotationTotals};
use uuid::Uuid;

use crate::error::AppResult;
use crate::repository::QuotationFilter;
use crate::services::payment::{PaymentReceipt, RecordPaymentInput};
use crate::services::quotation::{
    DispatchInput, IssueQuotationInput, PreviewInput, ReviseQuotationInput,
};
use crate::services::{PaymentService, QuotationService};
use crate::AppState;

#[derive(Serialize)]
pub struct ExpireResponse {
    #[serde(rename = "vencida")]
    pub expired: bool,
}

#[derive(Serialize)]
pub struct SweepResponse {
    #[serde(rename = "vencidas")]
    pub expired: usize,
}

/// List quotations filtered by state, list or search text
pub async fn list_quotations(
    State(state): State<AppState>,
    Query(filter): Query<QuotationFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Quotation>>> {
    let page = QuotationService::new(&state).list(filter, pagination).await?;
    Ok(Json(page))
}

pub async fn get_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> AppResult<Json<Quotation>> {
    let quotation = QuotationService::new(&state).get(quotation_id).await?;
    Ok(Json(quotation))
}

pub async fn issue_quotation(
    State(state): State<AppState>,
    Json(input): Json<IssueQuotationInput>,
) -> AppResult<impl IntoResponse> {
    let quotation = QuotationService::new(&state).issue(input).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

/// Price lines without saving anything
pub async fn preview_quotation(
    State(state): State<AppState>,
    Json(input): Json<PreviewInput>,
) -> AppResult<Json<QuotationTotals>> {
    let totals = QuotationService::new(&state).preview(input)?;
    Ok(Json(totals))
}

pub async fn revise_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
    Json(input): Json<ReviseQuotationInput>,
) -> AppResult<Json<Quotation>> {
    let quotation = QuotationService::new(&state)
        .revise(quotation_id, input)
        .await?;
    Ok(Json(quotation))
}

pub async fn reserve_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> AppResult<Json<Quotation>> {
    let quotation = QuotationService::new(&state).reserve(quotation_id).await?;
    Ok(Json(quotation))
}

pub async fn expire_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> AppResult<Json<ExpireResponse>> {
    let expired = QuotationService::new(&state).expire(quotation_id).await?;
    Ok(Json(ExpireResponse { expired }))
}

/// Run the expiry sweep immediately
pub async fn sweep_quotations(State(state): State<AppState>) -> AppResult<Json<SweepResponse>> {
    let expired = QuotationService::new(&state).sweep_expired().await?;
    Ok(Json(SweepResponse { expired }))
}

pub async fn dispatch_quotations(
    State(state): State<AppState>,
    Json(input): Json<DispatchInput>,
) -> AppResult<Json<DispatchManifest>> {
    let manifest = QuotationService::new(&state)
        .dispatch(&input.quotation_ids)
        .await?;
    Ok(Json(manifest))
}

pub async fn delete_quotation(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    QuotationService::new(&state).delete(quotation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
    Json(input): Json<RecordPaymentInput>,
) -> AppResult<impl IntoResponse> {
    let receipt: PaymentReceipt = PaymentService::new(&state)
        .record_payment(quotation_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Payment ledger of one quotation
pub async fn get_ledger(
    State(state): State<AppState>,
    Path(quotation_id): Path<Uuid>,
) -> AppResult<Json<LedgerSummary>> {
    let summary = PaymentService::new(&state).ledger(quotation_id).await?;
    Ok(Json(summary))
}
