//! Public storefront handlers
//!
//! Unauthenticated: catalog browsing by share token, self-checkout and the
//! tracking page reached from a quotation's tracking code.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::ListWithBundles;

use crate::error::AppResult;
use crate::services::list::CatalogQuery;
use crate::services::quotation::{CheckoutInput, TrackingView};
use crate::services::{ListService, QuotationService};
use crate::AppState;

pub async fn get_public_catalog(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<ListWithBundles>> {
    let catalog = ListService::new(&state).public_catalog(&token, query).await?;
    Ok(Json(catalog))
}

pub async fn checkout(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(input): Json<CheckoutInput>,
) -> AppResult<impl IntoResponse> {
    let quotation = QuotationService::new(&state).checkout(&token, input).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

pub async fn track_quotation(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<TrackingView>> {
    let view = QuotationService::new(&state).track(&code).await?;
    Ok(Json(view))
}
