//! Bundle HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{Bundle, PaginatedResponse, Pagination};
use uuid::Uuid;

use crate::error::AppResult;
use crate::repository::BundleFilter;
use crate::services::bundle::{ReceiveBundleInput, UpdateBundleInput};
use crate::services::BundleService;
use crate::AppState;

pub async fn list_bundles(
    State(state): State<AppState>,
    Query(filter): Query<BundleFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<Bundle>>> {
    let page = BundleService::new(&state).list(filter, pagination).await?;
    Ok(Json(page))
}

pub async fn get_bundle(
    State(state): State<AppState>,
    Path(bundle_id): Path<Uuid>,
) -> AppResult<Json<Bundle>> {
    let bundle = BundleService::new(&state).get(bundle_id).await?;
    Ok(Json(bundle))
}

/// Look up a bundle from its printed tag
pub async fn get_bundle_by_scan_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<Bundle>> {
    let bundle = BundleService::new(&state).get_by_scan_code(&code).await?;
    Ok(Json(bundle))
}

pub async fn receive_bundle(
    State(state): State<AppState>,
    Json(input): Json<ReceiveBundleInput>,
) -> AppResult<impl IntoResponse> {
    let bundle = BundleService::new(&state).receive(input).await?;
    Ok((StatusCode::CREATED, Json(bundle)))
}

pub async fn update_bundle(
    State(state): State<AppState>,
    Path(bundle_id): Path<Uuid>,
    Json(input): Json<UpdateBundleInput>,
) -> AppResult<Json<Bundle>> {
    let bundle = BundleService::new(&state).update(bundle_id, input).await?;
    Ok(Json(bundle))
}

pub async fn tag_bundle(
    State(state): State<AppState>,
    Path(bundle_id): Path<Uuid>,
) -> AppResult<Json<Bundle>> {
    let bundle = BundleService::new(&state).tag(bundle_id).await?;
    Ok(Json(bundle))
}
