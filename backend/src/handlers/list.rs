//! List HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{CatalogList, ListWithBundles};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::list::{AddBundleInput, CreateListInput, PublishedList};
use crate::services::ListService;
use crate::AppState;

pub async fn list_lists(State(state): State<AppState>) -> AppResult<Json<Vec<CatalogList>>> {
    let lists = ListService::new(&state).list().await?;
    Ok(Json(lists))
}

pub async fn get_list(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<ListWithBundles>> {
    let list = ListService::new(&state).get(list_id).await?;
    Ok(Json(list))
}

pub async fn create_list(
    State(state): State<AppState>,
    Json(input): Json<CreateListInput>,
) -> AppResult<impl IntoResponse> {
    let list = ListService::new(&state).create(input).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn add_list_bundle(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
    Json(input): Json<AddBundleInput>,
) -> AppResult<Json<CatalogList>> {
    let list = ListService::new(&state)
        .add_bundle(list_id, input.bundle_id)
        .await?;
    Ok(Json(list))
}

pub async fn remove_list_bundle(
    State(state): State<AppState>,
    Path((list_id, bundle_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<CatalogList>> {
    let list = ListService::new(&state)
        .remove_bundle(list_id, bundle_id)
        .await?;
    Ok(Json(list))
}

pub async fn activate_list(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<CatalogList>> {
    let list = ListService::new(&state).set_active(list_id, true).await?;
    Ok(Json(list))
}

pub async fn deactivate_list(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<CatalogList>> {
    let list = ListService::new(&state).set_active(list_id, false).await?;
    Ok(Json(list))
}

/// Publish a list, returning its share token
pub async fn publish_list(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<PublishedList>> {
    let published = ListService::new(&state).publish(list_id).await?;
    Ok(Json(published))
}
