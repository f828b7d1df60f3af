//! Supplier and purchase order HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::{PaginatedResponse, Pagination, PurchaseOrder, Supplier};
use uuid::Uuid;

use crate::error::AppResult;
use crate::repository::PurchaseOrderFilter;
use crate::services::purchase_order::{AdvanceInput, CreatePurchaseOrderInput};
use crate::services::supplier::CreateSupplierInput;
use crate::services::{PurchaseOrderService, SupplierService};
use crate::AppState;

pub async fn list_suppliers(State(state): State<AppState>) -> AppResult<Json<Vec<Supplier>>> {
    let suppliers = SupplierService::new(&state).list().await?;
    Ok(Json(suppliers))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let supplier = SupplierService::new(&state).get(supplier_id).await?;
    Ok(Json(supplier))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<impl IntoResponse> {
    let supplier = SupplierService::new(&state).create(input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// List purchase orders filtered by state and supplier
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(filter): Query<PurchaseOrderFilter>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<PaginatedResponse<PurchaseOrder>>> {
    let page = PurchaseOrderService::new(&state)
        .list(filter, pagination)
        .await?;
    Ok(Json(page))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    let order = PurchaseOrderService::new(&state).get(order_id).await?;
    Ok(Json(order))
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<impl IntoResponse> {
    let order = PurchaseOrderService::new(&state).create(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Advance an order to its next state
pub async fn advance_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<AdvanceInput>,
) -> AppResult<Json<PurchaseOrder>> {
    let order = PurchaseOrderService::new(&state)
        .advance(order_id, input.target)
        .await?;
    Ok(Json(order))
}
