//! Purchase order service
//!
//! Orders only ever move one step forward: Created, InTransit, Received,
//! Closed. They are never deleted.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{PaginatedResponse, Pagination, PurchaseOrder, PurchaseOrderState};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repository::{PurchaseOrderFilter, Repositories};
use crate::AppState;

#[derive(Clone)]
pub struct PurchaseOrderService {
    state: AppState,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderInput {
    #[serde(rename = "proveedor_id")]
    pub supplier_id: Uuid,
    #[serde(rename = "fecha_entrega_estimada", default)]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceInput {
    #[serde(rename = "estado")]
    pub target: PurchaseOrderState,
}

impl PurchaseOrderService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    fn repos(&self) -> &Repositories {
        &self.state.repos
    }

    pub async fn create(&self, input: CreatePurchaseOrderInput) -> AppResult<PurchaseOrder> {
        let supplier = self
            .repos()
            .suppliers
            .get(input.supplier_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        if !supplier.active {
            return Err(AppError::validation(
                "proveedor_id",
                "Supplier is inactive",
                "El proveedor está inactivo",
            ));
        }

        let now = self.state.clock.now();
        let order = self
            .repos()
            .purchase_orders
            .insert(PurchaseOrder {
                id: Uuid::new_v4(),
                supplier_id: supplier.id,
                ordered_at: now,
                estimated_delivery: input.estimated_delivery,
                state: PurchaseOrderState::Created,
                notes: input.notes,
                bundle_count: 0,
                created_at: now,
            })
            .await?;

        tracing::info!("Created purchase order {} for {}", order.id, supplier.name);
        Ok(order)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PurchaseOrder> {
        self.repos()
            .purchase_orders
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
    }

    pub async fn list(
        &self,
        filter: PurchaseOrderFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<PurchaseOrder>> {
        let orders = self.repos().purchase_orders.list(&filter).await?;
        Ok(PaginatedResponse::from_items(orders, pagination))
    }

    /// Move an order to its immediate successor
    pub async fn advance(&self, id: Uuid, target: PurchaseOrderState) -> AppResult<PurchaseOrder> {
        let _guard = self.state.locks.lock(id).await;
        let order = self.get(id).await?;

        if !order.state.can_transition_to(target) {
            return Err(AppError::invalid_transition(
                id,
                format!("purchase order cannot move from {} to {}", order.state, target),
            ));
        }

        if !self
            .repos()
            .purchase_orders
            .update_state(id, order.state, target)
            .await?
        {
            return Err(AppError::stale("purchase order"));
        }

        tracing::info!("Purchase order {} moved {} -> {}", id, order.state, target);
        self.get(id).await
    }
}
