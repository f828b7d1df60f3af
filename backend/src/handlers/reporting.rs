//! Debt report and dashboard handlers

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{DebtReport, KpiSnapshot, SupplierDebt};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::debt::SetDebtInput;
use crate::services::{DashboardService, DebtService};
use crate::AppState;

pub async fn get_debt_report(State(state): State<AppState>) -> AppResult<Json<DebtReport>> {
    let report = DebtService::new(&state).report().await?;
    Ok(Json(report))
}

/// Set a supplier's outstanding figure as reported by accounting
pub async fn set_supplier_debt(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<SetDebtInput>,
) -> AppResult<Json<SupplierDebt>> {
    let entry = DebtService::new(&state).set_debt(supplier_id, input).await?;
    Ok(Json(entry))
}

pub async fn get_dashboard(State(state): State<AppState>) -> AppResult<Json<KpiSnapshot>> {
    let kpis = DashboardService::new(&state).kpis().await?;
    Ok(Json(kpis))
}
