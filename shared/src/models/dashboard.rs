//! Dashboard KPI models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Quotation;

/// Headline figures for the back-office dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiSnapshot {
    /// Bundles currently Available
    #[serde(rename = "stock_disponible")]
    pub available_stock: u64,
    /// Reserved quotations whose window closes soon
    #[serde(rename = "reservas_por_vencer")]
    pub expiring_reservations: u64,
    /// Payments recorded during the current day
    #[serde(rename = "ventas_del_dia")]
    pub sales_today: Decimal,
    /// Total outstanding supplier debt
    #[serde(rename = "deuda_proveedor")]
    pub supplier_debt: Decimal,
}

/// Summary handed to the warehouse with a dispatched batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchManifest {
    #[serde(rename = "proforma_ids")]
    pub quotation_ids: Vec<Uuid>,
    #[serde(rename = "total_proformas")]
    pub quotation_count: u32,
    #[serde(rename = "total_items")]
    pub item_count: u32,
    #[serde(rename = "valor_total")]
    pub total_amount: Decimal,
    #[serde(rename = "fecha_despacho")]
    pub dispatched_at: DateTime<Utc>,
    #[serde(rename = "proformas")]
    pub quotations: Vec<Quotation>,
}

impl DispatchManifest {
    pub fn new(quotations: Vec<Quotation>, dispatched_at: DateTime<Utc>) -> Self {
        Self {
            quotation_ids: quotations.iter().map(|q| q.id).collect(),
            quotation_count: quotations.len() as u32,
            item_count: quotations.iter().map(|q| q.lines.len() as u32).sum(),
            total_amount: quotations.iter().map(|q| q.total).sum(),
            dispatched_at,
            quotations,
        }
    }
}
