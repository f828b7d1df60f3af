//! Supplier debt reconciliation models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Debt above this amount is at least High
pub const HIGH_DEBT_THRESHOLD: i64 = 5_000;

/// Debt above this amount is Critical
pub const CRITICAL_DEBT_THRESHOLD: i64 = 10_000;

/// Severity of a supplier's outstanding debt
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebtLevel {
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "ALTO")]
    High,
    #[serde(rename = "CRITICO")]
    Critical,
}

impl DebtLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtLevel::Normal => "NORMAL",
            DebtLevel::High => "ALTO",
            DebtLevel::Critical => "CRITICO",
        }
    }
}

impl std::fmt::Display for DebtLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a debt amount: Normal up to 5000, High up to 10000, Critical above
pub fn classify_debt(amount: Decimal) -> DebtLevel {
    if amount > Decimal::from(CRITICAL_DEBT_THRESHOLD) {
        DebtLevel::Critical
    } else if amount > Decimal::from(HIGH_DEBT_THRESHOLD) {
        DebtLevel::High
    } else {
        DebtLevel::Normal
    }
}

/// Debt position of one supplier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupplierDebt {
    #[serde(rename = "proveedor_id")]
    pub supplier_id: Uuid,
    #[serde(rename = "proveedor_nombre")]
    pub supplier_name: String,
    #[serde(rename = "total_deuda")]
    pub total_debt: Decimal,
    #[serde(rename = "pedidos_pendientes")]
    pub pending_orders: u32,
    #[serde(rename = "estado")]
    pub level: DebtLevel,
}

/// Reconciliation report across suppliers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtReport {
    #[serde(rename = "proveedores")]
    pub suppliers: Vec<SupplierDebt>,
    #[serde(rename = "deuda_total")]
    pub total_debt: Decimal,
    #[serde(rename = "proveedores_con_deuda")]
    pub suppliers_with_debt: u32,
    #[serde(rename = "pedidos_pendientes_totales")]
    pub pending_orders_total: u32,
}

impl DebtReport {
    pub fn from_entries(suppliers: Vec<SupplierDebt>) -> Self {
        let total_debt = suppliers.iter().map(|s| s.total_debt).sum();
        let suppliers_with_debt = suppliers
            .iter()
            .filter(|s| s.total_debt > Decimal::ZERO)
            .count() as u32;
        let pending_orders_total = suppliers.iter().map(|s| s.pending_orders).sum();
        Self {
            suppliers,
            total_debt,
            suppliers_with_debt,
            pending_orders_total,
        }
    }
}
