//! Supplier debt aggregation

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{classify_debt, validate_ledger_amount, DebtReport, SupplierDebt};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::repository::{PurchaseOrderFilter, Repositories};
use crate::AppState;

#[derive(Clone)]
pub struct DebtService {
    repos: Repositories,
}

#[derive(Debug, Deserialize)]
pub struct SetDebtInput {
    #[serde(rename = "total_deuda")]
    pub amount: Decimal,
}

impl DebtService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
        }
    }

    /// One entry per supplier with at least one non-closed order, largest debt first
    pub async fn supplier_debts(&self) -> AppResult<Vec<SupplierDebt>> {
        let orders = self
            .repos
            .purchase_orders
            .list(&PurchaseOrderFilter::default())
            .await?;

        let mut pending: HashMap<Uuid, u32> = HashMap::new();
        for order in orders.iter().filter(|o| o.state.is_pending()) {
            *pending.entry(order.supplier_id).or_default() += 1;
        }
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let ledger = self.repos.debt.outstanding_by_supplier().await?;
        let suppliers = self.repos.suppliers.list().await?;

        let mut entries: Vec<SupplierDebt> = suppliers
            .into_iter()
            .filter_map(|supplier| {
                let pending_orders = *pending.get(&supplier.id)?;
                let total_debt = ledger.get(&supplier.id).copied().unwrap_or(Decimal::ZERO);
                Some(SupplierDebt {
                    supplier_id: supplier.id,
                    supplier_name: supplier.name,
                    total_debt,
                    pending_orders,
                    level: classify_debt(total_debt),
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.total_debt
                .cmp(&a.total_debt)
                .then_with(|| a.supplier_name.cmp(&b.supplier_name))
        });
        Ok(entries)
    }

    pub async fn report(&self) -> AppResult<DebtReport> {
        Ok(DebtReport::from_entries(self.supplier_debts().await?))
    }

    /// Record the accounting figure for one supplier
    pub async fn set_debt(&self, supplier_id: Uuid, input: SetDebtInput) -> AppResult<SupplierDebt> {
        let supplier = self
            .repos
            .suppliers
            .get(supplier_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        if input.amount < Decimal::ZERO {
            return Err(AppError::validation(
                "total_deuda",
                "Debt cannot be negative",
                "La deuda no puede ser negativa",
            ));
        }
        validate_ledger_amount(input.amount).map_err(|msg| {
            AppError::validation("total_deuda", msg, "Monto de deuda inválido")
        })?;

        self.repos.debt.set_debt(supplier_id, input.amount).await?;
        tracing::info!("Debt for supplier {} set to {}", supplier.name, input.amount);

        let pending_orders = self
            .repos
            .purchase_orders
            .list(&PurchaseOrderFilter {
                supplier_id: Some(supplier_id),
                ..Default::default()
            })
            .await?
            .iter()
            .filter(|o| o.state.is_pending())
            .count() as u32;

        Ok(SupplierDebt {
            supplier_id,
            supplier_name: supplier.name,
            total_debt: input.amount,
            pending_orders,
            level: classify_debt(input.amount),
        })
    }
}
