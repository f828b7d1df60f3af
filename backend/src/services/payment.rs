//! Payment ledger service
//!
//! Payments are append-only. Recording one may settle a reservation, so it
//! shares the quotation lock with the lifecycle service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{validate_ledger_amount, LedgerSummary, Payment, PaymentMethod};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::QuotationService;
use crate::AppState;

#[derive(Clone)]
pub struct PaymentService {
    state: AppState,
    quotations: QuotationService,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentInput {
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "metodo_pago")]
    pub method: PaymentMethod,
    #[serde(default)]
    pub voucher_url: Option<String>,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

/// The stored payment plus the quotation's position after it
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    #[serde(rename = "pago")]
    pub payment: Payment,
    #[serde(rename = "resumen")]
    pub summary: LedgerSummary,
}

impl PaymentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
            quotations: QuotationService::new(state),
        }
    }

    /// Append a payment; a Reserved quotation settles once fully covered
    pub async fn record_payment(
        &self,
        quotation_id: Uuid,
        input: RecordPaymentInput,
    ) -> AppResult<PaymentReceipt> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::validation(
                "monto",
                "Payment amount must be greater than zero",
                "El monto del pago debe ser mayor a cero",
            ));
        }
        validate_ledger_amount(input.amount).map_err(|msg| {
            AppError::validation("monto", msg, "Monto de pago inválido")
        })?;

        let _guard = self.state.locks.lock(quotation_id).await;
        let quotation = self.quotations.load(quotation_id).await?;

        if !quotation.state.accepts_payments() {
            return Err(AppError::invalid_transition(
                quotation_id,
                format!(
                    "quotation {} is {} and does not accept payments",
                    quotation.tracking_code, quotation.state
                ),
            ));
        }

        let payment = self
            .state
            .repos
            .payments
            .insert(Payment {
                id: Uuid::new_v4(),
                quotation_id,
                amount: input.amount,
                method: input.method,
                voucher_url: input.voucher_url.filter(|v| !v.trim().is_empty()),
                notes: input.notes,
                created_at: self.state.clock.now(),
            })
            .await?;

        tracing::info!(
            "Recorded {} payment of {} on {}",
            payment.method.as_str(),
            payment.amount,
            quotation.tracking_code
        );

        let payments = self
            .state
            .repos
            .payments
            .list_for_quotation(quotation_id)
            .await?;
        let paid: Decimal = payments.iter().map(|p| p.amount).sum();
        let quotation = self.quotations.settle_if_covered(quotation, paid).await?;

        let summary = LedgerSummary::new(quotation.id, quotation.state, quotation.total, payments);
        if summary.overpaid {
            tracing::warn!(
                "Quotation {} overpaid: {} against total {}",
                quotation.tracking_code,
                summary.paid,
                summary.total
            );
        }

        Ok(PaymentReceipt { payment, summary })
    }

    /// Payment position of one quotation, payments oldest first
    pub async fn ledger(&self, quotation_id: Uuid) -> AppResult<LedgerSummary> {
        let quotation = self.quotations.load(quotation_id).await?;
        let payments = self
            .state
            .repos
            .payments
            .list_for_quotation(quotation_id)
            .await?;
        Ok(LedgerSummary::new(
            quotation.id,
            quotation.state,
            quotation.total,
            payments,
        ))
    }
}
