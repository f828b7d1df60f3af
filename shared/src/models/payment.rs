//! Payment ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::QuotationState;

/// A payment recorded against a quotation; never edited or deleted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    #[serde(rename = "proforma_id")]
    pub quotation_id: Uuid,
    #[serde(rename = "monto")]
    pub amount: Decimal,
    #[serde(rename = "metodo_pago")]
    pub method: PaymentMethod,
    pub voucher_url: Option<String>,
    #[serde(rename = "observaciones")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    #[serde(rename = "EFECTIVO")]
    Cash,
    #[serde(rename = "TRANSFERENCIA")]
    Transfer,
    #[serde(rename = "DEPOSITO")]
    Deposit,
    /// Yape mobile wallet
    #[serde(rename = "YAPE")]
    DigitalWalletA,
    /// Plin mobile wallet
    #[serde(rename = "PLIN")]
    DigitalWalletB,
    #[serde(rename = "TARJETA")]
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "EFECTIVO",
            PaymentMethod::Transfer => "TRANSFERENCIA",
            PaymentMethod::Deposit => "DEPOSITO",
            PaymentMethod::DigitalWalletA => "YAPE",
            PaymentMethod::DigitalWalletB => "PLIN",
            PaymentMethod::Card => "TARJETA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EFECTIVO" => Some(PaymentMethod::Cash),
            "TRANSFERENCIA" => Some(PaymentMethod::Transfer),
            "DEPOSITO" => Some(PaymentMethod::Deposit),
            "YAPE" => Some(PaymentMethod::DigitalWalletA),
            "PLIN" => Some(PaymentMethod::DigitalWalletB),
            "TARJETA" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

/// Amount still owed on a quotation; never negative
pub fn outstanding_balance(total: Decimal, paid: Decimal) -> Decimal {
    (total - paid).max(Decimal::ZERO)
}

/// Customer transferred more than the quotation total
pub fn is_overpaid(total: Decimal, paid: Decimal) -> bool {
    paid > total
}

/// Payment position of a single quotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    #[serde(rename = "proforma_id")]
    pub quotation_id: Uuid,
    #[serde(rename = "estado")]
    pub state: QuotationState,
    pub total: Decimal,
    #[serde(rename = "total_pagado")]
    pub paid: Decimal,
    #[serde(rename = "saldo_pendiente")]
    pub outstanding: Decimal,
    #[serde(rename = "sobrepagado")]
    pub overpaid: bool,
    #[serde(rename = "pagos")]
    pub payments: Vec<Payment>,
}

impl LedgerSummary {
    /// Build a summary from the quotation total and its payment log
    pub fn new(
        quotation_id: Uuid,
        state: QuotationState,
        total: Decimal,
        payments: Vec<Payment>,
    ) -> Self {
        let paid: Decimal = payments.iter().map(|p| p.amount).sum();
        Self {
            quotation_id,
            state,
            total,
            paid,
            outstanding: outstanding_balance(total, paid),
            overpaid: is_overpaid(total, paid),
            payments,
        }
    }
}
