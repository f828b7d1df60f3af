//! Quotation ("proforma") models and lifecycle states

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::{compute_totals, PricingError, PricingLine, QuotationTotals};

/// A customer-facing price quote that may mature into a dispatched order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quotation {
    pub id: Uuid,
    /// Customer-visible tracking code, immutable once assigned
    #[serde(rename = "codigo_seguimiento")]
    pub tracking_code: String,
    #[serde(rename = "lista_id")]
    pub list_id: Option<Uuid>,
    #[serde(rename = "cliente_nombre")]
    pub customer_name: String,
    #[serde(rename = "cliente_telefono")]
    pub customer_phone: Option<String>,
    #[serde(rename = "cliente_email")]
    pub customer_email: Option<String>,
    #[serde(rename = "estado")]
    pub state: QuotationState,
    #[serde(rename = "descuento_global")]
    pub global_discount: Decimal,
    #[serde(rename = "total_original")]
    pub original_total: Decimal,
    pub total: Decimal,
    #[serde(rename = "fecha_expiracion")]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every stored update
    pub version: i64,
    #[serde(rename = "lineas")]
    pub lines: Vec<QuotationLine>,
}

/// A priced bundle within a quotation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotationLine {
    pub id: Uuid,
    #[serde(rename = "proforma_id")]
    pub quotation_id: Uuid,
    #[serde(rename = "saco_id")]
    pub bundle_id: Uuid,
    /// Unit price snapshot taken when the line was quoted
    #[serde(rename = "precio_unitario")]
    pub unit_price: Decimal,
    #[serde(rename = "descuento_linea")]
    pub line_discount: Decimal,
    pub subtotal: Decimal,
}

/// Quotation lifecycle state
///
/// `Issued -> Reserved -> Paid -> Dispatched`, plus `Reserved -> Expired`
/// as the only branch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum QuotationState {
    #[serde(rename = "EMITIDA")]
    Issued,
    #[serde(rename = "RESERVA")]
    Reserved,
    #[serde(rename = "PAGADA")]
    Paid,
    #[serde(rename = "VENCIDA")]
    Expired,
    #[serde(rename = "DESPACHADA")]
    Dispatched,
}

impl QuotationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationState::Issued => "EMITIDA",
            QuotationState::Reserved => "RESERVA",
            QuotationState::Paid => "PAGADA",
            QuotationState::Expired => "VENCIDA",
            QuotationState::Dispatched => "DESPACHADA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EMITIDA" => Some(QuotationState::Issued),
            "RESERVA" => Some(QuotationState::Reserved),
            "PAGADA" => Some(QuotationState::Paid),
            "VENCIDA" => Some(QuotationState::Expired),
            "DESPACHADA" => Some(QuotationState::Dispatched),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: QuotationState) -> bool {
        matches!(
            (self, next),
            (QuotationState::Issued, QuotationState::Reserved)
                | (QuotationState::Reserved, QuotationState::Paid)
                | (QuotationState::Reserved, QuotationState::Expired)
                | (QuotationState::Paid, QuotationState::Dispatched)
        )
    }

    /// Payments are recorded while reserved, and on paid quotations as corrections
    pub fn accepts_payments(&self) -> bool {
        matches!(self, QuotationState::Reserved | QuotationState::Paid)
    }

    /// Lines and discounts may still be revised
    pub fn is_revisable(&self) -> bool {
        matches!(self, QuotationState::Issued | QuotationState::Reserved)
    }

    /// Settled quotations are kept; open and expired ones may be deleted
    pub fn is_deletable(&self) -> bool {
        matches!(
            self,
            QuotationState::Issued | QuotationState::Reserved | QuotationState::Expired
        )
    }
}

impl std::fmt::Display for QuotationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Quotation {
    pub fn bundle_ids(&self) -> Vec<Uuid> {
        self.lines.iter().map(|line| line.bundle_id).collect()
    }

    pub fn pricing_lines(&self) -> Vec<PricingLine> {
        self.lines
            .iter()
            .map(|line| PricingLine::new(line.unit_price, line.line_discount))
            .collect()
    }

    /// Recompute every derived amount from the lines and discounts
    pub fn reprice(&mut self) -> Result<QuotationTotals, PricingError> {
        let totals = compute_totals(&self.pricing_lines(), self.global_discount)?;
        for (line, subtotal) in self.lines.iter_mut().zip(&totals.line_subtotals) {
            line.subtotal = *subtotal;
        }
        self.original_total = totals.original_total;
        self.total = totals.final_total;
        Ok(totals)
    }

    /// A reservation whose window has closed at `now`
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.state == QuotationState::Reserved
            && self.expires_at.map(|at| now > at).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn quotation(state: QuotationState) -> Quotation {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Quotation {
            id,
            tracking_code: "PF000001-0001".to_string(),
            list_id: None,
            customer_name: "Rosa Quispe".to_string(),
            customer_phone: None,
            customer_email: None,
            state,
            global_discount: dec("5"),
            original_total: Decimal::ZERO,
            total: Decimal::ZERO,
            expires_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
            lines: vec![
                QuotationLine {
                    id: Uuid::new_v4(),
                    quotation_id: id,
                    bundle_id: Uuid::new_v4(),
                    unit_price: dec("500"),
                    line_discount: Decimal::ZERO,
                    subtotal: Decimal::ZERO,
                },
                QuotationLine {
                    id: Uuid::new_v4(),
                    quotation_id: id,
                    bundle_id: Uuid::new_v4(),
                    unit_price: dec("500"),
                    line_discount: dec("10"),
                    subtotal: Decimal::ZERO,
                },
            ],
        }
    }

    #[test]
    fn test_legal_transitions() {
        use QuotationState::*;
        assert!(Issued.can_transition_to(Reserved));
        assert!(Reserved.can_transition_to(Paid));
        assert!(Reserved.can_transition_to(Expired));
        assert!(Paid.can_transition_to(Dispatched));
    }

    #[test]
    fn test_illegal_transitions() {
        use QuotationState::*;
        assert!(!Issued.can_transition_to(Paid));
        assert!(!Issued.can_transition_to(Expired));
        assert!(!Paid.can_transition_to(Expired));
        assert!(!Paid.can_transition_to(Reserved));
        assert!(!Expired.can_transition_to(Reserved));
        assert!(!Dispatched.can_transition_to(Paid));
        assert!(!Reserved.can_transition_to(Dispatched));
    }

    #[test]
    fn test_accepts_payments() {
        use QuotationState::*;
        assert!(Reserved.accepts_payments());
        assert!(Paid.accepts_payments());
        assert!(!Issued.accepts_payments());
        assert!(!Expired.accepts_payments());
        assert!(!Dispatched.accepts_payments());
    }

    #[test]
    fn test_deletable_states() {
        use QuotationState::*;
        assert!(Issued.is_deletable());
        assert!(Reserved.is_deletable());
        assert!(Expired.is_deletable());
        assert!(!Paid.is_deletable());
        assert!(!Dispatched.is_deletable());
    }

    #[test]
    fn test_reprice_sets_line_subtotals_and_totals() {
        let mut q = quotation(QuotationState::Issued);
        q.reprice().unwrap();
        assert_eq!(q.lines[0].subtotal, dec("500"));
        assert_eq!(q.lines[1].subtotal, dec("450"));
        assert_eq!(q.original_total, dec("1000"));
        assert_eq!(q.total, dec("902.50"));
    }

    #[test]
    fn test_past_expiry_only_when_reserved() {
        let now = Utc::now();
        let mut q = quotation(QuotationState::Reserved);
        q.expires_at = Some(now - Duration::minutes(1));
        assert!(q.is_past_expiry(now));

        q.expires_at = Some(now + Duration::minutes(1));
        assert!(!q.is_past_expiry(now));

        q.state = QuotationState::Paid;
        q.expires_at = Some(now - Duration::minutes(1));
        assert!(!q.is_past_expiry(now));
    }
}
