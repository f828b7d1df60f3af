//! Purchase order models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchase order placed with a supplier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOrder {
    pub id: Uuid,
    #[serde(rename = "proveedor_id")]
    pub supplier_id: Uuid,
    #[serde(rename = "fecha_pedido")]
    pub ordered_at: DateTime<Utc>,
    #[serde(rename = "fecha_entrega_estimada")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(rename = "estado")]
    pub state: PurchaseOrderState,
    #[serde(rename = "observaciones")]
    pub notes: Option<String>,
    /// Number of bundles received against this order
    #[serde(rename = "total_sacos")]
    pub bundle_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Purchase order state; orders only move forward one step at a time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PurchaseOrderState {
    #[serde(rename = "CREADO")]
    Created,
    #[serde(rename = "EN_TRANSITO")]
    InTransit,
    #[serde(rename = "RECIBIDO")]
    Received,
    #[serde(rename = "CERRADO")]
    Closed,
}

impl PurchaseOrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderState::Created => "CREADO",
            PurchaseOrderState::InTransit => "EN_TRANSITO",
            PurchaseOrderState::Received => "RECIBIDO",
            PurchaseOrderState::Closed => "CERRADO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREADO" => Some(PurchaseOrderState::Created),
            "EN_TRANSITO" => Some(PurchaseOrderState::InTransit),
            "RECIBIDO" => Some(PurchaseOrderState::Received),
            "CERRADO" => Some(PurchaseOrderState::Closed),
            _ => None,
        }
    }

    /// The only state this one may advance to
    pub fn next(&self) -> Option<Self> {
        match self {
            PurchaseOrderState::Created => Some(PurchaseOrderState::InTransit),
            PurchaseOrderState::InTransit => Some(PurchaseOrderState::Received),
            PurchaseOrderState::Received => Some(PurchaseOrderState::Closed),
            PurchaseOrderState::Closed => None,
        }
    }

    pub fn can_transition_to(&self, next: PurchaseOrderState) -> bool {
        self.next() == Some(next)
    }

    /// Orders still owed to the supplier
    pub fn is_pending(&self) -> bool {
        !matches!(self, PurchaseOrderState::Closed)
    }

    /// Bundles may only be received against orders on their way or arrived
    pub fn accepts_reception(&self) -> bool {
        matches!(
            self,
            PurchaseOrderState::InTransit | PurchaseOrderState::Received
        )
    }
}

impl std::fmt::Display for PurchaseOrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_only() {
        use PurchaseOrderState::*;
        assert!(Created.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Received));
        assert!(Received.can_transition_to(Closed));

        assert!(!Created.can_transition_to(Received));
        assert!(!Received.can_transition_to(InTransit));
        assert!(!Closed.can_transition_to(Created));
        assert_eq!(Closed.next(), None);
    }

    #[test]
    fn test_pending_states() {
        use PurchaseOrderState::*;
        assert!(Created.is_pending());
        assert!(InTransit.is_pending());
        assert!(Received.is_pending());
        assert!(!Closed.is_pending());
    }

    #[test]
    fn test_round_trip_str() {
        use PurchaseOrderState::*;
        for state in [Created, InTransit, Received, Closed] {
            assert_eq!(PurchaseOrderState::parse(state.as_str()), Some(state));
        }
        assert_eq!(PurchaseOrderState::parse("created"), None);
    }
}
