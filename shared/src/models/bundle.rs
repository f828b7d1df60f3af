//! Inventory bundle ("saco") models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A multi-garment inventory unit sold as a set at a fixed base price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bundle {
    pub id: Uuid,
    #[serde(rename = "pedido_id")]
    pub purchase_order_id: Option<Uuid>,
    #[serde(rename = "tipo")]
    pub garment_type: GarmentType,
    #[serde(rename = "temporada")]
    pub season: Season,
    #[serde(rename = "categoria")]
    pub category: Category,
    #[serde(rename = "tallas_incluidas")]
    pub sizes: Vec<String>,
    #[serde(rename = "descripcion_contenido")]
    pub content_description: String,
    #[serde(rename = "precio_base")]
    pub base_price: Decimal,
    #[serde(rename = "estado")]
    pub state: BundleState,
    /// Unique scan code printed on the tag, immutable once assigned
    #[serde(rename = "qr_code")]
    pub scan_code: String,
    #[serde(rename = "observaciones")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Bundle state in the warehouse
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BundleState {
    #[serde(rename = "RECIBIDO")]
    Received,
    #[serde(rename = "DISPONIBLE")]
    Available,
    #[serde(rename = "RESERVADO")]
    Reserved,
    #[serde(rename = "VENDIDO")]
    Sold,
}

impl BundleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleState::Received => "RECIBIDO",
            BundleState::Available => "DISPONIBLE",
            BundleState::Reserved => "RESERVADO",
            BundleState::Sold => "VENDIDO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RECIBIDO" => Some(BundleState::Received),
            "DISPONIBLE" => Some(BundleState::Available),
            "RESERVADO" => Some(BundleState::Reserved),
            "VENDIDO" => Some(BundleState::Sold),
            _ => None,
        }
    }

    /// Forward moves plus the reservation release back to Available
    pub fn can_transition_to(&self, next: BundleState) -> bool {
        matches!(
            (self, next),
            (BundleState::Received, BundleState::Available)
                | (BundleState::Available, BundleState::Reserved)
                | (BundleState::Reserved, BundleState::Available)
                | (BundleState::Reserved, BundleState::Sold)
        )
    }

    /// Descriptive fields can still be corrected
    pub fn is_editable(&self) -> bool {
        matches!(self, BundleState::Received | BundleState::Available)
    }
}

impl std::fmt::Display for BundleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Garment type tag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GarmentType {
    CasualHombre,
    CasualMujer,
    DeportivoHombre,
    DeportivoMujer,
    InfantilNino,
    InfantilNina,
    FormalHombre,
    FormalMujer,
}

impl GarmentType {
    pub const ALL: [GarmentType; 8] = [
        GarmentType::CasualHombre,
        GarmentType::CasualMujer,
        GarmentType::DeportivoHombre,
        GarmentType::DeportivoMujer,
        GarmentType::InfantilNino,
        GarmentType::InfantilNina,
        GarmentType::FormalHombre,
        GarmentType::FormalMujer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GarmentType::CasualHombre => "CASUAL_HOMBRE",
            GarmentType::CasualMujer => "CASUAL_MUJER",
            GarmentType::DeportivoHombre => "DEPORTIVO_HOMBRE",
            GarmentType::DeportivoMujer => "DEPORTIVO_MUJER",
            GarmentType::InfantilNino => "INFANTIL_NINO",
            GarmentType::InfantilNina => "INFANTIL_NINA",
            GarmentType::FormalHombre => "FORMAL_HOMBRE",
            GarmentType::FormalMujer => "FORMAL_MUJER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Selling season
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Season {
    #[serde(rename = "VERANO")]
    Summer,
    #[serde(rename = "INVIERNO")]
    Winter,
    #[serde(rename = "OTONO")]
    Fall,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Summer => "VERANO",
            Season::Winter => "INVIERNO",
            Season::Fall => "OTONO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VERANO" => Some(Season::Summer),
            "INVIERNO" => Some(Season::Winter),
            "OTONO" => Some(Season::Fall),
            _ => None,
        }
    }
}

/// Demographic category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "HOMBRE")]
    Man,
    #[serde(rename = "MUJER")]
    Woman,
    #[serde(rename = "NINO")]
    Boy,
    #[serde(rename = "NINA")]
    Girl,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Man => "HOMBRE",
            Category::Woman => "MUJER",
            Category::Boy => "NINO",
            Category::Girl => "NINA",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HOMBRE" => Some(Category::Man),
            "MUJER" => Some(Category::Woman),
            "NINO" => Some(Category::Boy),
            "NINA" => Some(Category::Girl),
            _ => None,
        }
    }
}

/// Trim and de-duplicate sizes, keeping first-seen order
pub fn normalize_sizes(sizes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(sizes.len());
    for size in sizes {
        let size = size.trim().to_uppercase();
        if !size.is_empty() && !out.contains(&size) {
            out.push(size);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundle_transitions() {
        use BundleState::*;
        assert!(Received.can_transition_to(Available));
        assert!(Available.can_transition_to(Reserved));
        assert!(Reserved.can_transition_to(Available));
        assert!(Reserved.can_transition_to(Sold));

        assert!(!Received.can_transition_to(Reserved));
        assert!(!Available.can_transition_to(Sold));
        assert!(!Sold.can_transition_to(Available));
        assert!(!Available.can_transition_to(Received));
    }

    #[test]
    fn test_garment_type_parse() {
        for t in GarmentType::ALL {
            assert_eq!(GarmentType::parse(t.as_str()), Some(t));
        }
        assert_eq!(GarmentType::parse("CASUAL"), None);
    }

    #[test]
    fn test_garment_type_serde_matches_as_str() {
        for t in GarmentType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn test_normalize_sizes() {
        let sizes = vec![
            "m".to_string(),
            " L ".to_string(),
            "M".to_string(),
            "".to_string(),
            "xl".to_string(),
        ];
        assert_eq!(normalize_sizes(&sizes), vec!["M", "L", "XL"]);
    }
}
