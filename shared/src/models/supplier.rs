//! Supplier models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A clothing supplier bundles are purchased from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Supplier {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "contacto")]
    pub contact: Option<String>,
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    #[serde(rename = "activo")]
    pub active: bool,
}
