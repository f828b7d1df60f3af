//! Curated bundle lists and public catalogs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Bundle;

/// A curated list of bundles that can be published as a public catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogList {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "tipo")]
    pub list_type: ListType,
    #[serde(rename = "activa")]
    pub active: bool,
    /// Public share token; assigned once and never changed
    #[serde(rename = "enlace_publico")]
    pub share_token: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Member bundles in insertion order; membership does not imply ownership
    #[serde(rename = "saco_ids")]
    pub bundle_ids: Vec<Uuid>,
}

impl CatalogList {
    pub fn contains(&self, bundle_id: Uuid) -> bool {
        self.bundle_ids.contains(&bundle_id)
    }

    /// Only published, active lists are browsable anonymously
    pub fn is_publicly_browsable(&self) -> bool {
        self.active && self.share_token.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ListType {
    #[serde(rename = "VIP")]
    Vip,
    #[serde(rename = "BASE")]
    Base,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Vip => "VIP",
            ListType::Base => "BASE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VIP" => Some(ListType::Vip),
            "BASE" => Some(ListType::Base),
            _ => None,
        }
    }
}

/// A list together with its member bundles
#[derive(Debug, Clone, Serialize)]
pub struct ListWithBundles {
    #[serde(flatten)]
    pub list: CatalogList,
    #[serde(rename = "sacos")]
    pub bundles: Vec<Bundle>,
}

/// Sort order for the public catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriceOrder {
    Asc,
    Desc,
}
