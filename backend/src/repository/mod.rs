//! Storage interfaces for the back-office entities
//!
//! Services depend only on these traits. Two implementations ship: an
//! in-memory store for development and tests, and PostgreSQL via sqlx.
//! Multi-row state changes go through `compare_and_set_states`, which applies
//! to every row or to none.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    Bundle, BundleState, Category, CatalogList, GarmentType, Payment, PurchaseOrder,
    PurchaseOrderState, Quotation, QuotationState, Season, Supplier,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Outcome of a multi-row compare-and-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// Every row was in the expected state and has moved
    Applied,
    /// Nothing changed; these rows were missing or in another state
    Rejected { offending: Vec<Uuid> },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    #[serde(rename = "estado")]
    pub state: Option<PurchaseOrderState>,
    #[serde(rename = "proveedor_id")]
    pub supplier_id: Option<Uuid>,
}

impl PurchaseOrderFilter {
    pub fn matches(&self, order: &PurchaseOrder) -> bool {
        self.state.map_or(true, |s| order.state == s)
            && self.supplier_id.map_or(true, |s| order.supplier_id == s)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleFilter {
    #[serde(rename = "estado")]
    pub state: Option<BundleState>,
    #[serde(rename = "tipo")]
    pub garment_type: Option<GarmentType>,
    #[serde(rename = "temporada")]
    pub season: Option<Season>,
    #[serde(rename = "categoria")]
    pub category: Option<Category>,
    #[serde(rename = "pedido_id")]
    pub purchase_order_id: Option<Uuid>,
}

impl BundleFilter {
    pub fn matches(&self, bundle: &Bundle) -> bool {
        self.state.map_or(true, |s| bundle.state == s)
            && self.garment_type.map_or(true, |t| bundle.garment_type == t)
            && self.season.map_or(true, |s| bundle.season == s)
            && self.category.map_or(true, |c| bundle.category == c)
            && self
                .purchase_order_id
                .map_or(true, |po| bundle.purchase_order_id == Some(po))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuotationFilter {
    #[serde(rename = "estado")]
    pub state: Option<QuotationState>,
    #[serde(rename = "lista_id")]
    pub list_id: Option<Uuid>,
    /// Only reservations expiring strictly after this instant
    #[serde(skip)]
    pub expires_after: Option<DateTime<Utc>>,
    /// Only reservations expiring at or before this instant
    #[serde(skip)]
    pub expires_before: Option<DateTime<Utc>>,
    /// Case-insensitive match on customer name or tracking code
    #[serde(rename = "q")]
    pub search: Option<String>,
}

impl QuotationFilter {
    pub fn matches(&self, quotation: &Quotation) -> bool {
        if let Some(state) = self.state {
            if quotation.state != state {
                return false;
            }
        }
        if let Some(list_id) = self.list_id {
            if quotation.list_id != Some(list_id) {
                return false;
            }
        }
        if let Some(after) = self.expires_after {
            if !quotation.expires_at.map_or(false, |at| at > after) {
                return false;
            }
        }
        if let Some(before) = self.expires_before {
            if !quotation.expires_at.map_or(false, |at| at <= before) {
                return false;
            }
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !quotation.customer_name.to_lowercase().contains(&term)
                && !quotation.tracking_code.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait SupplierRepository: Send + Sync {
    async fn insert(&self, supplier: Supplier) -> AppResult<Supplier>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Supplier>>;
    /// All suppliers ordered by name
    async fn list(&self) -> AppResult<Vec<Supplier>>;
}

#[async_trait]
pub trait PurchaseOrderRepository: Send + Sync {
    async fn insert(&self, order: PurchaseOrder) -> AppResult<PurchaseOrder>;
    async fn get(&self, id: Uuid) -> AppResult<Option<PurchaseOrder>>;
    /// Matching orders, newest first
    async fn list(&self, filter: &PurchaseOrderFilter) -> AppResult<Vec<PurchaseOrder>>;
    /// Move one order from `from` to `to`; false if it was not in `from`
    async fn update_state(
        &self,
        id: Uuid,
        from: PurchaseOrderState,
        to: PurchaseOrderState,
    ) -> AppResult<bool>;
    async fn increment_bundle_count(&self, id: Uuid, by: i64) -> AppResult<()>;
}

#[async_trait]
pub trait BundleRepository: Send + Sync {
    /// Fails with `DuplicateToken` when the scan code is taken
    async fn insert(&self, bundle: Bundle) -> AppResult<Bundle>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Bundle>>;
    async fn get_by_scan_code(&self, code: &str) -> AppResult<Option<Bundle>>;
    /// Bundles for the ids that exist, in the order requested
    async fn get_many(&self, ids: &[Uuid]) -> AppResult<Vec<Bundle>>;
    /// Matching bundles, newest first
    async fn list(&self, filter: &BundleFilter) -> AppResult<Vec<Bundle>>;
    /// Persist descriptive fields; state and scan code are left untouched
    async fn update_details(&self, bundle: &Bundle) -> AppResult<Bundle>;
    async fn compare_and_set_states(
        &self,
        ids: &[Uuid],
        from: BundleState,
        to: BundleState,
    ) -> AppResult<CasOutcome>;
    async fn count_by_state(&self, state: BundleState) -> AppResult<u64>;
}

#[async_trait]
pub trait ListRepository: Send + Sync {
    async fn insert(&self, list: CatalogList) -> AppResult<CatalogList>;
    async fn get(&self, id: Uuid) -> AppResult<Option<CatalogList>>;
    async fn get_by_share_token(&self, token: &str) -> AppResult<Option<CatalogList>>;
    async fn list(&self) -> AppResult<Vec<CatalogList>>;
    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<CatalogList>>;
    /// Assign a share token unless one is already set; the stored list is
    /// returned either way. `DuplicateToken` when another list owns it.
    async fn assign_share_token(&self, id: Uuid, token: &str) -> AppResult<Option<CatalogList>>;
    /// Append a member; a no-op when already present
    async fn add_bundle(&self, id: Uuid, bundle_id: Uuid) -> AppResult<Option<CatalogList>>;
    async fn remove_bundle(&self, id: Uuid, bundle_id: Uuid) -> AppResult<Option<CatalogList>>;
}

#[async_trait]
pub trait QuotationRepository: Send + Sync {
    /// Fails with `DuplicateToken` when the tracking code is taken
    async fn insert(&self, quotation: Quotation) -> AppResult<Quotation>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Quotation>>;
    async fn get_by_tracking_code(&self, code: &str) -> AppResult<Option<Quotation>>;
    /// Matching quotations, newest first
    async fn list(&self, filter: &QuotationFilter) -> AppResult<Vec<Quotation>>;
    /// Store a modified quotation with its lines
    ///
    /// The write only succeeds when the stored `version` equals the one on
    /// `quotation`; the returned copy carries the bumped version. A mismatch
    /// is a `Conflict`.
    async fn update(&self, quotation: &Quotation) -> AppResult<Quotation>;
    async fn compare_and_set_states(
        &self,
        ids: &[Uuid],
        from: QuotationState,
        to: QuotationState,
        at: DateTime<Utc>,
    ) -> AppResult<CasOutcome>;
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert(&self, payment: Payment) -> AppResult<Payment>;
    /// Payments for one quotation, oldest first
    async fn list_for_quotation(&self, quotation_id: Uuid) -> AppResult<Vec<Payment>>;
    async fn count_for_quotation(&self, quotation_id: Uuid) -> AppResult<u64>;
    /// Sum of payments recorded at or after `since`
    async fn total_since(&self, since: DateTime<Utc>) -> AppResult<Decimal>;
}

/// Accounting collaborator that owns supplier debt figures
#[async_trait]
pub trait DebtLedger: Send + Sync {
    /// Outstanding amount per supplier; absent suppliers owe nothing
    async fn outstanding_by_supplier(&self) -> AppResult<HashMap<Uuid, Decimal>>;
    async fn set_debt(&self, supplier_id: Uuid, amount: Decimal) -> AppResult<()>;
}

/// The full set of repositories handed to services
#[derive(Clone)]
pub struct Repositories {
    pub suppliers: Arc<dyn SupplierRepository>,
    pub purchase_orders: Arc<dyn PurchaseOrderRepository>,
    pub bundles: Arc<dyn BundleRepository>,
    pub lists: Arc<dyn ListRepository>,
    pub quotations: Arc<dyn QuotationRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub debt: Arc<dyn DebtLedger>,
    /// Backend name reported by the health check
    pub backend: &'static str,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            suppliers: store.clone(),
            purchase_orders: store.clone(),
            bundles: store.clone(),
            lists: store.clone(),
            quotations: store.clone(),
            payments: store.clone(),
            debt: store,
            backend: "memory",
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            suppliers: store.clone(),
            purchase_orders: store.clone(),
            bundles: store.clone(),
            lists: store.clone(),
            quotations: store.clone(),
            payments: store.clone(),
            debt: store,
            backend: "postgres",
        }
    }
}
