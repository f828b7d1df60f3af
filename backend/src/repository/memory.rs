//! In-memory repositories
//!
//! Each entity table sits behind its own `RwLock`. A multi-row
//! compare-and-set holds the table's write lock for the check and the write,
//! so it is atomic with respect to every other caller of this store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    Bundle, BundleState, CatalogList, Payment, PurchaseOrder, PurchaseOrderState, Quotation,
    QuotationState, Supplier,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    BundleFilter, BundleRepository, CasOutcome, DebtLedger, ListRepository,
    PaymentRepository, PurchaseOrderFilter, PurchaseOrderRepository, QuotationFilter,
    QuotationRepository, SupplierRepository,
};
use crate::error::{AppError, AppResult};

#[derive(Default)]
pub struct InMemoryStore {
    suppliers: RwLock<HashMap<Uuid, Supplier>>,
    purchase_orders: RwLock<HashMap<Uuid, PurchaseOrder>>,
    bundles: RwLock<HashMap<Uuid, Bundle>>,
    lists: RwLock<HashMap<Uuid, CatalogList>>,
    quotations: RwLock<HashMap<Uuid, Quotation>>,
    payments: RwLock<Vec<Payment>>,
    debts: RwLock<HashMap<Uuid, Decimal>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Ids from `ids` whose row is missing or not in `from`
fn offending_ids<T>(
    table: &HashMap<Uuid, T>,
    ids: &[Uuid],
    in_state: impl Fn(&T) -> bool,
) -> Vec<Uuid> {
    let mut offending: Vec<Uuid> = ids
        .iter()
        .filter(|id| !table.get(*id).map_or(false, &in_state))
        .copied()
        .collect();
    offending.dedup();
    offending
}

#[async_trait]
impl SupplierRepository for InMemoryStore {
    async fn insert(&self, supplier: Supplier) -> AppResult<Supplier> {
        self.suppliers
            .write()
            .await
            .insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Supplier>> {
        Ok(self.suppliers.read().await.get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Supplier>> {
        let mut suppliers: Vec<Supplier> = self.suppliers.read().await.values().cloned().collect();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }
}

#[async_trait]
impl PurchaseOrderRepository for InMemoryStore {
    async fn insert(&self, order: PurchaseOrder) -> AppResult<PurchaseOrder> {
        self.purchase_orders
            .write()
            .await
            .insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        Ok(self.purchase_orders.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &PurchaseOrderFilter) -> AppResult<Vec<PurchaseOrder>> {
        let mut orders: Vec<PurchaseOrder> = self
            .purchase_orders
            .read()
            .await
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.ordered_at.cmp(&a.ordered_at));
        Ok(orders)
    }

    async fn update_state(
        &self,
        id: Uuid,
        from: PurchaseOrderState,
        to: PurchaseOrderState,
    ) -> AppResult<bool> {
        let mut orders = self.purchase_orders.write().await;
        match orders.get_mut(&id) {
            Some(order) if order.state == from => {
                order.state = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_bundle_count(&self, id: Uuid, by: i64) -> AppResult<()> {
        let mut orders = self.purchase_orders.write().await;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;
        order.bundle_count += by;
        Ok(())
    }
}

#[async_trait]
impl BundleRepository for InMemoryStore {
    async fn insert(&self, bundle: Bundle) -> AppResult<Bundle> {
        let mut bundles = self.bundles.write().await;
        if bundles.values().any(|b| b.scan_code == bundle.scan_code) {
            return Err(AppError::DuplicateToken("scan code".to_string()));
        }
        bundles.insert(bundle.id, bundle.clone());
        Ok(bundle)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Bundle>> {
        Ok(self.bundles.read().await.get(&id).cloned())
    }

    async fn get_by_scan_code(&self, code: &str) -> AppResult<Option<Bundle>> {
        Ok(self
            .bundles
            .read()
            .await
            .values()
            .find(|b| b.scan_code == code)
            .cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> AppResult<Vec<Bundle>> {
        let bundles = self.bundles.read().await;
        Ok(ids.iter().filter_map(|id| bundles.get(id).cloned()).collect())
    }

    async fn list(&self, filter: &BundleFilter) -> AppResult<Vec<Bundle>> {
        let mut bundles: Vec<Bundle> = self
            .bundles
            .read()
            .await
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bundles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bundles)
    }

    async fn update_details(&self, bundle: &Bundle) -> AppResult<Bundle> {
        let mut bundles = self.bundles.write().await;
        let stored = bundles
            .get_mut(&bundle.id)
            .ok_or_else(|| AppError::NotFound("Bundle".to_string()))?;
        stored.garment_type = bundle.garment_type;
        stored.season = bundle.season;
        stored.category = bundle.category;
        stored.sizes = bundle.sizes.clone();
        stored.content_description = bundle.content_description.clone();
        stored.base_price = bundle.base_price;
        stored.notes = bundle.notes.clone();
        Ok(stored.clone())
    }

    async fn compare_and_set_states(
        &self,
        ids: &[Uuid],
        from: BundleState,
        to: BundleState,
    ) -> AppResult<CasOutcome> {
        let mut bundles = self.bundles.write().await;
        let offending = offending_ids(&bundles, ids, |b| b.state == from);
        if !offending.is_empty() {
            return Ok(CasOutcome::Rejected { offending });
        }
        for id in ids {
            if let Some(bundle) = bundles.get_mut(id) {
                bundle.state = to;
            }
        }
        Ok(CasOutcome::Applied)
    }

    async fn count_by_state(&self, state: BundleState) -> AppResult<u64> {
        Ok(self
            .bundles
            .read()
            .await
            .values()
            .filter(|b| b.state == state)
            .count() as u64)
    }
}

#[async_trait]
impl ListRepository for InMemoryStore {
    async fn insert(&self, list: CatalogList) -> AppResult<CatalogList> {
        self.lists.write().await.insert(list.id, list.clone());
        Ok(list)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<CatalogList>> {
        Ok(self.lists.read().await.get(&id).cloned())
    }

    async fn get_by_share_token(&self, token: &str) -> AppResult<Option<CatalogList>> {
        Ok(self
            .lists
            .read()
            .await
            .values()
            .find(|l| l.share_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list(&self) -> AppResult<Vec<CatalogList>> {
        let mut lists: Vec<CatalogList> = self.lists.read().await.values().cloned().collect();
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lists)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<CatalogList>> {
        let mut lists = self.lists.write().await;
        Ok(lists.get_mut(&id).map(|list| {
            list.active = active;
            list.clone()
        }))
    }

    async fn assign_share_token(&self, id: Uuid, token: &str) -> AppResult<Option<CatalogList>> {
        let mut lists = self.lists.write().await;
        if lists
            .values()
            .any(|l| l.id != id && l.share_token.as_deref() == Some(token))
        {
            return Err(AppError::DuplicateToken("share token".to_string()));
        }
        Ok(lists.get_mut(&id).map(|list| {
            if list.share_token.is_none() {
                list.share_token = Some(token.to_string());
            }
            list.clone()
        }))
    }

    async fn add_bundle(&self, id: Uuid, bundle_id: Uuid) -> AppResult<Option<CatalogList>> {
        let mut lists = self.lists.write().await;
        Ok(lists.get_mut(&id).map(|list| {
            if !list.bundle_ids.contains(&bundle_id) {
                list.bundle_ids.push(bundle_id);
            }
            list.clone()
        }))
    }

    async fn remove_bundle(&self, id: Uuid, bundle_id: Uuid) -> AppResult<Option<CatalogList>> {
        let mut lists = self.lists.write().await;
        Ok(lists.get_mut(&id).map(|list| {
            list.bundle_ids.retain(|b| *b != bundle_id);
            list.clone()
        }))
    }
}

#[async_trait]
impl QuotationRepository for InMemoryStore {
    async fn insert(&self, quotation: Quotation) -> AppResult<Quotation> {
        let mut quotations = self.quotations.write().await;
        if quotations
            .values()
            .any(|q| q.tracking_code == quotation.tracking_code)
        {
            return Err(AppError::DuplicateToken("tracking code".to_string()));
        }
        quotations.insert(quotation.id, quotation.clone());
        Ok(quotation)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Quotation>> {
        Ok(self.quotations.read().await.get(&id).cloned())
    }

    async fn get_by_tracking_code(&self, code: &str) -> AppResult<Option<Quotation>> {
        Ok(self
            .quotations
            .read()
            .await
            .values()
            .find(|q| q.tracking_code == code)
            .cloned())
    }

    async fn list(&self, filter: &QuotationFilter) -> AppResult<Vec<Quotation>> {
        let mut quotations: Vec<Quotation> = self
            .quotations
            .read()
            .await
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        quotations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(quotations)
    }

    async fn update(&self, quotation: &Quotation) -> AppResult<Quotation> {
        let mut quotations = self.quotations.write().await;
        let stored = quotations
            .get_mut(&quotation.id)
            .ok_or_else(|| AppError::NotFound("Quotation".to_string()))?;
        if stored.version != quotation.version {
            return Err(AppError::stale("Quotation"));
        }
        let mut next = quotation.clone();
        next.tracking_code = stored.tracking_code.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn compare_and_set_states(
        &self,
        ids: &[Uuid],
        from: QuotationState,
        to: QuotationState,
        at: DateTime<Utc>,
    ) -> AppResult<CasOutcome> {
        let mut quotations = self.quotations.write().await;
        let offending = offending_ids(&quotations, ids, |q| q.state == from);
        if !offending.is_empty() {
            return Ok(CasOutcome::Rejected { offending });
        }
        for id in ids {
            if let Some(quotation) = quotations.get_mut(id) {
                quotation.state = to;
                quotation.updated_at = at;
                quotation.version += 1;
            }
        }
        Ok(CasOutcome::Applied)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.quotations.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn insert(&self, payment: Payment) -> AppResult<Payment> {
        self.payments.write().await.push(payment.clone());
        Ok(payment)
    }

    async fn list_for_quotation(&self, quotation_id: Uuid) -> AppResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.quotation_id == quotation_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(payments)
    }

    async fn count_for_quotation(&self, quotation_id: Uuid) -> AppResult<u64> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.quotation_id == quotation_id)
            .count() as u64)
    }

    async fn total_since(&self, since: DateTime<Utc>) -> AppResult<Decimal> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.created_at >= since)
            .map(|p| p.amount)
            .sum())
    }
}

#[async_trait]
impl DebtLedger for InMemoryStore {
    async fn outstanding_by_supplier(&self) -> AppResult<HashMap<Uuid, Decimal>> {
        Ok(self.debts.read().await.clone())
    }

    async fn set_debt(&self, supplier_id: Uuid, amount: Decimal) -> AppResult<()> {
        self.debts.write().await.insert(supplier_id, amount);
        Ok(())
    }
}
