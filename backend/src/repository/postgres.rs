//! PostgreSQL repositories
//!
//! Enum columns hold the API wire names and are parsed back on read; an
//! unknown value is reported as an internal error rather than guessed.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    Bundle, BundleState, CatalogList, Category, GarmentType, ListType, Payment, PaymentMethod,
    PurchaseOrder, PurchaseOrderState, Quotation, QuotationLine, QuotationState, Season,
    Supplier,
};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    BundleFilter, BundleRepository, CasOutcome, DebtLedger, ListRepository,
    PaymentRepository, PurchaseOrderFilter, PurchaseOrderRepository, QuotationFilter,
    QuotationRepository, SupplierRepository,
};
use crate::error::{AppError, AppResult};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn corrupt(column: &str, value: &str) -> AppError {
    AppError::Internal(format!("unrecognized {} '{}' in storage", column, value))
}

/// Map a unique violation to `DuplicateToken`, anything else passes through
fn duplicate_as(kind: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicateToken(kind.to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    contact: Option<String>,
    phone: Option<String>,
    active: bool,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            contact: row.contact,
            phone: row.phone,
            active: row.active,
        }
    }
}

#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    supplier_id: Uuid,
    ordered_at: DateTime<Utc>,
    estimated_delivery: Option<DateTime<Utc>>,
    state: String,
    notes: Option<String>,
    bundle_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<PurchaseOrderRow> for PurchaseOrder {
    type Error = AppError;

    fn try_from(row: PurchaseOrderRow) -> AppResult<Self> {
        Ok(PurchaseOrder {
            id: row.id,
            supplier_id: row.supplier_id,
            ordered_at: row.ordered_at,
            estimated_delivery: row.estimated_delivery,
            state: PurchaseOrderState::parse(&row.state)
                .ok_or_else(|| corrupt("purchase order state", &row.state))?,
            notes: row.notes,
            bundle_count: row.bundle_count,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BundleRow {
    id: Uuid,
    purchase_order_id: Option<Uuid>,
    garment_type: String,
    season: String,
    category: String,
    sizes: Vec<String>,
    content_description: String,
    base_price: Decimal,
    state: String,
    scan_code: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BundleRow> for Bundle {
    type Error = AppError;

    fn try_from(row: BundleRow) -> AppResult<Self> {
        Ok(Bundle {
            id: row.id,
            purchase_order_id: row.purchase_order_id,
            garment_type: GarmentType::parse(&row.garment_type)
                .ok_or_else(|| corrupt("garment type", &row.garment_type))?,
            season: Season::parse(&row.season).ok_or_else(|| corrupt("season", &row.season))?,
            category: Category::parse(&row.category)
                .ok_or_else(|| corrupt("category", &row.category))?,
            sizes: row.sizes,
            content_description: row.content_description,
            base_price: row.base_price,
            state: BundleState::parse(&row.state)
                .ok_or_else(|| corrupt("bundle state", &row.state))?,
            scan_code: row.scan_code,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ListRow {
    id: Uuid,
    name: String,
    list_type: String,
    active: bool,
    share_token: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct QuotationRow {
    id: Uuid,
    tracking_code: String,
    list_id: Option<Uuid>,
    customer_name: String,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    state: String,
    global_discount: Decimal,
    original_total: Decimal,
    total: Decimal,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

#[derive(Debug, FromRow)]
struct QuotationLineRow {
    id: Uuid,
    quotation_id: Uuid,
    bundle_id: Uuid,
    unit_price: Decimal,
    line_discount: Decimal,
    subtotal: Decimal,
}

impl From<QuotationLineRow> for QuotationLine {
    fn from(row: QuotationLineRow) -> Self {
        QuotationLine {
            id: row.id,
            quotation_id: row.quotation_id,
            bundle_id: row.bundle_id,
            unit_price: row.unit_price,
            line_discount: row.line_discount,
            subtotal: row.subtotal,
        }
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    quotation_id: Uuid,
    amount: Decimal,
    method: String,
    voucher_url: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> AppResult<Self> {
        Ok(Payment {
            id: row.id,
            quotation_id: row.quotation_id,
            amount: row.amount,
            method: PaymentMethod::parse(&row.method)
                .ok_or_else(|| corrupt("payment method", &row.method))?,
            voucher_url: row.voucher_url,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

const PURCHASE_ORDER_COLUMNS: &str =
    "id, supplier_id, ordered_at, estimated_delivery, state, notes, bundle_count, created_at";

const BUNDLE_COLUMNS: &str = "id, purchase_order_id, garment_type, season, category, sizes, \
     content_description, base_price, state, scan_code, notes, created_at";

const LIST_COLUMNS: &str = "id, name, list_type, active, share_token, created_at";

const QUOTATION_COLUMNS: &str = "id, tracking_code, list_id, customer_name, customer_phone, \
     customer_email, state, global_discount, original_total, total, expires_at, created_at, \
     updated_at, version";

impl PgStore {
    async fn list_members(&self, list_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<Uuid>>> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT list_id, bundle_id FROM catalog_list_bundles \
             WHERE list_id = ANY($1) ORDER BY position",
        )
        .bind(list_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (list_id, bundle_id) in rows {
            members.entry(list_id).or_default().push(bundle_id);
        }
        Ok(members)
    }

    async fn hydrate_lists(&self, rows: Vec<ListRow>) -> AppResult<Vec<CatalogList>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut members = self.list_members(&ids).await?;

        rows.into_iter()
            .map(|row| -> AppResult<CatalogList> {
                Ok(CatalogList {
                    id: row.id,
                    list_type: ListType::parse(&row.list_type)
                        .ok_or_else(|| corrupt("list type", &row.list_type))?,
                    name: row.name,
                    active: row.active,
                    share_token: row.share_token,
                    created_at: row.created_at,
                    bundle_ids: members.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn fetch_list(&self, id: Uuid) -> AppResult<Option<CatalogList>> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {} FROM catalog_lists WHERE id = $1",
            LIST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate_lists(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn hydrate_quotations(&self, rows: Vec<QuotationRow>) -> AppResult<Vec<Quotation>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let line_rows = sqlx::query_as::<_, QuotationLineRow>(
            "SELECT id, quotation_id, bundle_id, unit_price, line_discount, subtotal \
             FROM quotation_lines WHERE quotation_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<QuotationLine>> = HashMap::new();
        for row in line_rows {
            lines.entry(row.quotation_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| -> AppResult<Quotation> {
                Ok(Quotation {
                    id: row.id,
                    state: QuotationState::parse(&row.state)
                        .ok_or_else(|| corrupt("quotation state", &row.state))?,
                    tracking_code: row.tracking_code,
                    list_id: row.list_id,
                    customer_name: row.customer_name,
                    customer_phone: row.customer_phone,
                    customer_email: row.customer_email,
                    global_discount: row.global_discount,
                    original_total: row.original_total,
                    total: row.total,
                    expires_at: row.expires_at,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                    version: row.version,
                    lines: lines.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn first_quotation(&self, row: Option<QuotationRow>) -> AppResult<Option<Quotation>> {
        match row {
            Some(row) => Ok(self.hydrate_quotations(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn insert_lines(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        quotation: &Quotation,
    ) -> AppResult<()> {
        for (position, line) in quotation.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO quotation_lines
                    (id, quotation_id, bundle_id, position, unit_price, line_discount, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(line.id)
            .bind(quotation.id)
            .bind(line.bundle_id)
            .bind(position as i32)
            .bind(line.unit_price)
            .bind(line.line_discount)
            .bind(line.subtotal)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SupplierRepository for PgStore {
    async fn insert(&self, supplier: Supplier) -> AppResult<Supplier> {
        sqlx::query(
            "INSERT INTO suppliers (id, name, contact, phone, active) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact)
        .bind(&supplier.phone)
        .bind(supplier.active)
        .execute(&self.pool)
        .await?;
        Ok(supplier)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Supplier>> {
        let row = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, name, contact, phone, active FROM suppliers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list(&self) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(
            "SELECT id, name, contact, phone, active FROM suppliers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl PurchaseOrderRepository for PgStore {
    async fn insert(&self, order: PurchaseOrder) -> AppResult<PurchaseOrder> {
        sqlx::query(
            r#"
            INSERT INTO purchase_orders
                (id, supplier_id, ordered_at, estimated_delivery, state, notes, bundle_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id)
        .bind(order.supplier_id)
        .bind(order.ordered_at)
        .bind(order.estimated_delivery)
        .bind(order.state.as_str())
        .bind(&order.notes)
        .bind(order.bundle_count)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(order)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        sqlx::query_as::<_, PurchaseOrderRow>(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1",
            PURCHASE_ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn list(&self, filter: &PurchaseOrderFilter) -> AppResult<Vec<PurchaseOrder>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM purchase_orders WHERE TRUE",
            PURCHASE_ORDER_COLUMNS
        ));
        if let Some(state) = filter.state {
            qb.push(" AND state = ").push_bind(state.as_str());
        }
        if let Some(supplier_id) = filter.supplier_id {
            qb.push(" AND supplier_id = ").push_bind(supplier_id);
        }
        qb.push(" ORDER BY ordered_at DESC");

        qb.build_query_as::<PurchaseOrderRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn update_state(
        &self,
        id: Uuid,
        from: PurchaseOrderState,
        to: PurchaseOrderState,
    ) -> AppResult<bool> {
        let result = sqlx::query("UPDATE purchase_orders SET state = $1 WHERE id = $2 AND state = $3")
            .bind(to.as_str())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn increment_bundle_count(&self, id: Uuid, by: i64) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE purchase_orders SET bundle_count = bundle_count + $1 WHERE id = $2")
                .bind(by)
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase order".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BundleRepository for PgStore {
    async fn insert(&self, bundle: Bundle) -> AppResult<Bundle> {
        sqlx::query(
            r#"
            INSERT INTO bundles
                (id, purchase_order_id, garment_type, season, category, sizes,
                 content_description, base_price, state, scan_code, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(bundle.id)
        .bind(bundle.purchase_order_id)
        .bind(bundle.garment_type.as_str())
        .bind(bundle.season.as_str())
        .bind(bundle.category.as_str())
        .bind(&bundle.sizes)
        .bind(&bundle.content_description)
        .bind(bundle.base_price)
        .bind(bundle.state.as_str())
        .bind(&bundle.scan_code)
        .bind(&bundle.notes)
        .bind(bundle.created_at)
        .execute(&self.pool)
        .await
        .map_err(duplicate_as("scan code"))?;
        Ok(bundle)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Bundle>> {
        sqlx::query_as::<_, BundleRow>(&format!(
            "SELECT {} FROM bundles WHERE id = $1",
            BUNDLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn get_by_scan_code(&self, code: &str) -> AppResult<Option<Bundle>> {
        sqlx::query_as::<_, BundleRow>(&format!(
            "SELECT {} FROM bundles WHERE scan_code = $1",
            BUNDLE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> AppResult<Vec<Bundle>> {
        let rows = sqlx::query_as::<_, BundleRow>(&format!(
            "SELECT {} FROM bundles WHERE id = ANY($1)",
            BUNDLE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<Uuid, Bundle> = HashMap::with_capacity(rows.len());
        for row in rows {
            let bundle: Bundle = row.try_into()?;
            by_id.insert(bundle.id, bundle);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn list(&self, filter: &BundleFilter) -> AppResult<Vec<Bundle>> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM bundles WHERE TRUE", BUNDLE_COLUMNS));
        if let Some(state) = filter.state {
            qb.push(" AND state = ").push_bind(state.as_str());
        }
        if let Some(garment_type) = filter.garment_type {
            qb.push(" AND garment_type = ").push_bind(garment_type.as_str());
        }
        if let Some(season) = filter.season {
            qb.push(" AND season = ").push_bind(season.as_str());
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(po) = filter.purchase_order_id {
            qb.push(" AND purchase_order_id = ").push_bind(po);
        }
        qb.push(" ORDER BY created_at DESC");

        qb.build_query_as::<BundleRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }

    async fn update_details(&self, bundle: &Bundle) -> AppResult<Bundle> {
        let row = sqlx::query_as::<_, BundleRow>(&format!(
            r#"
            UPDATE bundles
            SET garment_type = $2, season = $3, category = $4, sizes = $5,
                content_description = $6, base_price = $7, notes = $8
            WHERE id = $1
            RETURNING {}
            "#,
            BUNDLE_COLUMNS
        ))
        .bind(bundle.id)
        .bind(bundle.garment_type.as_str())
        .bind(bundle.season.as_str())
        .bind(bundle.category.as_str())
        .bind(&bundle.sizes)
        .bind(&bundle.content_description)
        .bind(bundle.base_price)
        .bind(&bundle.notes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Bundle".to_string()))?;
        row.try_into()
    }

    async fn compare_and_set_states(
        &self,
        ids: &[Uuid],
        from: BundleState,
        to: BundleState,
    ) -> AppResult<CasOutcome> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, state FROM bundles WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        let ready: HashMap<Uuid, bool> = locked
            .into_iter()
            .map(|(id, state)| (id, state == from.as_str()))
            .collect();
        let offending: Vec<Uuid> = ids
            .iter()
            .filter(|id| !ready.get(*id).copied().unwrap_or(false))
            .copied()
            .collect();
        if !offending.is_empty() {
            tx.rollback().await?;
            return Ok(CasOutcome::Rejected { offending });
        }

        sqlx::query("UPDATE bundles SET state = $1 WHERE id = ANY($2)")
            .bind(to.as_str())
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(CasOutcome::Applied)
    }

    async fn count_by_state(&self, state: BundleState) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bundles WHERE state = $1")
            .bind(state.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl ListRepository for PgStore {
    async fn insert(&self, list: CatalogList) -> AppResult<CatalogList> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO catalog_lists (id, name, list_type, active, share_token, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(list.id)
        .bind(&list.name)
        .bind(list.list_type.as_str())
        .bind(list.active)
        .bind(&list.share_token)
        .bind(list.created_at)
        .execute(&mut *tx)
        .await
        .map_err(duplicate_as("share token"))?;

        for bundle_id in &list.bundle_ids {
            sqlx::query("INSERT INTO catalog_list_bundles (list_id, bundle_id) VALUES ($1, $2)")
                .bind(list.id)
                .bind(bundle_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(list)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<CatalogList>> {
        self.fetch_list(id).await
    }

    async fn get_by_share_token(&self, token: &str) -> AppResult<Option<CatalogList>> {
        let row = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {} FROM catalog_lists WHERE share_token = $1",
            LIST_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate_lists(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list(&self) -> AppResult<Vec<CatalogList>> {
        let rows = sqlx::query_as::<_, ListRow>(&format!(
            "SELECT {} FROM catalog_lists ORDER BY created_at DESC",
            LIST_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        self.hydrate_lists(rows).await
    }

    async fn set_active(&self, id: Uuid, active: bool) -> AppResult<Option<CatalogList>> {
        sqlx::query("UPDATE catalog_lists SET active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.fetch_list(id).await
    }

    async fn assign_share_token(&self, id: Uuid, token: &str) -> AppResult<Option<CatalogList>> {
        sqlx::query(
            "UPDATE catalog_lists SET share_token = $1 WHERE id = $2 AND share_token IS NULL",
        )
        .bind(token)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(duplicate_as("share token"))?;
        self.fetch_list(id).await
    }

    async fn add_bundle(&self, id: Uuid, bundle_id: Uuid) -> AppResult<Option<CatalogList>> {
        if self.fetch_list(id).await?.is_none() {
            return Ok(None);
        }
        sqlx::query(
            "INSERT INTO catalog_list_bundles (list_id, bundle_id) VALUES ($1, $2) \
             ON CONFLICT (list_id, bundle_id) DO NOTHING",
        )
        .bind(id)
        .bind(bundle_id)
        .execute(&self.pool)
        .await?;
        self.fetch_list(id).await
    }

    async fn remove_bundle(&self, id: Uuid, bundle_id: Uuid) -> AppResult<Option<CatalogList>> {
        sqlx::query("DELETE FROM catalog_list_bundles WHERE list_id = $1 AND bundle_id = $2")
            .bind(id)
            .bind(bundle_id)
            .execute(&self.pool)
            .await?;
        self.fetch_list(id).await
    }
}

#[async_trait]
impl QuotationRepository for PgStore {
    async fn insert(&self, quotation: Quotation) -> AppResult<Quotation> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO quotations
                (id, tracking_code, list_id, customer_name, customer_phone, customer_email,
                 state, global_discount, original_total, total, expires_at,
                 created_at, updated_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(quotation.id)
        .bind(&quotation.tracking_code)
        .bind(quotation.list_id)
        .bind(&quotation.customer_name)
        .bind(&quotation.customer_phone)
        .bind(&quotation.customer_email)
        .bind(quotation.state.as_str())
        .bind(quotation.global_discount)
        .bind(quotation.original_total)
        .bind(quotation.total)
        .bind(quotation.expires_at)
        .bind(quotation.created_at)
        .bind(quotation.updated_at)
        .bind(quotation.version)
        .execute(&mut *tx)
        .await
        .map_err(duplicate_as("tracking code"))?;

        Self::insert_lines(&mut tx, &quotation).await?;
        tx.commit().await?;
        Ok(quotation)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Quotation>> {
        let row = sqlx::query_as::<_, QuotationRow>(&format!(
            "SELECT {} FROM quotations WHERE id = $1",
            QUOTATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.first_quotation(row).await
    }

    async fn get_by_tracking_code(&self, code: &str) -> AppResult<Option<Quotation>> {
        let row = sqlx::query_as::<_, QuotationRow>(&format!(
            "SELECT {} FROM quotations WHERE tracking_code = $1",
            QUOTATION_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        self.first_quotation(row).await
    }

    async fn list(&self, filter: &QuotationFilter) -> AppResult<Vec<Quotation>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM quotations WHERE TRUE",
            QUOTATION_COLUMNS
        ));
        if let Some(state) = filter.state {
            qb.push(" AND state = ").push_bind(state.as_str());
        }
        if let Some(list_id) = filter.list_id {
            qb.push(" AND list_id = ").push_bind(list_id);
        }
        if let Some(after) = filter.expires_after {
            qb.push(" AND expires_at > ").push_bind(after);
        }
        if let Some(before) = filter.expires_before {
            qb.push(" AND expires_at <= ").push_bind(before);
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term);
            qb.push(" AND (customer_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR tracking_code ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb
            .build_query_as::<QuotationRow>()
            .fetch_all(&self.pool)
            .await?;
        self.hydrate_quotations(rows).await
    }

    async fn update(&self, quotation: &Quotation) -> AppResult<Quotation> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE quotations
            SET list_id = $1, customer_name = $2, customer_phone = $3, customer_email = $4,
                state = $5, global_discount = $6, original_total = $7, total = $8,
                expires_at = $9, updated_at = $10, version = version + 1
            WHERE id = $11 AND version = $12
            "#,
        )
        .bind(quotation.list_id)
        .bind(&quotation.customer_name)
        .bind(&quotation.customer_phone)
        .bind(&quotation.customer_email)
        .bind(quotation.state.as_str())
        .bind(quotation.global_discount)
        .bind(quotation.original_total)
        .bind(quotation.total)
        .bind(quotation.expires_at)
        .bind(quotation.updated_at)
        .bind(quotation.id)
        .bind(quotation.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM quotations WHERE id = $1)",
            )
            .bind(quotation.id)
            .fetch_one(&self.pool)
            .await?;
            return Err(if exists {
                AppError::stale("Quotation")
            } else {
                AppError::NotFound("Quotation".to_string())
            });
        }

        sqlx::query("DELETE FROM quotation_lines WHERE quotation_id = $1")
            .bind(quotation.id)
            .execute(&mut *tx)
            .await?;
        Self::insert_lines(&mut tx, quotation).await?;
        tx.commit().await?;

        let mut stored = quotation.clone();
        stored.version += 1;
        Ok(stored)
    }

    async fn compare_and_set_states(
        &self,
        ids: &[Uuid],
        from: QuotationState,
        to: QuotationState,
        at: DateTime<Utc>,
    ) -> AppResult<CasOutcome> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, state FROM quotations WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        let ready: HashMap<Uuid, bool> = locked
            .into_iter()
            .map(|(id, state)| (id, state == from.as_str()))
            .collect();
        let offending: Vec<Uuid> = ids
            .iter()
            .filter(|id| !ready.get(*id).copied().unwrap_or(false))
            .copied()
            .collect();
        if !offending.is_empty() {
            tx.rollback().await?;
            return Ok(CasOutcome::Rejected { offending });
        }

        sqlx::query(
            "UPDATE quotations SET state = $1, updated_at = $2, version = version + 1 \
             WHERE id = ANY($3)",
        )
        .bind(to.as_str())
        .bind(at)
        .bind(ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(CasOutcome::Applied)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM quotations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn insert(&self, payment: Payment) -> AppResult<Payment> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, quotation_id, amount, method, voucher_url, notes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(payment.id)
        .bind(payment.quotation_id)
        .bind(payment.amount)
        .bind(payment.method.as_str())
        .bind(&payment.voucher_url)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(payment)
    }

    async fn list_for_quotation(&self, quotation_id: Uuid) -> AppResult<Vec<Payment>> {
        sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, quotation_id, amount, method, voucher_url, notes, created_at
            FROM payments
            WHERE quotation_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(quotation_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect()
    }

    async fn count_for_quotation(&self, quotation_id: Uuid) -> AppResult<u64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM payments WHERE quotation_id = $1")
                .bind(quotation_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn total_since(&self, since: DateTime<Utc>) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

#[async_trait]
impl DebtLedger for PgStore {
    async fn outstanding_by_supplier(&self) -> AppResult<HashMap<Uuid, Decimal>> {
        let rows = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT supplier_id, amount FROM supplier_debts",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn set_debt(&self, supplier_id: Uuid, amount: Decimal) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO supplier_debts (supplier_id, amount, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (supplier_id)
            DO UPDATE SET amount = EXCLUDED.amount, updated_at = NOW()
            "#,
        )
        .bind(supplier_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
