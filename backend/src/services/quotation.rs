//! Quotation lifecycle service
//!
//! Issue, reserve, settle, expire and dispatch quotations. Every transition
//! on one quotation runs under that quotation's entity lock and is written
//! with a version check. Bundle state follows the quotation: reserving takes
//! bundles Available -> Reserved in one compare-and-set, settling moves them
//! to Sold, and expiry or deletion hands them back.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    compute_totals, outstanding_balance, validate_customer_name, validate_email,
    validate_peru_phone, Bundle,
    BundleState, DispatchManifest, PaginatedResponse, Pagination, PricingLine, Quotation,
    QuotationLine, QuotationState, QuotationTotals,
};
use uuid::Uuid;
use validator::Validate;

use crate::clock::Clock;
use crate::config::LifecycleConfig;
use crate::error::{AppError, AppResult};
use crate::locks::EntityLocks;
use crate::repository::{CasOutcome, QuotationFilter, Repositories};
use crate::tokens::{with_unique_token, TokenGenerator};
use crate::AppState;

/// Quotation lifecycle service
#[derive(Clone)]
pub struct QuotationService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenGenerator>,
    locks: Arc<EntityLocks>,
    lifecycle: LifecycleConfig,
}

/// Input for issuing a quotation from back-office selection
#[derive(Debug, Deserialize, Validate)]
pub struct IssueQuotationInput {
    #[serde(rename = "cliente_nombre")]
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub customer_name: String,
    #[serde(rename = "cliente_telefono", default)]
    pub customer_phone: Option<String>,
    #[serde(rename = "cliente_email", default)]
    pub customer_email: Option<String>,
    #[serde(rename = "lista_id", default)]
    pub list_id: Option<Uuid>,
    #[serde(rename = "descuento_global", default)]
    pub global_discount: Decimal,
    #[serde(rename = "lineas")]
    pub lines: Vec<IssueLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct IssueLineInput {
    #[serde(rename = "saco_id")]
    pub bundle_id: Uuid,
    /// Defaults to the bundle's current base price
    #[serde(rename = "precio_unitario", default)]
    pub unit_price: Option<Decimal>,
    #[serde(rename = "descuento_linea", default)]
    pub line_discount: Decimal,
}

/// Input for a storefront self-checkout
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutInput {
    #[serde(rename = "cliente_nombre")]
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub customer_name: String,
    #[serde(rename = "cliente_telefono", default)]
    pub customer_phone: Option<String>,
    #[serde(rename = "cliente_email", default)]
    pub customer_email: Option<String>,
    #[serde(rename = "saco_ids")]
    pub bundle_ids: Vec<Uuid>,
}

/// Totals preview without persisting anything
#[derive(Debug, Deserialize)]
pub struct PreviewInput {
    #[serde(rename = "lineas")]
    pub lines: Vec<PricingLine>,
    #[serde(rename = "descuento_global", default)]
    pub global_discount: Decimal,
}

/// Discount revision; lines are matched by bundle
#[derive(Debug, Default, Deserialize)]
pub struct ReviseQuotationInput {
    #[serde(rename = "descuento_global", default)]
    pub global_discount: Option<Decimal>,
    #[serde(rename = "lineas", default)]
    pub lines: Vec<LineDiscountInput>,
}

#[derive(Debug, Deserialize)]
pub struct LineDiscountInput {
    #[serde(rename = "saco_id")]
    pub bundle_id: Uuid,
    #[serde(rename = "descuento_linea")]
    pub line_discount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct DispatchInput {
    #[serde(rename = "proforma_ids")]
    pub quotation_ids: Vec<Uuid>,
}

/// What a customer sees on the public tracking page
#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    #[serde(rename = "codigo_seguimiento")]
    pub tracking_code: String,
    #[serde(rename = "estado")]
    pub state: QuotationState,
    #[serde(rename = "cliente_nombre")]
    pub customer_name: String,
    pub total: Decimal,
    #[serde(rename = "total_pagado")]
    pub paid: Decimal,
    #[serde(rename = "saldo_pendiente")]
    pub outstanding: Decimal,
    #[serde(rename = "fecha_expiracion")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(rename = "total_items")]
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
}

struct Customer {
    name: String,
    phone: Option<String>,
    email: Option<String>,
}

impl Customer {
    fn checked(name: &str, phone: Option<String>, email: Option<String>) -> AppResult<Self> {
        validate_customer_name(name).map_err(|msg| {
            AppError::validation("cliente_nombre", msg, "El nombre del cliente es obligatorio")
        })?;

        // Blank optional fields count as absent
        let phone = phone.filter(|p| !p.trim().is_empty());
        if let Some(phone) = &phone {
            validate_peru_phone(phone).map_err(|msg| {
                AppError::validation("cliente_telefono", msg, "Número de celular inválido")
            })?;
        }

        let email = email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        if let Some(email) = &email {
            validate_email(email).map_err(|msg| {
                AppError::validation("cliente_email", msg, "Correo electrónico inválido")
            })?;
        }

        Ok(Self {
            name: name.trim().to_string(),
            phone,
            email,
        })
    }
}

fn ensure_distinct(ids: &[Uuid], field: &str) -> AppResult<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::Validation {
            field: field.to_string(),
            message: format!("Bundle {} appears more than once", dup),
            message_es: format!("El saco {} aparece más de una vez", dup),
        });
    }
    Ok(())
}

fn ensure_transition(quotation: &Quotation, to: QuotationState) -> AppResult<()> {
    if !quotation.state.can_transition_to(to) {
        return Err(AppError::invalid_transition(
            quotation.id,
            format!(
                "quotation {} cannot move from {} to {}",
                quotation.tracking_code, quotation.state, to
            ),
        ));
    }
    Ok(())
}

impl QuotationService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            clock: state.clock.clone(),
            tokens: state.tokens.clone(),
            locks: state.locks.clone(),
            lifecycle: state.config.lifecycle.clone(),
        }
    }

    /// Price lines without persisting anything
    pub fn preview(&self, input: PreviewInput) -> AppResult<QuotationTotals> {
        Ok(compute_totals(&input.lines, input.global_discount)?)
    }

    /// Issue a quotation from back-office selection
    pub async fn issue(&self, input: IssueQuotationInput) -> AppResult<Quotation> {
        input.validate()?;
        let customer = Customer::checked(
            &input.customer_name,
            input.customer_phone,
            input.customer_email,
        )?;

        if input.lines.is_empty() {
            return Err(AppError::EmptyQuotation);
        }
        let bundle_ids: Vec<Uuid> = input.lines.iter().map(|l| l.bundle_id).collect();
        ensure_distinct(&bundle_ids, "lineas")?;

        if let Some(list_id) = input.list_id {
            self.repos
                .lists
                .get(list_id)
                .await?
                .ok_or_else(|| AppError::NotFound("List".to_string()))?;
        }

        let bundles = self.load_bundles(&bundle_ids).await?;
        let lines = input
            .lines
            .iter()
            .zip(&bundles)
            .map(|(line, bundle)| {
                (
                    bundle.id,
                    line.unit_price.unwrap_or(bundle.base_price),
                    line.line_discount,
                )
            })
            .collect();

        let draft = self.draft(customer, input.list_id, input.global_discount, lines)?;
        let quotation = self.insert_with_tracking_code(draft).await?;

        tracing::info!(
            "Issued quotation {} for {} ({} lines, total {})",
            quotation.tracking_code,
            quotation.customer_name,
            quotation.lines.len(),
            quotation.total
        );
        Ok(quotation)
    }

    /// Issue a quotation from a published catalog at base prices
    pub async fn checkout(&self, share_token: &str, input: CheckoutInput) -> AppResult<Quotation> {
        input.validate()?;
        let customer = Customer::checked(
            &input.customer_name,
            input.customer_phone,
            input.customer_email,
        )?;

        let list = self
            .repos
            .lists
            .get_by_share_token(share_token)
            .await?
            .filter(|l| l.active)
            .ok_or_else(|| AppError::NotFound("Catalog".to_string()))?;

        if input.bundle_ids.is_empty() {
            return Err(AppError::EmptyQuotation);
        }
        ensure_distinct(&input.bundle_ids, "saco_ids")?;

        let outside: Vec<Uuid> = input
            .bundle_ids
            .iter()
            .filter(|id| !list.contains(**id))
            .copied()
            .collect();
        if !outside.is_empty() {
            return Err(AppError::Validation {
                field: "saco_ids".to_string(),
                message: format!("{} bundle(s) are not part of this catalog", outside.len()),
                message_es: format!("{} saco(s) no pertenecen a este catálogo", outside.len()),
            });
        }

        let bundles = self.load_bundles(&input.bundle_ids).await?;
        let unavailable: Vec<Uuid> = bundles
            .iter()
            .filter(|b| b.state != BundleState::Available)
            .map(|b| b.id)
            .collect();
        if !unavailable.is_empty() {
            return Err(AppError::BundleUnavailable(unavailable));
        }

        let lines = bundles
            .iter()
            .map(|b| (b.id, b.base_price, Decimal::ZERO))
            .collect();
        let draft = self.draft(customer, Some(list.id), Decimal::ZERO, lines)?;
        let quotation = self.insert_with_tracking_code(draft).await?;

        tracing::info!(
            "Storefront checkout {} from list {} ({} bundles)",
            quotation.tracking_code,
            list.name,
            quotation.lines.len()
        );
        Ok(quotation)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Quotation> {
        self.load(id).await
    }

    pub async fn list(
        &self,
        filter: QuotationFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Quotation>> {
        let quotations = self.repos.quotations.list(&filter).await?;
        Ok(PaginatedResponse::from_items(quotations, pagination))
    }

    /// Public lookup by tracking code
    pub async fn track(&self, tracking_code: &str) -> AppResult<TrackingView> {
        let quotation = self
            .repos
            .quotations
            .get_by_tracking_code(tracking_code.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Quotation".to_string()))?;
        let paid = self.paid_total(quotation.id).await?;

        Ok(TrackingView {
            outstanding: outstanding_balance(quotation.total, paid),
            paid,
            item_count: quotation.lines.len(),
            tracking_code: quotation.tracking_code,
            state: quotation.state,
            customer_name: quotation.customer_name,
            total: quotation.total,
            expires_at: quotation.expires_at,
            created_at: quotation.created_at,
        })
    }

    /// Change discounts while the quotation is still open
    pub async fn revise(&self, id: Uuid, input: ReviseQuotationInput) -> AppResult<Quotation> {
        let _guard = self.locks.lock(id).await;
        let mut quotation = self.load(id).await?;

        if !quotation.state.is_revisable() {
            return Err(AppError::invalid_transition(
                id,
                format!(
                    "quotation {} is {} and can no longer be revised",
                    quotation.tracking_code, quotation.state
                ),
            ));
        }

        if let Some(global) = input.global_discount {
            quotation.global_discount = global;
        }
        for change in &input.lines {
            let line = quotation
                .lines
                .iter_mut()
                .find(|l| l.bundle_id == change.bundle_id)
                .ok_or_else(|| AppError::Validation {
                    field: "lineas".to_string(),
                    message: format!("Bundle {} is not part of this quotation", change.bundle_id),
                    message_es: format!("El saco {} no es parte de esta proforma", change.bundle_id),
                })?;
            line.line_discount = change.line_discount;
        }
        quotation.reprice()?;
        quotation.updated_at = self.clock.now();

        let stored = self.repos.quotations.update(&quotation).await?;
        tracing::info!(
            "Revised quotation {}: total now {}",
            stored.tracking_code,
            stored.total
        );

        if stored.state == QuotationState::Reserved {
            let paid = self.paid_total(id).await?;
            return self.settle_if_covered(stored, paid).await;
        }
        Ok(stored)
    }

    /// Hold every bundle of an issued quotation for the reservation window
    pub async fn reserve(&self, id: Uuid) -> AppResult<Quotation> {
        let _guard = self.locks.lock(id).await;
        let mut quotation = self.load(id).await?;
        ensure_transition(&quotation, QuotationState::Reserved)?;

        let bundle_ids = quotation.bundle_ids();
        if let CasOutcome::Rejected { offending } = self
            .repos
            .bundles
            .compare_and_set_states(&bundle_ids, BundleState::Available, BundleState::Reserved)
            .await?
        {
            tracing::info!(
                "Reservation of {} refused: {} bundle(s) unavailable",
                quotation.tracking_code,
                offending.len()
            );
            return Err(AppError::BundleUnavailable(offending));
        }

        let now = self.clock.now();
        quotation.state = QuotationState::Reserved;
        quotation.expires_at = Some(now + Duration::days(self.lifecycle.reservation_window_days));
        quotation.updated_at = now;

        match self.repos.quotations.update(&quotation).await {
            Ok(stored) => {
                tracing::info!(
                    "Reserved quotation {} until {:?}",
                    stored.tracking_code,
                    stored.expires_at
                );
                Ok(stored)
            }
            Err(err) => {
                self.move_bundles(
                    &bundle_ids,
                    BundleState::Reserved,
                    BundleState::Available,
                    "reserve rollback",
                )
                .await;
                Err(err)
            }
        }
    }

    /// Move a Reserved quotation to Paid once `paid` covers its total
    ///
    /// The caller must hold the quotation's lock.
    pub(crate) async fn settle_if_covered(
        &self,
        quotation: Quotation,
        paid: Decimal,
    ) -> AppResult<Quotation> {
        if quotation.state != QuotationState::Reserved || paid < quotation.total {
            return Ok(quotation);
        }

        let mut quotation = quotation;
        quotation.state = QuotationState::Paid;
        quotation.updated_at = self.clock.now();
        let stored = self.repos.quotations.update(&quotation).await?;

        tracing::info!(
            "Quotation {} paid in full ({} of {})",
            stored.tracking_code,
            paid,
            stored.total
        );
        self.move_bundles(
            &stored.bundle_ids(),
            BundleState::Reserved,
            BundleState::Sold,
            "settle",
        )
        .await;
        Ok(stored)
    }

    /// Expire one reservation if its window has closed; false when nothing changed
    pub async fn expire(&self, id: Uuid) -> AppResult<bool> {
        let _guard = self.locks.lock(id).await;
        let mut quotation = self.load(id).await?;

        let now = self.clock.now();
        if !quotation.is_past_expiry(now) {
            tracing::debug!(
                "Quotation {} not expirable ({}, expires {:?})",
                quotation.tracking_code,
                quotation.state,
                quotation.expires_at
            );
            return Ok(false);
        }

        quotation.state = QuotationState::Expired;
        quotation.updated_at = now;
        let stored = self.repos.quotations.update(&quotation).await?;

        self.move_bundles(
            &stored.bundle_ids(),
            BundleState::Reserved,
            BundleState::Available,
            "expire",
        )
        .await;
        tracing::info!("Reservation {} expired", stored.tracking_code);
        Ok(true)
    }

    /// Expire every reservation whose window closed before now
    pub async fn sweep_expired(&self) -> AppResult<usize> {
        let now = self.clock.now();
        let due = self
            .repos
            .quotations
            .list(&QuotationFilter {
                state: Some(QuotationState::Reserved),
                expires_before: Some(now),
                ..Default::default()
            })
            .await?;

        let mut expired = 0;
        for quotation in due {
            match self.expire(quotation.id).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(
                    "Expiry sweep skipped quotation {}: {}",
                    quotation.tracking_code,
                    err
                ),
            }
        }

        if expired > 0 {
            tracing::info!("Expiry sweep released {} reservation(s)", expired);
        }
        self.locks.prune();
        Ok(expired)
    }

    /// Mark a batch of paid quotations as dispatched, all or none
    pub async fn dispatch(&self, ids: &[Uuid]) -> AppResult<DispatchManifest> {
        if ids.is_empty() {
            return Err(AppError::validation(
                "proforma_ids",
                "At least one quotation is required",
                "Se requiere al menos una proforma",
            ));
        }

        let mut seen = HashSet::with_capacity(ids.len());
        let ids: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        let _guards = self.locks.lock_many(&ids).await;

        let mut quotations = Vec::with_capacity(ids.len());
        let mut offending = Vec::new();
        for id in &ids {
            match self.repos.quotations.get(*id).await? {
                Some(q) if q.state == QuotationState::Paid => quotations.push(q),
                _ => offending.push(*id),
            }
        }
        if !offending.is_empty() {
            return Err(AppError::InvalidTransition {
                message: format!("{} quotation(s) in the batch are not paid", offending.len()),
                offending,
            });
        }

        let now = self.clock.now();
        if let CasOutcome::Rejected { offending } = self
            .repos
            .quotations
            .compare_and_set_states(&ids, QuotationState::Paid, QuotationState::Dispatched, now)
            .await?
        {
            tracing::warn!("Dispatch batch lost a race on {:?}", offending);
            return Err(AppError::InvalidTransition {
                message: format!("{} quotation(s) changed state during dispatch", offending.len()),
                offending,
            });
        }

        for quotation in &mut quotations {
            quotation.state = QuotationState::Dispatched;
            quotation.updated_at = now;
            quotation.version += 1;
        }
        let manifest = DispatchManifest::new(quotations, now);
        tracing::info!(
            "Dispatched {} quotation(s), {} item(s), total {}",
            manifest.quotation_count,
            manifest.item_count,
            manifest.total_amount
        );
        Ok(manifest)
    }

    /// Delete an open or expired quotation that has no payments, releasing
    /// any held bundles
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let _guard = self.locks.lock(id).await;
        let quotation = self.load(id).await?;

        if !quotation.state.is_deletable() {
            return Err(AppError::invalid_transition(
                id,
                format!(
                    "quotation {} is {} and cannot be deleted",
                    quotation.tracking_code, quotation.state
                ),
            ));
        }
        if self.repos.payments.count_for_quotation(id).await? > 0 {
            return Err(AppError::invalid_transition(
                id,
                format!(
                    "quotation {} has recorded payments and cannot be deleted",
                    quotation.tracking_code
                ),
            ));
        }

        if !self.repos.quotations.delete(id).await? {
            return Err(AppError::NotFound("Quotation".to_string()));
        }
        if quotation.state == QuotationState::Reserved {
            self.move_bundles(
                &quotation.bundle_ids(),
                BundleState::Reserved,
                BundleState::Available,
                "delete",
            )
            .await;
        }

        tracing::info!("Deleted quotation {}", quotation.tracking_code);
        Ok(())
    }

    pub(crate) async fn load(&self, id: Uuid) -> AppResult<Quotation> {
        self.repos
            .quotations
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Quotation".to_string()))
    }

    pub(crate) async fn paid_total(&self, id: Uuid) -> AppResult<Decimal> {
        Ok(self
            .repos
            .payments
            .list_for_quotation(id)
            .await?
            .iter()
            .map(|p| p.amount)
            .sum())
    }

    /// Bundles for `ids` in the same order; NotFound names the first missing id
    async fn load_bundles(&self, ids: &[Uuid]) -> AppResult<Vec<Bundle>> {
        let bundles = self.repos.bundles.get_many(ids).await?;
        if bundles.len() != ids.len() {
            let found: HashSet<Uuid> = bundles.iter().map(|b| b.id).collect();
            let missing = ids.iter().find(|id| !found.contains(id)).copied();
            return Err(AppError::NotFound(match missing {
                Some(id) => format!("Bundle {}", id),
                None => "Bundle".to_string(),
            }));
        }
        Ok(bundles)
    }

    fn draft(
        &self,
        customer: Customer,
        list_id: Option<Uuid>,
        global_discount: Decimal,
        lines: Vec<(Uuid, Decimal, Decimal)>,
    ) -> AppResult<Quotation> {
        let id = Uuid::new_v4();
        let now = self.clock.now();

        let mut quotation = Quotation {
            id,
            tracking_code: String::new(),
            list_id,
            customer_name: customer.name,
            customer_phone: customer.phone,
            customer_email: customer.email,
            state: QuotationState::Issued,
            global_discount,
            original_total: Decimal::ZERO,
            total: Decimal::ZERO,
            expires_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
            lines: lines
                .into_iter()
                .map(|(bundle_id, unit_price, line_discount)| QuotationLine {
                    id: Uuid::new_v4(),
                    quotation_id: id,
                    bundle_id,
                    unit_price,
                    line_discount,
                    subtotal: Decimal::ZERO,
                })
                .collect(),
        };
        quotation.reprice()?;
        Ok(quotation)
    }

    async fn insert_with_tracking_code(&self, draft: Quotation) -> AppResult<Quotation> {
        let repo = self.repos.quotations.clone();
        let tokens = self.tokens.clone();
        with_unique_token(
            "tracking code",
            self.lifecycle.token_max_attempts,
            || tokens.tracking_code(),
            |code| {
                let repo = repo.clone();
                let mut quotation = draft.clone();
                quotation.tracking_code = code;
                async move { repo.insert(quotation).await }
            },
        )
        .await
    }

    /// Best-effort bundle move used after the quotation itself has changed.
    /// Rows no longer in `from` are logged and skipped; the rest still move.
    async fn move_bundles(&self, ids: &[Uuid], from: BundleState, to: BundleState, reason: &str) {
        match self.repos.bundles.compare_and_set_states(ids, from, to).await {
            Ok(CasOutcome::Applied) => {}
            Ok(CasOutcome::Rejected { offending }) => {
                tracing::warn!(
                    "{}: {} bundle(s) were not {}: {:?}",
                    reason,
                    offending.len(),
                    from,
                    offending
                );
                let rest: Vec<Uuid> = ids
                    .iter()
                    .filter(|id| !offending.contains(id))
                    .copied()
                    .collect();
                if rest.is_empty() {
                    return;
                }
                match self.repos.bundles.compare_and_set_states(&rest, from, to).await {
                    Ok(CasOutcome::Applied) => {}
                    Ok(CasOutcome::Rejected { offending }) => {
                        tracing::warn!("{}: gave up moving bundles {:?}", reason, offending)
                    }
                    Err(err) => tracing::warn!("{}: could not move bundles: {}", reason, err),
                }
            }
            Err(err) => tracing::warn!("{}: could not move bundles: {}", reason, err),
        }
    }
}

/// Run the expiry sweep on a fixed interval for the life of the process
pub fn spawn_expiry_sweeper(state: AppState) -> tokio::task::JoinHandle<()> {
    let period = std::time::Duration::from_secs(
        state.config.lifecycle.expiry_sweep_interval_secs.max(1),
    );
    tokio::spawn(async move {
        let service = QuotationService::new(&state);
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Err(e) = service.sweep_expired().await {
                tracing::error!("expiry sweep error: {}", e);
            }
        }
    })
}
