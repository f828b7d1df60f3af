//! Bundle reception, tagging and lookup
//!
//! Bundles enter as Received with a generated scan code and become sellable
//! once tagged. Reserved and Sold are driven only by the quotation lifecycle.

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    normalize_sizes, validate_base_price, validate_sizes, Bundle, BundleState, Category,
    GarmentType, PaginatedResponse, Pagination, Season,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::repository::{BundleFilter, CasOutcome};
use crate::tokens::with_unique_token;
use crate::AppState;

#[derive(Clone)]
pub struct BundleService {
    state: AppState,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReceiveBundleInput {
    #[serde(rename = "pedido_id", default)]
    pub purchase_order_id: Option<Uuid>,
    #[serde(rename = "tipo")]
    pub garment_type: GarmentType,
    #[serde(rename = "temporada")]
    pub season: Season,
    #[serde(rename = "categoria")]
    pub category: Category,
    #[serde(rename = "tallas_incluidas")]
    pub sizes: Vec<String>,
    #[serde(rename = "descripcion_contenido", default)]
    #[validate(length(max = 1000))]
    pub content_description: String,
    #[serde(rename = "precio_base")]
    pub base_price: Decimal,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

/// Descriptive fields that may be corrected before a bundle is reserved
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBundleInput {
    #[serde(rename = "tipo", default)]
    pub garment_type: Option<GarmentType>,
    #[serde(rename = "temporada", default)]
    pub season: Option<Season>,
    #[serde(rename = "categoria", default)]
    pub category: Option<Category>,
    #[serde(rename = "tallas_incluidas", default)]
    pub sizes: Option<Vec<String>>,
    #[serde(rename = "descripcion_contenido", default)]
    #[validate(length(max = 1000))]
    pub content_description: Option<String>,
    #[serde(rename = "precio_base", default)]
    pub base_price: Option<Decimal>,
    #[serde(rename = "observaciones", default)]
    pub notes: Option<String>,
}

fn check_price(price: Decimal) -> AppResult<()> {
    validate_base_price(price).map_err(|msg| {
        AppError::validation(
            "precio_base",
            msg,
            "El precio base debe ser mayor a cero, con hasta dos decimales",
        )
    })
}

fn check_sizes(sizes: &[String]) -> AppResult<Vec<String>> {
    validate_sizes(sizes).map_err(|msg| {
        AppError::validation("tallas_incluidas", msg, "Debe incluir al menos una talla")
    })?;
    Ok(normalize_sizes(sizes))
}

impl BundleService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    /// Register a bundle arriving at the warehouse
    pub async fn receive(&self, input: ReceiveBundleInput) -> AppResult<Bundle> {
        input.validate()?;
        check_price(input.base_price)?;
        let sizes = check_sizes(&input.sizes)?;

        if let Some(order_id) = input.purchase_order_id {
            let order = self
                .state
                .repos
                .purchase_orders
                .get(order_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;
            if !order.state.accepts_reception() {
                return Err(AppError::invalid_transition(
                    order_id,
                    format!("purchase order is {} and cannot receive bundles", order.state),
                ));
            }
        }

        let draft = Bundle {
            id: Uuid::new_v4(),
            purchase_order_id: input.purchase_order_id,
            garment_type: input.garment_type,
            season: input.season,
            category: input.category,
            sizes,
            content_description: input.content_description.trim().to_string(),
            base_price: input.base_price,
            state: BundleState::Received,
            scan_code: String::new(),
            notes: input.notes,
            created_at: self.state.clock.now(),
        };

        let repo = self.state.repos.bundles.clone();
        let tokens = self.state.tokens.clone();
        let bundle = with_unique_token(
            "scan code",
            self.state.config.lifecycle.token_max_attempts,
            || tokens.scan_code(),
            |code| {
                let repo = repo.clone();
                let mut bundle = draft.clone();
                bundle.scan_code = code;
                async move { repo.insert(bundle).await }
            },
        )
        .await?;

        if let Some(order_id) = bundle.purchase_order_id {
            self.state
                .repos
                .purchase_orders
                .increment_bundle_count(order_id, 1)
                .await?;
        }

        tracing::info!(
            "Received bundle {} ({}, {})",
            bundle.scan_code,
            bundle.garment_type.as_str(),
            bundle.base_price
        );
        Ok(bundle)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Bundle> {
        self.state
            .repos
            .bundles
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Bundle".to_string()))
    }

    pub async fn get_by_scan_code(&self, code: &str) -> AppResult<Bundle> {
        self.state
            .repos
            .bundles
            .get_by_scan_code(code.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Bundle".to_string()))
    }

    pub async fn list(
        &self,
        filter: BundleFilter,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<Bundle>> {
        let bundles = self.state.repos.bundles.list(&filter).await?;
        Ok(PaginatedResponse::from_items(bundles, pagination))
    }

    pub async fn update(&self, id: Uuid, input: UpdateBundleInput) -> AppResult<Bundle> {
        input.validate()?;
        let _guard = self.state.locks.lock(id).await;
        let mut bundle = self.get(id).await?;

        if !bundle.state.is_editable() {
            return Err(AppError::invalid_transition(
                id,
                format!("bundle {} is {} and can no longer be edited", bundle.scan_code, bundle.state),
            ));
        }

        if let Some(garment_type) = input.garment_type {
            bundle.garment_type = garment_type;
        }
        if let Some(season) = input.season {
            bundle.season = season;
        }
        if let Some(category) = input.category {
            bundle.category = category;
        }
        if let Some(sizes) = input.sizes {
            bundle.sizes = check_sizes(&sizes)?;
        }
        if let Some(description) = input.content_description {
            bundle.content_description = description.trim().to_string();
        }
        if let Some(price) = input.base_price {
            check_price(price)?;
            bundle.base_price = price;
        }
        if input.notes.is_some() {
            bundle.notes = input.notes;
        }

        let stored = self.state.repos.bundles.update_details(&bundle).await?;
        tracing::info!("Updated bundle {}", stored.scan_code);
        Ok(stored)
    }

    /// Tag a received bundle, making it available for sale
    pub async fn tag(&self, id: Uuid) -> AppResult<Bundle> {
        let bundle = self.get(id).await?;
        match self
            .state
            .repos
            .bundles
            .compare_and_set_states(&[id], BundleState::Received, BundleState::Available)
            .await?
        {
            CasOutcome::Applied => {
                tracing::info!("Tagged bundle {}", bundle.scan_code);
                self.get(id).await
            }
            CasOutcome::Rejected { offending } => Err(AppError::InvalidTransition {
                message: format!("bundle {} is {} and cannot be tagged", bundle.scan_code, bundle.state),
                offending,
            }),
        }
    }
}
