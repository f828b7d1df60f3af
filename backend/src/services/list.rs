//! Curated lists and the public catalog

use serde::{Deserialize, Serialize};
use shared::{
    BundleState, CatalogList, GarmentType, ListType, ListWithBundles, PriceOrder, Season,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::tokens::with_unique_token;
use crate::AppState;

#[derive(Clone)]
pub struct ListService {
    state: AppState,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListInput {
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 200, message = "List name is required"))]
    pub name: String,
    #[serde(rename = "tipo")]
    pub list_type: ListType,
}

#[derive(Debug, Deserialize)]
pub struct AddBundleInput {
    #[serde(rename = "saco_id")]
    pub bundle_id: Uuid,
}

/// Storefront filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(rename = "tipo", default)]
    pub garment_type: Option<GarmentType>,
    #[serde(rename = "temporada", default)]
    pub season: Option<Season>,
    #[serde(rename = "orden", default)]
    pub order: Option<PriceOrder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishedList {
    #[serde(rename = "lista_id")]
    pub list_id: Uuid,
    #[serde(rename = "enlace_publico")]
    pub share_token: String,
}

impl ListService {
    pub fn new(state: &AppState) -> Self {
        Self {
            state: state.clone(),
        }
    }

    pub async fn create(&self, input: CreateListInput) -> AppResult<CatalogList> {
        input.validate()?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::validation(
                "nombre",
                "List name is required",
                "El nombre de la lista es obligatorio",
            ));
        }

        let list = self
            .state
            .repos
            .lists
            .insert(CatalogList {
                id: Uuid::new_v4(),
                name: name.to_string(),
                list_type: input.list_type,
                active: false,
                share_token: None,
                created_at: self.state.clock.now(),
                bundle_ids: Vec::new(),
            })
            .await?;

        tracing::info!("Created {} list {}", list.list_type.as_str(), list.name);
        Ok(list)
    }

    async fn load(&self, id: Uuid) -> AppResult<CatalogList> {
        self.state
            .repos
            .lists
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("List".to_string()))
    }

    async fn with_bundles(&self, list: CatalogList) -> AppResult<ListWithBundles> {
        let bundles = self.state.repos.bundles.get_many(&list.bundle_ids).await?;
        Ok(ListWithBundles { list, bundles })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ListWithBundles> {
        let list = self.load(id).await?;
        self.with_bundles(list).await
    }

    pub async fn list(&self) -> AppResult<Vec<CatalogList>> {
        self.state.repos.lists.list().await
    }

    pub async fn add_bundle(&self, id: Uuid, bundle_id: Uuid) -> AppResult<CatalogList> {
        self.state
            .repos
            .bundles
            .get(bundle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Bundle".to_string()))?;

        let list = self
            .state
            .repos
            .lists
            .add_bundle(id, bundle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("List".to_string()))?;
        tracing::debug!("List {} now has {} bundle(s)", list.name, list.bundle_ids.len());
        Ok(list)
    }

    pub async fn remove_bundle(&self, id: Uuid, bundle_id: Uuid) -> AppResult<CatalogList> {
        self.state
            .repos
            .lists
            .remove_bundle(id, bundle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("List".to_string()))
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> AppResult<CatalogList> {
        let list = self
            .state
            .repos
            .lists
            .set_active(id, active)
            .await?
            .ok_or_else(|| AppError::NotFound("List".to_string()))?;
        tracing::info!(
            "List {} {}",
            list.name,
            if active { "activated" } else { "deactivated" }
        );
        Ok(list)
    }

    /// Assign a share token once; publishing again returns the same token
    pub async fn publish(&self, id: Uuid) -> AppResult<PublishedList> {
        let list = self.load(id).await?;
        if let Some(token) = list.share_token {
            return Ok(PublishedList {
                list_id: id,
                share_token: token,
            });
        }

        let repo = self.state.repos.lists.clone();
        let tokens = self.state.tokens.clone();
        let stored = with_unique_token(
            "share token",
            self.state.config.lifecycle.token_max_attempts,
            || tokens.share_token(),
            |token| {
                let repo = repo.clone();
                async move { repo.assign_share_token(id, &token).await }
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound("List".to_string()))?;

        let share_token = stored
            .share_token
            .ok_or_else(|| AppError::Internal("share token was not stored".to_string()))?;
        tracing::info!("Published list {}", stored.name);
        Ok(PublishedList {
            list_id: id,
            share_token,
        })
    }

    /// Anonymous catalog view: Available members of an active published list
    pub async fn public_catalog(
        &self,
        share_token: &str,
        query: CatalogQuery,
    ) -> AppResult<ListWithBundles> {
        let list = self
            .state
            .repos
            .lists
            .get_by_share_token(share_token)
            .await?
            .filter(CatalogList::is_publicly_browsable)
            .ok_or_else(|| AppError::NotFound("Catalog".to_string()))?;

        let mut view = self.with_bundles(list).await?;
        view.bundles.retain(|b| {
            b.state == BundleState::Available
                && query.garment_type.map_or(true, |t| b.garment_type == t)
                && query.season.map_or(true, |s| b.season == s)
        });
        match query.order {
            Some(PriceOrder::Asc) => view.bundles.sort_by(|a, b| a.base_price.cmp(&b.base_price)),
            Some(PriceOrder::Desc) => view.bundles.sort_by(|a, b| b.base_price.cmp(&a.base_price)),
            None => {}
        }
        Ok(view)
    }
}
