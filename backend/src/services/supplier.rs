//! Supplier management

use serde::Deserialize;
use shared::{validate_peru_phone, Supplier};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::repository::Repositories;
use crate::AppState;

#[derive(Clone)]
pub struct SupplierService {
    repos: Repositories,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[serde(rename = "nombre")]
    #[validate(length(min = 1, max = 200, message = "Supplier name is required"))]
    pub name: String,
    #[serde(rename = "contacto", default)]
    #[validate(length(max = 200))]
    pub contact: Option<String>,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "activo", default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl SupplierService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
        }
    }

    pub async fn create(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::validation(
                "nombre",
                "Supplier name is required",
                "El nombre del proveedor es obligatorio",
            ));
        }

        let phone = input.phone.filter(|p| !p.trim().is_empty());
        if let Some(phone) = &phone {
            validate_peru_phone(phone).map_err(|msg| {
                AppError::validation("telefono", msg, "Número de celular inválido")
            })?;
        }

        let supplier = self
            .repos
            .suppliers
            .insert(Supplier {
                id: Uuid::new_v4(),
                name: name.to_string(),
                contact: input.contact.filter(|c| !c.trim().is_empty()),
                phone,
                active: input.active,
            })
            .await?;

        tracing::info!("Created supplier {} ({})", supplier.name, supplier.id);
        Ok(supplier)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Supplier> {
        self.repos
            .suppliers
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn list(&self) -> AppResult<Vec<Supplier>> {
        self.repos.suppliers.list().await
    }
}
