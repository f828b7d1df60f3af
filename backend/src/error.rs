//! Error handling for the Bundle Back-Office
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::PricingError;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Lifecycle errors
    #[error("Invalid state transition: {message}")]
    InvalidTransition {
        message: String,
        /// Entities whose state blocked the operation
        offending: Vec<Uuid>,
    },

    #[error("Bundles unavailable: {0:?}")]
    BundleUnavailable(Vec<Uuid>),

    // Pricing errors
    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),

    #[error("Quotation has no lines")]
    EmptyQuotation,

    #[error("Computed total is negative: {0}")]
    NegativeTotal(Decimal),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Could not generate a unique {0}")]
    DuplicateToken(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_es: String,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Transition refused because of the state of a single entity
    pub fn invalid_transition(id: Uuid, message: impl Into<String>) -> Self {
        AppError::InvalidTransition {
            message: message.into(),
            offending: vec![id],
        }
    }

    pub fn validation(field: &str, message: &str, message_es: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        }
    }

    /// Stored version moved on since the entity was read
    pub fn stale(resource: &str) -> Self {
        AppError::Conflict {
            resource: resource.to_string(),
            message: format!("{} was modified concurrently, retry the operation", resource),
            message_es: format!("{} fue modificado por otra operación, intente nuevamente", resource),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidDiscount(msg) => AppError::InvalidDiscount(msg),
            PricingError::NegativeTotal(total) => AppError::NegativeTotal(total),
            PricingError::InvalidAmount(msg) => AppError::Validation {
                field: "precio_unitario".to_string(),
                message_es: format!("Monto inválido: {}", msg),
                message: msg,
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), "Invalid input".to_string()));

        AppError::Validation {
            message_es: format!("Valor inválido para {}", field),
            field,
            message,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<Uuid>>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: String, message_es: String) -> Self {
        Self {
            code: code.to_string(),
            message_en,
            message_es,
            field: None,
            ids: None,
        }
    }
}

impl AppError {
    /// HTTP status and response body for this error
    pub fn to_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidTransition { message, offending } => {
                let mut detail = ErrorDetail::new(
                    "INVALID_TRANSITION",
                    message.clone(),
                    format!("No se puede cambiar el estado: {}", message),
                );
                if !offending.is_empty() {
                    detail.ids = Some(offending.clone());
                }
                (StatusCode::UNPROCESSABLE_ENTITY, detail)
            }
            AppError::BundleUnavailable(ids) => {
                let mut detail = ErrorDetail::new(
                    "BUNDLE_UNAVAILABLE",
                    format!("{} bundle(s) are no longer available", ids.len()),
                    format!("{} saco(s) ya no están disponibles", ids.len()),
                );
                detail.ids = Some(ids.clone());
                (StatusCode::CONFLICT, detail)
            }
            AppError::InvalidDiscount(msg) => {
                let mut detail = ErrorDetail::new(
                    "INVALID_DISCOUNT",
                    format!("Invalid discount: {}", msg),
                    format!("Descuento inválido: {}", msg),
                );
                detail.field = Some("descuento".to_string());
                (StatusCode::BAD_REQUEST, detail)
            }
            AppError::EmptyQuotation => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new(
                    "EMPTY_QUOTATION",
                    "A quotation needs at least one line".to_string(),
                    "La proforma debe tener al menos una línea".to_string(),
                ),
            ),
            AppError::NegativeTotal(total) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "NEGATIVE_TOTAL",
                    format!("Computed total {} is negative", total),
                    format!("El total calculado {} es negativo", total),
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(
                    "NOT_FOUND",
                    format!("{} not found", resource),
                    format!("No se encontró {}", resource),
                ),
            ),
            AppError::DuplicateToken(kind) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(
                    "DUPLICATE_TOKEN",
                    format!("Could not generate a unique {}, retry the operation", kind),
                    format!("No se pudo generar un {} único, intente nuevamente", kind),
                ),
            ),
            AppError::Validation {
                field,
                message,
                message_es,
            } => {
                let mut detail =
                    ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_es.clone());
                detail.field = Some(field.clone());
                (StatusCode::BAD_REQUEST, detail)
            }
            AppError::Conflict {
                resource,
                message,
                message_es,
            } => {
                let mut detail = ErrorDetail::new("CONFLICT", message.clone(), message_es.clone());
                detail.field = Some(resource.clone());
                (StatusCode::CONFLICT, detail)
            }
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    "Ocurrió un error en la base de datos".to_string(),
                ),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(
                    "INTERNAL_ERROR",
                    msg.clone(),
                    "Error interno del servidor".to_string(),
                ),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.to_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
