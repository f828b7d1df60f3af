//! Bundle Back-Office - backend library
//!
//! Order and inventory lifecycle for an apparel-resale back-office: supplier
//! purchase orders, bundle reception and tagging, public catalogs,
//! quotations with discounts, the payment ledger and supplier debt.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod locks;
pub mod repository;
pub mod routes;
pub mod services;
pub mod tokens;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use locks::EntityLocks;
pub use repository::Repositories;
pub use tokens::{RandomTokenGenerator, TokenGenerator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub tokens: Arc<dyn TokenGenerator>,
    pub locks: Arc<EntityLocks>,
}

impl AppState {
    pub fn new(repos: Repositories, config: Config) -> Self {
        Self {
            repos,
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
            tokens: Arc::new(RandomTokenGenerator),
            locks: Arc::new(EntityLocks::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_tokens(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = tokens;
        self
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Bundle Back-Office API v1.0"
}
