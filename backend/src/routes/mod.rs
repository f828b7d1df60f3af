//! Route definitions for the Bundle Back-Office

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Public storefront (unauthenticated - reached from shared links)
        .nest("/public", public_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/bundles", bundle_routes())
        .nest("/lists", list_routes())
        .nest("/quotations", quotation_routes())
        .route("/reports/debt", get(handlers::get_debt_report))
        .route("/dashboard", get(handlers::get_dashboard))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog/:token", get(handlers::get_public_catalog))
        .route("/catalog/:token/checkout", post(handlers::checkout))
        .route("/tracking/:code", get(handlers::track_quotation))
}

fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route("/:supplier_id", get(handlers::get_supplier))
        .route("/:supplier_id/debt", put(handlers::set_supplier_debt))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route("/:order_id", get(handlers::get_purchase_order))
        .route("/:order_id/advance", post(handlers::advance_purchase_order))
}

fn bundle_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_bundles).post(handlers::receive_bundle))
        .route("/scan/:code", get(handlers::get_bundle_by_scan_code))
        .route(
            "/:bundle_id",
            get(handlers::get_bundle).put(handlers::update_bundle),
        )
        .route("/:bundle_id/tag", post(handlers::tag_bundle))
}

fn list_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_lists).post(handlers::create_list))
        .route("/:list_id", get(handlers::get_list))
        .route("/:list_id/bundles", post(handlers::add_list_bundle))
        .route(
            "/:list_id/bundles/:bundle_id",
            delete(handlers::remove_list_bundle),
        )
        .route("/:list_id/activate", post(handlers::activate_list))
        .route("/:list_id/deactivate", post(handlers::deactivate_list))
        .route("/:list_id/publish", post(handlers::publish_list))
}

fn quotation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_quotations).post(handlers::issue_quotation),
        )
        .route("/preview", post(handlers::preview_quotation))
        .route("/dispatch", post(handlers::dispatch_quotations))
        .route("/sweep", post(handlers::sweep_quotations))
        .route(
            "/:quotation_id",
            get(handlers::get_quotation).delete(handlers::delete_quotation),
        )
        .route("/:quotation_id/revise", post(handlers::revise_quotation))
        .route("/:quotation_id/reserve", post(handlers::reserve_quotation))
        .route("/:quotation_id/expire", post(handlers::expire_quotation))
        .route(
            "/:quotation_id/payments",
            get(handlers::get_ledger).post(handlers::record_payment),
        )
}
