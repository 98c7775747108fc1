//! Route definitions for the kitchen stock API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes; everything under here requires a bearer token
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/stock-items", stock_routes())
        .nest("/batches", batch_routes())
        .nest("/days", day_routes())
        .nest("/expiry", expiry_routes())
        .route("/waste", get(handlers::list_waste))
        .route("/availability", post(handlers::check_availability))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock ledger routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_items).post(handlers::create_stock_item),
        )
        .route("/:item_id", get(handlers::get_stock_item))
        .route("/:item_id/adjust", post(handlers::adjust_stock))
        .route("/:item_id/deduct", post(handlers::deduct_stock))
        .route("/:item_id/discontinued", put(handlers::set_discontinued))
        .route("/:item_id/movements", get(handlers::list_movements))
}

/// Daily batch routes
fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::add_batch))
        .route("/:date", get(handlers::list_batches))
}

/// Day lifecycle routes
fn day_routes() -> Router<AppState> {
    Router::new()
        .route("/:date", get(handlers::get_day_status))
        .route("/:date/end", post(handlers::end_day))
        .route("/:date/start", post(handlers::start_new_day))
        .route(
            "/:date/previous-remaining",
            get(handlers::previous_day_remaining),
        )
        .route("/:date/import-previous", post(handlers::import_previous_day))
}

/// Expiry processing routes
fn expiry_routes() -> Router<AppState> {
    Router::new()
        .route("/sweep", post(handlers::sweep_expired))
        .route(
            "/refresh-statuses",
            post(handlers::refresh_expired_statuses),
        )
}
