use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::endpoints::{health_handler, price_handler};
use crate::drink_service::DrinkService;
use crate::metrics::filter::PathRules;
use crate::metrics::middleware::track_metrics;

pub const PRICE_ROUTE: &str = "/drink/{drink}/price";
pub const HEALTH_ROUTE: &str = "/admin/health";

// Creates the API router with all the necessary routes and middleware.
// Request metrics are attached with `layer` rather than `route_layer` so that
// unmatched requests, such as browsers asking for a favicon, are seen too.
pub fn api_router(drink_service: Arc<DrinkService>, path_rules: PathRules) -> Router {
    Router::new()
        .route(PRICE_ROUTE, get(price_handler))
        .route(HEALTH_ROUTE, get(health_handler))
        .with_state(drink_service)
        .layer(middleware::from_fn_with_state(path_rules, track_metrics))
        .layer(TraceLayer::new_for_http())
}
