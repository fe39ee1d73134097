//! Shared test utilities for cafe service integration tests.

// Allow dead code since not all test files use all helpers
#![allow(dead_code)]

use axum::body::Body;
use cafeservice::api::router::api_router;
use cafeservice::config::MetricsConfig;
use cafeservice::drink_service::{DrinkService, NoWork};
use cafeservice::metrics::filter::PathRules;
use http_body_util::BodyExt;
use std::sync::Arc;

/// Creates a drink service that skips the simulated work.
pub fn drink_service() -> Arc<DrinkService> {
    Arc::new(DrinkService::new(
        Box::new(NoWork),
        &MetricsConfig::default().value_summary,
    ))
}

/// Creates a test app router backed by a work-free drink service.
pub fn create_app() -> axum::Router {
    api_router(drink_service(), PathRules::from(&MetricsConfig::default()))
}

/// Extracts response body as string.
pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.expect("collect body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body to string")
}

/// Initialize tracing for tests (only once).
///
/// Defaults to `warn` level to reduce noise. Use `RUST_LOG=debug` for verbose output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .with_test_writer()
        .try_init();
}
