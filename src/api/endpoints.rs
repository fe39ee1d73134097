use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::error;

use crate::drink_service::{DrinkService, PriceError};

impl IntoResponse for PriceError {
    fn into_response(self) -> Response {
        match self {
            PriceError::UnknownDrink => (StatusCode::CONFLICT, self.to_string()).into_response(),
        }
    }
}

// Handler for the drink price endpoint.
// Pricing blocks for the duration of its simulated work, so it runs on the
// blocking pool instead of a runtime worker.
pub async fn price_handler(
    State(service): State<Arc<DrinkService>>,
    Path(drink): Path<String>,
) -> Response {
    let result = tokio::task::spawn_blocking(move || service.price(&drink)).await;

    match result {
        Ok(Ok(price)) => (StatusCode::OK, Json(price)).into_response(),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!(error = ?e, "Pricing task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// Handler for the health check endpoint.
// Returns a 200 OK status code if the server is healthy.
pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}
