use ::metrics::{counter, histogram};
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::filter::PathRules;
use crate::metrics::{HTTP_REQUESTS, HTTP_REQUESTS_DURATION, PATH_LABEL};

/// `path` label shared by every request that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

// Records a request counter and a latency histogram for every request.
// Matched requests are labelled with their route template. Unmatched requests
// share one label so that arbitrary 404 paths can't grow the registry, except
// for denied paths, which keep their raw path so the recorder drops them.
pub async fn track_metrics(
    State(rules): State<PathRules>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let path = path_label(&rules, &request);
    let method = request.method().to_string();

    let response = next.run(request).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method),
        (PATH_LABEL, path),
        ("status", status),
    ];

    counter!(HTTP_REQUESTS, &labels).increment(1);
    histogram!(HTTP_REQUESTS_DURATION, &labels).record(latency);

    response
}

fn path_label(rules: &PathRules, request: &Request<Body>) -> String {
    if let Some(matched) = request.extensions().get::<MatchedPath>() {
        return matched.as_str().to_owned();
    }

    let raw = request.uri().path();
    if rules.is_denied(raw) {
        raw.to_owned()
    } else {
        UNMATCHED_PATH.to_owned()
    }
}
