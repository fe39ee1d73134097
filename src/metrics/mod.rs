pub mod filter;
pub mod middleware;
pub mod router;

pub const DRINK_PRICE_CALLS: &str = "drink_price_calls_total";
pub const DRINK_PRICE_WORK_DURATION: &str = "drink_price_work_duration_seconds";
pub const DRINK_PRICE_DURATION: &str = "drink_price_duration_seconds";
pub const DRINK_PRICE_VALUES: &str = "drink_price_values";

pub const HTTP_REQUESTS: &str = "http_requests_total";
pub const HTTP_REQUESTS_DURATION: &str = "http_requests_duration_seconds";

/// Label carrying the request path on HTTP metrics. The deny filter keys on it.
pub const PATH_LABEL: &str = "path";
