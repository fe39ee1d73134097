use anyhow::{anyhow, Result};
use axum::{routing::get, Router};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::future::ready;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MetricsConfig;
use crate::metrics::filter::{DenyPathRecorder, PathRules};
use crate::metrics::{DRINK_PRICE_VALUES, DRINK_PRICE_WORK_DURATION, HTTP_REQUESTS_DURATION};

/// Number of rotating buckets behind each summary's rolling window.
const SUMMARY_BUCKET_COUNT: u32 = 3;
/// How often histogram buffers are drained into the exporter's storage.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

// Creates a new Axum Router for the /metrics endpoint.
// This endpoint will expose metrics in the Prometheus format.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || ready(handle.render())))
}

/// Builds the filtered Prometheus recorder described by `config` without
/// installing it.
///
/// The detailed timer, the value summary and HTTP latencies are exported as
/// histograms; every other histogram becomes a summary with the configured
/// quantiles, aged out over the value summary's expiry.
///
/// # Errors
///
/// Returns an error if the exporter rejects the quantiles, buckets or expiry
/// (an empty quantile or bucket list, or a zero-length summary window).
pub fn build_recorder(
    config: &MetricsConfig,
) -> Result<(DenyPathRecorder<PrometheusRecorder>, PrometheusHandle)> {
    let bucket_duration = config.value_summary.expiry / SUMMARY_BUCKET_COUNT;

    let mut builder = PrometheusBuilder::new()
        .set_quantiles(&config.quantiles)?
        .set_bucket_count(
            NonZeroU32::new(SUMMARY_BUCKET_COUNT).ok_or_else(|| anyhow!("zero summary buckets"))?,
        )
        .set_bucket_duration(bucket_duration)?
        .set_buckets_for_metric(
            Matcher::Full(DRINK_PRICE_WORK_DURATION.to_string()),
            &config.detailed_timer.buckets(),
        )?
        .set_buckets_for_metric(
            Matcher::Full(DRINK_PRICE_VALUES.to_string()),
            &config.value_summary.buckets(),
        )?
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUESTS_DURATION.to_string()),
            &config.http_duration_buckets,
        )?;

    for (key, value) in &config.common_labels {
        builder = builder.add_global_label(key.clone(), value.clone());
    }

    let recorder = builder.build_recorder();
    let handle = recorder.handle();
    let filtered = DenyPathRecorder::new(recorder, PathRules::from(config));

    Ok((filtered, handle))
}

/// Builds the recorder and installs it as the process-wide recorder.
///
/// # Errors
///
/// Returns an error if the configuration is rejected or a global recorder is
/// already installed.
pub fn install_recorder(config: &MetricsConfig) -> Result<PrometheusHandle> {
    let (recorder, handle) = build_recorder(config)?;
    ::metrics::set_global_recorder(recorder)
        .map_err(|_| anyhow!("a global metrics recorder is already installed"))?;

    info!(
        quantiles = ?config.quantiles,
        denied_prefixes = ?config.denied_path_prefixes,
        "Metrics recorder installed"
    );
    Ok(handle)
}

// Periodically drains histogram buffers so scrapes stay cheap and summary
// windows keep rolling even when nobody scrapes.
pub async fn run_upkeep(handle: PrometheusHandle, cancel_token: CancellationToken) {
    let mut interval = tokio::time::interval(UPKEEP_INTERVAL);
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                debug!("Metrics upkeep shutting down");
                break;
            }
            _ = interval.tick() => handle.run_upkeep(),
        }
    }
}
