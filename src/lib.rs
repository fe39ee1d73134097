pub mod api;
pub mod config;
pub mod drink_service;
pub mod load_generator;
pub mod metrics;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::router::api_router;
use crate::config::{MetricsConfig, WorkConfig};
use crate::drink_service::{DrinkService, RandomSleep};
use crate::load_generator::{local_target, LoadGenerator};
use crate::metrics::filter::PathRules;
use crate::metrics::router::{install_recorder, metrics_router, run_upkeep};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long, env, default_value = "0.0.0.0:8080")]
    pub listen_addr: String,
    #[clap(long, env, default_value = "0.0.0.0:9090")]
    pub metrics_listen_addr: String,
    #[clap(long, env, default_value = "info")]
    log_level: LevelFilter,
    /// Do not generate sample traffic against the price endpoint
    #[clap(long, env, required(false), default_value_t = false)]
    pub disable_load_generator: bool,
    /// Base URL the load generator calls, defaults to the local API listener
    #[clap(long, env)]
    pub load_generator_target: Option<String>,
    /// Lower bound of each simulated unit of work, in milliseconds
    #[clap(long, env, default_value_t = 450)]
    pub work_min_ms: u64,
    /// Random extra time added to each unit of work, in milliseconds
    #[clap(long, env, default_value_t = 100)]
    pub work_spread_ms: u64,
    #[clap(long, env, default_value = "localhost")]
    pub metrics_host: String,
    #[clap(long, env, default_value = "cafeservice")]
    pub metrics_service: String,
    #[clap(long, env, default_value = "EU-WEST-1")]
    pub metrics_region: String,
}

impl Cli {
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig::with_common_labels(
            &self.metrics_host,
            &self.metrics_service,
            &self.metrics_region,
        )
    }

    pub fn work_config(&self) -> WorkConfig {
        WorkConfig {
            min: Duration::from_millis(self.work_min_ms),
            spread: Duration::from_millis(self.work_spread_ms),
        }
    }
}

/// Runs the cafe service with the provided CLI configuration.
///
/// This function initializes logging and the Prometheus recorder, sets up
/// graceful shutdown handling, creates the drink service, and starts both the
/// API server and metrics server. Unless disabled, a load generator keeps the
/// price endpoint busy until shutdown.
///
/// # Errors
///
/// Returns an error if:
/// - The metrics recorder cannot be built or installed.
/// - Binding to the configured listen addresses fails.
/// - The load generator's HTTP client cannot be built.
///
/// # Panics
///
/// Panics if the Ctrl+C signal handler fails to register.
pub async fn run(cli: Cli) -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(cli.log_level)
        .with(fmt::layer())
        .init();

    // The recorder must be in place before the service registers its handles
    let metrics_config = cli.metrics_config();
    let metrics_handle = install_recorder(&metrics_config)?;

    // Graceful shutdown setup
    let cancel_token = CancellationToken::new();

    let ctrl_c_listener_task = tokio::spawn({
        let cancel_token_clone = cancel_token.clone();
        async move {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for Ctrl+C signal");
            info!("Ctrl+C received, proceeding with graceful shutdown...");
            cancel_token_clone.cancel();
        }
    });

    let work_config = cli.work_config();
    let drink_service = Arc::new(DrinkService::new(
        Box::new(RandomSleep::new(work_config)),
        &metrics_config.value_summary,
    ));
    info!(
        work_min = ?work_config.min,
        work_spread = ?work_config.spread,
        "Drink service created"
    );

    let main_listener = TcpListener::bind(&cli.listen_addr).await?;
    let metrics_listener = TcpListener::bind(&cli.metrics_listen_addr).await?;

    tokio::spawn(run_upkeep(metrics_handle.clone(), cancel_token.clone()));

    if cli.disable_load_generator {
        info!("Load generator disabled");
    } else {
        let target = match cli.load_generator_target {
            Some(target) => target,
            None => local_target(main_listener.local_addr()?),
        };
        let generator = LoadGenerator::new(&target)?;
        let generator_cancel_token = cancel_token.clone();
        tokio::spawn(async move {
            generator.run(generator_cancel_token).await;
        });
    }

    tokio::try_join!(
        start_main_server(
            main_listener,
            drink_service,
            PathRules::from(&metrics_config),
            cancel_token.clone()
        ),
        start_metrics_server(metrics_listener, metrics_handle, cancel_token.clone()),
    )?;

    // Waits for signal before exiting gracefully
    ctrl_c_listener_task.await?;

    info!("All services shut down gracefully.");

    Ok(())
}

async fn start_main_server(
    listener: TcpListener,
    drink_service: Arc<DrinkService>,
    path_rules: PathRules,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Cafe service listening on {}", listener.local_addr()?);

    let shutdown_future = async move {
        cancel_token.cancelled().await;
    };

    axum::serve(listener, api_router(drink_service, path_rules))
        .with_graceful_shutdown(shutdown_future)
        .await?;
    info!("Main server shut down gracefully");
    Ok(())
}

async fn start_metrics_server(
    listener: TcpListener,
    handle: metrics_exporter_prometheus::PrometheusHandle,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Metrics server listening on {}", listener.local_addr()?);

    let shutdown_future = async move {
        cancel_token.cancelled().await;
    };

    axum::serve(listener, metrics_router(handle))
        .with_graceful_shutdown(shutdown_future)
        .await?;
    info!("Metrics server shut down gracefully");
    Ok(())
}
