use anyhow::{Context, Result};
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Drinks the generator asks for. Every entry is reachable, so the unknown
/// `duvel` keeps the conflict path under load as well.
pub const DRINKS: [&str; 3] = ["beer", "cola", "duvel"];

/// Keeps the price endpoint busy by requesting random drinks back to back.
pub struct LoadGenerator {
    client: Client,
    base_url: String,
}

impl LoadGenerator {
    /// Creates a generator targeting the service at `base_url`
    /// (e.g. `http://127.0.0.1:8080`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("cafeservice-load-generator")
            .timeout(Duration::from_secs(30))
            .build()
            .context("building HTTP client failed")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issues requests until `cancel_token` is cancelled and returns how many
    /// were completed.
    ///
    /// Client errors (an unknown drink answered with 409) are expected and
    /// dropped without a trace. Anything else is logged at debug level and the
    /// loop carries on without backing off.
    pub async fn run(&self, cancel_token: CancellationToken) -> u64 {
        info!(target_url = %self.base_url, "Load generator started");
        let mut completed: u64 = 0;

        loop {
            let drink = pick_drink();

            tokio::select! {
                biased;
                () = cancel_token.cancelled() => break,
                result = self.request_price(drink) => {
                    completed = completed.saturating_add(1);
                    match result {
                        Ok(()) => {}
                        Err(e) if e.status().is_some_and(|s| s.is_client_error()) => {}
                        Err(e) => debug!(error = %e, drink, "Load generator request failed"),
                    }
                }
            }
        }

        info!(completed, "Load generator stopped");
        completed
    }

    async fn request_price(&self, drink: &str) -> Result<(), reqwest::Error> {
        let url = format!("{}/drink/{drink}/price", self.base_url);
        self.client.get(url).send().await?.error_for_status()?;
        Ok(())
    }
}

/// Base URL for reaching the API listener bound at `addr` from this process.
///
/// A wildcard address is replaced by the loopback address of the same family;
/// a concrete address is used as is.
pub fn local_target(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}

fn pick_drink() -> &'static str {
    DRINKS[rand::random_range(0..DRINKS.len())]
}
