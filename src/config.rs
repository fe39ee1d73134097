use std::time::Duration;

/// Shape of the detailed timer: where samples are expected to land and the
/// latency objective that should show up as its own histogram boundary.
#[derive(Clone, Debug)]
pub struct TimerConfig {
    pub minimum_expected: Duration,
    pub maximum_expected: Duration,
    pub sla: Duration,
    /// Number of equal-width buckets between the minimum and maximum.
    pub steps: u32,
}

impl TimerConfig {
    /// Histogram boundaries in seconds, ascending, always containing the SLA.
    pub fn buckets(&self) -> Vec<f64> {
        let steps = self.steps.max(1);
        let band = self.maximum_expected.saturating_sub(self.minimum_expected);
        let sla = self.sla.as_secs_f64();

        let mut buckets: Vec<f64> = (0..=steps)
            .map(|i| (self.minimum_expected + band * i / steps).as_secs_f64())
            .filter(|bound| (bound - sla).abs() > 1e-9)
            .collect();
        buckets.push(sla);
        buckets.sort_by(f64::total_cmp);
        buckets
    }
}

/// Shape of the value distribution summary.
#[derive(Clone, Debug)]
pub struct SummaryConfig {
    /// Every recorded value is multiplied by this factor.
    pub scale: f64,
    pub minimum_expected: f64,
    pub maximum_expected: f64,
    /// Samples older than this drop out of the rolling quantile window.
    pub expiry: Duration,
}

impl SummaryConfig {
    /// One bucket per unit step across the expected range.
    pub fn buckets(&self) -> Vec<f64> {
        let mut buckets = Vec::new();
        let mut bound = self.minimum_expected;
        while bound <= self.maximum_expected {
            buckets.push(bound);
            bound += 1.0;
        }
        buckets
    }
}

/// Everything the Prometheus recorder needs to know, kept out of the pricing
/// code so that it only deals with plain metric handles.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    pub common_labels: Vec<(String, String)>,
    pub denied_path_prefixes: Vec<String>,
    pub denied_path_fragments: Vec<String>,
    pub quantiles: Vec<f64>,
    pub detailed_timer: TimerConfig,
    pub value_summary: SummaryConfig,
    pub http_duration_buckets: Vec<f64>,
}

impl MetricsConfig {
    pub fn with_common_labels(host: &str, service: &str, region: &str) -> Self {
        Self {
            common_labels: vec![
                ("host".to_string(), host.to_string()),
                ("service".to_string(), service.to_string()),
                ("region".to_string(), region.to_string()),
            ],
            ..Self::default()
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            common_labels: vec![
                ("host".to_string(), "localhost".to_string()),
                ("service".to_string(), "cafeservice".to_string()),
                ("region".to_string(), "EU-WEST-1".to_string()),
            ],
            denied_path_prefixes: vec!["/admin".to_string()],
            denied_path_fragments: vec!["favicon".to_string()],
            quantiles: vec![0.5, 0.95],
            detailed_timer: TimerConfig {
                minimum_expected: Duration::from_millis(450),
                maximum_expected: Duration::from_millis(550),
                sla: Duration::from_millis(500),
                steps: 4,
            },
            value_summary: SummaryConfig {
                scale: 10.0,
                minimum_expected: 20.0,
                maximum_expected: 30.0,
                expiry: Duration::from_secs(60 * 60),
            },
            http_duration_buckets: vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// Bounds of the simulated work performed on every pricing call.
#[derive(Clone, Copy, Debug)]
pub struct WorkConfig {
    pub min: Duration,
    pub spread: Duration,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(450),
            spread: Duration::from_millis(100),
        }
    }
}
