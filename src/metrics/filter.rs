use ::metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};

use crate::config::MetricsConfig;
use crate::metrics::PATH_LABEL;

/// Request paths whose metrics must never be exported: anything under an
/// administrative prefix and anything mentioning a denied fragment.
#[derive(Clone, Debug, Default)]
pub struct PathRules {
    prefixes: Vec<String>,
    fragments: Vec<String>,
}

impl PathRules {
    pub fn new(prefixes: Vec<String>, fragments: Vec<String>) -> Self {
        Self {
            prefixes,
            fragments,
        }
    }

    pub fn is_denied(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
            || self.fragments.iter().any(|f| path.contains(f.as_str()))
    }
}

impl From<&MetricsConfig> for PathRules {
    fn from(config: &MetricsConfig) -> Self {
        Self::new(
            config.denied_path_prefixes.clone(),
            config.denied_path_fragments.clone(),
        )
    }
}

/// Wraps a recorder and silences every metric whose `path` label is denied by
/// its [`PathRules`]. Denied metrics get no-op handles, so they never reach the
/// exporter.
#[derive(Debug)]
pub struct DenyPathRecorder<R> {
    inner: R,
    rules: PathRules,
}

impl<R> DenyPathRecorder<R> {
    pub fn new(inner: R, rules: PathRules) -> Self {
        Self { inner, rules }
    }

    fn is_denied(&self, key: &Key) -> bool {
        key.labels()
            .filter(|label| label.key() == PATH_LABEL)
            .any(|label| self.rules.is_denied(label.value()))
    }
}

impl<R: Recorder> Recorder for DenyPathRecorder<R> {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.inner.describe_counter(key, unit, description);
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.inner.describe_gauge(key, unit, description);
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.inner.describe_histogram(key, unit, description);
    }

    fn register_counter(&self, key: &Key, metadata: &Metadata<'_>) -> Counter {
        if self.is_denied(key) {
            return Counter::noop();
        }
        self.inner.register_counter(key, metadata)
    }

    fn register_gauge(&self, key: &Key, metadata: &Metadata<'_>) -> Gauge {
        if self.is_denied(key) {
            return Gauge::noop();
        }
        self.inner.register_gauge(key, metadata)
    }

    fn register_histogram(&self, key: &Key, metadata: &Metadata<'_>) -> Histogram {
        if self.is_denied(key) {
            return Histogram::noop();
        }
        self.inner.register_histogram(key, metadata)
    }
}
