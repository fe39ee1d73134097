use metrics::{counter, describe_counter, describe_histogram, histogram, Counter, Histogram, Unit};
use rand::Rng;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{instrument, trace};

use crate::config::{SummaryConfig, WorkConfig};
use crate::metrics::{
    DRINK_PRICE_CALLS, DRINK_PRICE_DURATION, DRINK_PRICE_VALUES, DRINK_PRICE_WORK_DURATION,
};

const BEER_PRICE: u32 = 2;
const COLA_PRICE: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("Unknown drink")]
    UnknownDrink,
}

/// A unit of simulated work performed while computing a price.
///
/// Implementations block the calling thread.
pub trait Workload: Send + Sync {
    fn perform(&self);
}

/// Sleeps for `min` plus a uniformly random share of `spread`.
pub struct RandomSleep {
    config: WorkConfig,
}

impl RandomSleep {
    pub fn new(config: WorkConfig) -> Self {
        Self { config }
    }
}

impl Default for RandomSleep {
    fn default() -> Self {
        Self::new(WorkConfig::default())
    }
}

impl Workload for RandomSleep {
    fn perform(&self) {
        let spread_ms = u64::try_from(self.config.spread.as_millis()).unwrap_or(u64::MAX);
        let jitter = if spread_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..spread_ms)
        };
        std::thread::sleep(self.config.min + Duration::from_millis(jitter));
    }
}

/// Does nothing. Keeps tests off the wall clock.
pub struct NoWork;

impl Workload for NoWork {
    fn perform(&self) {}
}

pub struct DrinkService {
    workload: Box<dyn Workload>,
    value_scale: f64,
    calls: Counter,
    work_duration: Histogram,
    succeeded_duration: Histogram,
    unknown_duration: Histogram,
    values: Histogram,
}

impl DrinkService {
    /// Creates the service and registers its metric handles with the recorder
    /// that is current at this point. Later calls record into those handles
    /// regardless of which recorder is current then.
    pub fn new(workload: Box<dyn Workload>, value_summary: &SummaryConfig) -> Self {
        describe_counter!(DRINK_PRICE_CALLS, "Number of drink price calculations");
        describe_histogram!(
            DRINK_PRICE_WORK_DURATION,
            Unit::Seconds,
            "Duration of the timed unit of work inside a price calculation; p50 and p95 are read from its buckets"
        );
        describe_histogram!(
            DRINK_PRICE_DURATION,
            Unit::Seconds,
            "Duration of a whole price calculation"
        );
        describe_histogram!(
            DRINK_PRICE_VALUES,
            "Distribution summary of requested prices, in scaled euro"
        );

        Self {
            workload,
            value_scale: value_summary.scale,
            calls: counter!(DRINK_PRICE_CALLS),
            work_duration: histogram!(DRINK_PRICE_WORK_DURATION),
            succeeded_duration: histogram!(DRINK_PRICE_DURATION, "outcome" => "success"),
            unknown_duration: histogram!(DRINK_PRICE_DURATION, "outcome" => "unknown_drink"),
            values: histogram!(DRINK_PRICE_VALUES),
        }
    }

    /// Returns the price of `drink`, classified by its first character.
    ///
    /// Blocks for two units of simulated work. Every call counts towards the
    /// call counter and the general timer; only successful calls record a value.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::UnknownDrink`] when `drink` starts with neither
    /// `b` nor `c`, including the empty string.
    #[instrument(skip(self))]
    pub fn price(&self, drink: &str) -> Result<u32, PriceError> {
        let started = Instant::now();
        let result = self.calculate(drink);

        match result {
            Ok(_) => self.succeeded_duration.record(started.elapsed()),
            Err(PriceError::UnknownDrink) => self.unknown_duration.record(started.elapsed()),
        }

        result
    }

    fn calculate(&self, drink: &str) -> Result<u32, PriceError> {
        self.calls.increment(1);

        self.workload.perform();
        let timed = Instant::now();
        self.workload.perform();
        self.work_duration.record(timed.elapsed());

        let price = classify(drink)?;
        trace!(price, "Priced drink");

        self.values.record(f64::from(price) * self.value_scale);
        Ok(price)
    }
}

fn classify(drink: &str) -> Result<u32, PriceError> {
    if drink.starts_with('b') {
        Ok(BEER_PRICE)
    } else if drink.starts_with('c') {
        Ok(COLA_PRICE)
    } else {
        Err(PriceError::UnknownDrink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricsConfig;
    use metrics::SharedString;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use metrics_util::CompositeKey;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service_with_snapshotter(scale: f64) -> (DrinkService, Snapshotter) {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let mut summary = MetricsConfig::default().value_summary;
        summary.scale = scale;

        let service = metrics::with_local_recorder(&recorder, || {
            DrinkService::new(Box::new(NoWork), &summary)
        });
        (service, snapshotter)
    }

    type Entry = (CompositeKey, Option<Unit>, Option<SharedString>, DebugValue);

    fn counter_value(entries: &[Entry], name: &str) -> u64 {
        entries
            .iter()
            .find_map(|(key, _, _, value)| match value {
                DebugValue::Counter(v) if key.key().name() == name => Some(*v),
                _ => None,
            })
            .unwrap_or(0)
    }

    fn histogram_samples(entries: &[Entry], name: &str) -> Vec<f64> {
        entries
            .iter()
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Histogram(v) if key.key().name() == name => Some(v),
                _ => None,
            })
            .flatten()
            .map(|s| s.0)
            .collect()
    }

    struct CountingWork(Arc<AtomicUsize>);

    impl Workload for CountingWork {
        fn perform(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn names_starting_with_b_cost_two() {
        let (service, _) = service_with_snapshotter(10.0);

        for drink in ["beer", "b", "bourbon", "b52"] {
            assert_eq!(service.price(drink), Ok(2), "{drink}");
        }
    }

    #[test]
    fn names_starting_with_c_cost_three() {
        let (service, _) = service_with_snapshotter(10.0);

        for drink in ["cola", "c", "coffee", "cider"] {
            assert_eq!(service.price(drink), Ok(3), "{drink}");
        }
    }

    #[test]
    fn other_names_are_unknown() {
        let (service, _) = service_with_snapshotter(10.0);

        for drink in ["duvel", "", "Beer", "Cola", "water", " beer"] {
            assert_eq!(service.price(drink), Err(PriceError::UnknownDrink), "{drink:?}");
        }
    }

    #[test]
    fn same_name_always_yields_same_result() {
        let (service, _) = service_with_snapshotter(10.0);

        assert_eq!(service.price("cola"), service.price("cola"));
        assert_eq!(service.price("duvel"), service.price("duvel"));
    }

    #[test]
    fn every_call_counts_once() {
        let (service, snapshotter) = service_with_snapshotter(10.0);

        for _ in 0..100 {
            let _ = service.price("beer");
        }
        let entries = snapshotter.snapshot().into_vec();
        assert_eq!(counter_value(&entries, DRINK_PRICE_CALLS), 100);
    }

    #[test]
    fn failed_calls_count_but_record_no_value() {
        let (service, snapshotter) = service_with_snapshotter(10.0);

        let _ = service.price("duvel");
        let _ = service.price("");

        let entries = snapshotter.snapshot().into_vec();
        assert_eq!(counter_value(&entries, DRINK_PRICE_CALLS), 2);
        assert!(histogram_samples(&entries, DRINK_PRICE_VALUES).is_empty());
        assert_eq!(histogram_samples(&entries, DRINK_PRICE_WORK_DURATION).len(), 2);
        assert_eq!(histogram_samples(&entries, DRINK_PRICE_DURATION).len(), 2);
    }

    #[test]
    fn successful_calls_record_scaled_price() {
        let (service, snapshotter) = service_with_snapshotter(10.0);

        service.price("beer").expect("beer is priced");
        service.price("cola").expect("cola is priced");

        let entries = snapshotter.snapshot().into_vec();
        assert_eq!(histogram_samples(&entries, DRINK_PRICE_VALUES), vec![20.0, 30.0]);
    }

    #[test]
    fn unit_scale_records_the_price_itself() {
        let (service, snapshotter) = service_with_snapshotter(1.0);

        let price = service.price("beer").expect("beer is priced");

        let entries = snapshotter.snapshot().into_vec();
        assert_eq!(
            histogram_samples(&entries, DRINK_PRICE_VALUES),
            vec![f64::from(price)]
        );
    }

    #[test]
    fn each_call_performs_two_units_of_work() {
        let performed = Arc::new(AtomicUsize::new(0));
        let service = DrinkService::new(
            Box::new(CountingWork(Arc::clone(&performed))),
            &MetricsConfig::default().value_summary,
        );

        let _ = service.price("beer");
        let _ = service.price("duvel");

        assert_eq!(performed.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn random_sleep_stays_within_bounds() {
        let work = RandomSleep::new(WorkConfig {
            min: Duration::from_millis(5),
            spread: Duration::from_millis(10),
        });

        let started = Instant::now();
        work.perform();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(5), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(500), "{elapsed:?}");
    }
}
