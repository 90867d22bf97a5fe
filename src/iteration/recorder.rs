//! In-memory [`MetricsRecorder`]: rate tallies keyed by metric name.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::MetricsRecorder;

/// Hits over samples for one rate metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateTally {
    pub hits: u64,
    pub samples: u64,
}

impl RateTally {
    /// Fraction of samples that were hits, or `None` before the first sample.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.hits as f64 / self.samples as f64)
    }
}

/// Thread-safe recorder for local runs and tests.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    tallies: Mutex<BTreeMap<String, RateTally>>,
}

impl MemoryRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tally for `metric`.
    pub fn tally(&self, metric: &str) -> Option<RateTally> {
        self.tallies.lock().get(metric).copied()
    }

    /// Current rate for `metric`.
    pub fn rate(&self, metric: &str) -> Option<f64> {
        self.tally(metric).and_then(|t| t.rate())
    }

    /// Copy of every tally, ordered by metric name.
    pub fn snapshot(&self) -> BTreeMap<String, RateTally> {
        self.tallies.lock().clone()
    }
}

impl MetricsRecorder for MemoryRecorder {
    fn add_rate(&self, metric: &str, hit: bool) {
        let mut tallies = self.tallies.lock();
        let tally = tallies.entry(metric.to_string()).or_default();
        tally.samples += 1;
        if hit {
            tally.hits += 1;
        }
    }
}
