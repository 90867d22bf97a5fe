//! Pass/fail evaluation of threshold rules against a finished snapshot.

use serde::Serialize;

use crate::report::snapshot::MetricsSnapshot;
use crate::workload::threshold::ThresholdSet;

/// Verdict for one expression on one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdOutcome {
    /// Metric the rule applies to, e.g. `http_req_duration`.
    pub metric: String,
    /// Rule as written, e.g. `p(95)<5000`.
    pub expression: String,
    /// Whether the comparison held.
    pub passed: bool,
    /// Value compared, `None` when the snapshot lacks it (which fails the rule).
    pub actual: Option<f64>,
}

/// Evaluate every expression in `thresholds`, in metric-name order.
///
/// Only computes verdicts; deciding the process exit status is the caller's job.
#[must_use]
pub fn evaluate_thresholds(
    snapshot: &MetricsSnapshot,
    thresholds: &ThresholdSet,
) -> Vec<ThresholdOutcome> {
    thresholds
        .iter()
        .flat_map(|(metric, exprs)| {
            exprs.iter().map(move |expr| {
                let actual = snapshot.metric_value(metric, expr.aggregation);
                let passed = actual.is_some_and(|v| expr.comparator.holds(v, expr.bound));
                ThresholdOutcome {
                    metric: metric.clone(),
                    expression: expr.to_string(),
                    passed,
                    actual,
                }
            })
        })
        .collect()
}

/// True when no outcome failed.
#[must_use]
pub fn all_passed(outcomes: &[ThresholdOutcome]) -> bool {
    outcomes.iter().all(|o| o.passed)
}
