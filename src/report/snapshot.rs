//! Aggregated metrics for one finished run, as produced by the load engine.
//!
//! Any statistic the engine did not emit stays `None`; rendering shows it as
//! `N/A` and thresholds on it fail.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{RampError, Result};
use crate::workload::threshold::{
    Aggregation, ERRORS, HTTP_REQ_DURATION, HTTP_REQ_FAILED, HTTP_REQS, VUS_MAX,
};

/// Latency distribution in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    pub avg: Option<f64>,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub max: Option<f64>,
}

impl DurationStats {
    /// `p50 <= p95 <= p99 <= max` over whichever values are present.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        let present: Vec<f64> = [self.p50, self.p95, self.p99, self.max]
            .into_iter()
            .flatten()
            .collect();
        present.windows(2).all(|w| w[0] <= w[1])
    }
}

/// Complete set of aggregated metrics from one execution. Never mutated after
/// construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub request_count: u64,
    pub request_rate: Option<f64>,
    pub duration: DurationStats,
    /// Fraction of requests with transport/protocol failures.
    pub failure_rate: Option<f64>,
    /// Fraction of iterations failing application checks.
    pub custom_error_rate: Option<f64>,
    pub max_concurrency: Option<u64>,
    /// Raw engine summary the snapshot was extracted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<Value>,
}

impl MetricsSnapshot {
    /// Extract a snapshot from the engine's end-of-test summary
    /// (`metrics.<name>.values.<stat>`), keeping the document as metadata.
    ///
    /// With zero completed requests the latency statistics are undefined and
    /// left as `None` whatever the engine wrote.
    pub fn from_engine_summary(doc: &Value) -> Result<Self> {
        let metrics = doc
            .get("metrics")
            .and_then(Value::as_object)
            .ok_or_else(|| RampError::InvalidSummary {
                details: "expected a top-level \"metrics\" object".to_string(),
            })?;
        let stat = |metric: &str, key: &str| -> Option<f64> {
            metrics
                .get(metric)?
                .get("values")?
                .get(key)?
                .as_f64()
                .filter(|v| v.is_finite())
        };

        let request_count = stat(HTTP_REQS, "count").map_or(0, to_count);

        let duration = if request_count == 0 {
            DurationStats::default()
        } else {
            DurationStats {
                avg: stat(HTTP_REQ_DURATION, "avg"),
                p50: stat(HTTP_REQ_DURATION, "p(50)").or_else(|| stat(HTTP_REQ_DURATION, "med")),
                p95: stat(HTTP_REQ_DURATION, "p(95)"),
                p99: stat(HTTP_REQ_DURATION, "p(99)"),
                max: stat(HTTP_REQ_DURATION, "max"),
            }
        };

        let max_concurrency = stat("vus", "max")
            .or_else(|| stat(VUS_MAX, "max"))
            .or_else(|| stat(VUS_MAX, "value"))
            .map(to_count);

        Ok(Self {
            request_count,
            request_rate: stat(HTTP_REQS, "rate"),
            duration,
            failure_rate: stat(HTTP_REQ_FAILED, "rate"),
            custom_error_rate: stat(ERRORS, "rate"),
            max_concurrency,
            engine: Some(doc.clone()),
        })
    }

    /// Accept either an engine summary or a previously written artifact.
    pub fn from_document(doc: &Value) -> Result<Self> {
        if doc.get("metrics").is_some() {
            return Self::from_engine_summary(doc);
        }
        if doc.get("request_count").is_some() {
            return serde_json::from_value(doc.clone()).map_err(|e| RampError::InvalidSummary {
                details: format!("malformed artifact: {e}"),
            });
        }
        Err(RampError::InvalidSummary {
            details: "document is neither an engine summary nor a rampcheck artifact".to_string(),
        })
    }

    /// Statistic a threshold on `metric` compares against.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn metric_value(&self, metric: &str, aggregation: Aggregation) -> Option<f64> {
        match (metric, aggregation) {
            (HTTP_REQS, Aggregation::Count) => Some(self.request_count as f64),
            (HTTP_REQS, Aggregation::Rate) => self.request_rate,
            (HTTP_REQ_DURATION, Aggregation::Avg) => self.duration.avg,
            (HTTP_REQ_DURATION, Aggregation::Med | Aggregation::Percentile(50)) => {
                self.duration.p50
            }
            (HTTP_REQ_DURATION, Aggregation::Percentile(95)) => self.duration.p95,
            (HTTP_REQ_DURATION, Aggregation::Percentile(99)) => self.duration.p99,
            (HTTP_REQ_DURATION, Aggregation::Max) => self.duration.max,
            (HTTP_REQ_FAILED, Aggregation::Rate) => self.failure_rate,
            (ERRORS, Aggregation::Rate) => self.custom_error_rate,
            (VUS_MAX, Aggregation::Max | Aggregation::Value) => {
                self.max_concurrency.map(|v| v as f64)
            }
            _ => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> u64 {
    if value <= 0.0 { 0 } else { value.round() as u64 }
}
