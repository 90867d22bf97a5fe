//! Threshold expressions (`p(95)<5000`, `rate<0.01`) and the metric catalog they
//! may reference.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{RampError, Result};

/// Completed request counter.
pub const HTTP_REQS: &str = "http_reqs";
/// Request latency trend, milliseconds.
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
/// Transport/protocol failure rate.
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
/// Application check failure rate fed by the iteration body.
pub const ERRORS: &str = "errors";
/// Peak virtual users.
pub const VUS_MAX: &str = "vus_max";

/// Metric name → expressions asserted on it. Ordered for stable reports.
pub type ThresholdSet = BTreeMap<String, Vec<ThresholdExpr>>;

/// How a metric aggregates samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Trend,
    Rate,
    Gauge,
}

/// A metric the snapshot can carry, and the aggregations it exposes.
#[derive(Debug, Clone, Copy)]
pub struct KnownMetric {
    pub name: &'static str,
    pub kind: MetricKind,
}

const CATALOG: &[KnownMetric] = &[
    KnownMetric {
        name: HTTP_REQS,
        kind: MetricKind::Counter,
    },
    KnownMetric {
        name: HTTP_REQ_DURATION,
        kind: MetricKind::Trend,
    },
    KnownMetric {
        name: HTTP_REQ_FAILED,
        kind: MetricKind::Rate,
    },
    KnownMetric {
        name: ERRORS,
        kind: MetricKind::Rate,
    },
    KnownMetric {
        name: VUS_MAX,
        kind: MetricKind::Gauge,
    },
];

/// Look up a metric by name.
#[must_use]
pub fn known_metric(name: &str) -> Option<KnownMetric> {
    CATALOG.iter().copied().find(|m| m.name == name)
}

/// All metric names a threshold may reference.
pub fn known_metric_names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|m| m.name)
}

/// Statistic extracted from a metric before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Count,
    Rate,
    Avg,
    Min,
    Med,
    Max,
    Value,
    Percentile(u8),
}

impl Aggregation {
    /// Whether the snapshot carries this statistic for a metric of `kind`.
    #[must_use]
    pub const fn available_for(self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Counter => matches!(self, Self::Count | Self::Rate),
            MetricKind::Trend => matches!(
                self,
                Self::Avg | Self::Med | Self::Max | Self::Percentile(50 | 95 | 99)
            ),
            MetricKind::Rate => matches!(self, Self::Rate),
            MetricKind::Gauge => matches!(self, Self::Max | Self::Value),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => f.write_str("count"),
            Self::Rate => f.write_str("rate"),
            Self::Avg => f.write_str("avg"),
            Self::Min => f.write_str("min"),
            Self::Med => f.write_str("med"),
            Self::Max => f.write_str("max"),
            Self::Value => f.write_str("value"),
            Self::Percentile(p) => write!(f, "p({p})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "==" | "===" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    /// Apply the comparator. NaN never satisfies anything.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn holds(self, actual: f64, bound: f64) -> bool {
        match self {
            Self::Lt => actual < bound,
            Self::Le => actual <= bound,
            Self::Gt => actual > bound,
            Self::Ge => actual >= bound,
            Self::Eq => actual == bound,
            Self::Ne => !actual.is_nan() && actual != bound,
        }
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

/// A single assertion such as `p(95)<5000`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThresholdExpr {
    pub aggregation: Aggregation,
    pub comparator: Comparator,
    pub bound: f64,
}

fn expr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(count|rate|avg|min|med|max|value|p\(\s*(\d+(?:\.\d+)?)\s*\))\s*(<=|>=|===|==|!=|<|>)\s*(-?\d+(?:\.\d+)?)\s*$",
        )
        .expect("threshold expression regex is valid")
    })
}

impl ThresholdExpr {
    #[must_use]
    pub const fn new(aggregation: Aggregation, comparator: Comparator, bound: f64) -> Self {
        Self {
            aggregation,
            comparator,
            bound,
        }
    }

    /// Parse the engine's threshold syntax.
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = expr_regex()
            .captures(raw)
            .ok_or_else(|| parse_error(raw, "expected <aggregation><op><number>"))?;

        let aggregation = match &caps[1] {
            "count" => Aggregation::Count,
            "rate" => Aggregation::Rate,
            "avg" => Aggregation::Avg,
            "min" => Aggregation::Min,
            "med" => Aggregation::Med,
            "max" => Aggregation::Max,
            "value" => Aggregation::Value,
            _ => {
                let pct = caps.get(2).map_or("", |m| m.as_str());
                let whole: u8 = pct
                    .parse()
                    .map_err(|_| parse_error(raw, "percentile must be a whole number"))?;
                if whole > 100 {
                    return Err(parse_error(raw, "percentile must be within 0..=100"));
                }
                Aggregation::Percentile(whole)
            }
        };
        let comparator =
            Comparator::parse(&caps[3]).ok_or_else(|| parse_error(raw, "unknown comparator"))?;
        let bound: f64 = caps[4]
            .parse()
            .map_err(|_| parse_error(raw, "bound is not a number"))?;

        Ok(Self::new(aggregation, comparator, bound))
    }
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.aggregation,
            self.comparator.symbol(),
            self.bound
        )
    }
}

impl TryFrom<String> for ThresholdExpr {
    type Error = RampError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ThresholdExpr> for String {
    fn from(value: ThresholdExpr) -> Self {
        value.to_string()
    }
}

fn parse_error(raw: &str, reason: &str) -> RampError {
    RampError::ConfigParse {
        context: "threshold",
        details: format!("{raw:?}: {reason}"),
    }
}

/// The fixed rule set: p95 latency under 5s, transport failures under 1%,
/// application check failures under 1%.
#[must_use]
pub fn build_thresholds() -> ThresholdSet {
    let mut set = ThresholdSet::new();
    set.insert(
        HTTP_REQ_DURATION.to_string(),
        vec![ThresholdExpr::new(
            Aggregation::Percentile(95),
            Comparator::Lt,
            5_000.0,
        )],
    );
    set.insert(
        HTTP_REQ_FAILED.to_string(),
        vec![ThresholdExpr::new(Aggregation::Rate, Comparator::Lt, 0.01)],
    );
    set.insert(
        ERRORS.to_string(),
        vec![ThresholdExpr::new(Aggregation::Rate, Comparator::Lt, 0.01)],
    );
    set
}

/// Reject thresholds naming a metric, or a statistic, the snapshot never carries.
pub fn validate_thresholds(set: &ThresholdSet) -> Result<()> {
    for (name, exprs) in set {
        let metric = known_metric(name).ok_or_else(|| {
            RampError::invalid_config(format!(
                "threshold references unknown metric {name:?} (known: {})",
                known_metric_names().collect::<Vec<_>>().join(", ")
            ))
        })?;
        if exprs.is_empty() {
            return Err(RampError::invalid_config(format!(
                "threshold for {name:?} has no expressions"
            )));
        }
        for expr in exprs {
            if !expr.aggregation.available_for(metric.kind) {
                return Err(RampError::invalid_config(format!(
                    "threshold {name}: {expr} uses {} which {name} does not report",
                    expr.aggregation
                )));
            }
            if !expr.bound.is_finite() {
                return Err(RampError::invalid_config(format!(
                    "threshold {name}: {expr} has a non-finite bound"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_syntax() {
        let p95 = ThresholdExpr::parse("p(95)<5000").unwrap();
        assert_eq!(p95.aggregation, Aggregation::Percentile(95));
        assert_eq!(p95.comparator, Comparator::Lt);
        assert!((p95.bound - 5_000.0).abs() < f64::EPSILON);

        let rate = ThresholdExpr::parse(" rate <= 0.01 ").unwrap();
        assert_eq!(rate.aggregation, Aggregation::Rate);
        assert_eq!(rate.comparator, Comparator::Le);

        let eq = ThresholdExpr::parse("count===0").unwrap();
        assert_eq!(eq.comparator, Comparator::Eq);
    }

    #[test]
    fn rejects_malformed_expressions() {
        for raw in ["p95<5000", "rate<", "rate ~ 1", "p(101)<1", "p(99.9)<1", "median<3"] {
            let err = ThresholdExpr::parse(raw).expect_err(raw);
            assert_eq!(err.code(), "RC-1003", "{raw}: {err}");
        }
    }

    #[test]
    fn display_matches_engine_syntax() {
        let set = build_thresholds();
        let rendered: Vec<String> = set
            .values()
            .flatten()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["rate<0.01", "p(95)<5000", "rate<0.01"]);
    }

    #[test]
    fn strict_less_than_fails_on_boundary() {
        assert!(Comparator::Lt.holds(4_999.99, 5_000.0));
        assert!(!Comparator::Lt.holds(5_000.0, 5_000.0));
        assert!(!Comparator::Lt.holds(f64::NAN, 5_000.0));
        assert!(!Comparator::Ne.holds(f64::NAN, 1.0));
    }

    #[test]
    fn default_thresholds_validate() {
        validate_thresholds(&build_thresholds()).unwrap();
    }

    #[test]
    fn unknown_metric_rejected() {
        let mut set = build_thresholds();
        set.insert(
            "iteration_duration".to_string(),
            vec![ThresholdExpr::parse("avg<1").unwrap()],
        );
        let err = validate_thresholds(&set).unwrap_err();
        assert_eq!(err.code(), "RC-1001");
        assert!(err.to_string().contains("iteration_duration"));
    }

    #[test]
    fn unsupported_statistic_rejected() {
        let mut set = ThresholdSet::new();
        set.insert(
            HTTP_REQ_DURATION.to_string(),
            vec![ThresholdExpr::parse("p(90)<100").unwrap()],
        );
        let err = validate_thresholds(&set).unwrap_err();
        assert!(err.to_string().contains("p(90)"), "{err}");

        set.insert(
            HTTP_REQ_DURATION.to_string(),
            vec![ThresholdExpr::parse("min>0").unwrap()],
        );
        assert!(validate_thresholds(&set).is_err());
    }

    #[test]
    fn serde_round_trips_through_strings() {
        let set = build_thresholds();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json[HTTP_REQ_DURATION][0], "p(95)<5000");
        let back: ThresholdSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }
}
