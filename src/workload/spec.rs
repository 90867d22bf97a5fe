//! Immutable, validated description of one load test.

#![allow(missing_docs)]

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use crate::core::config::Config;
use crate::core::duration::format_duration;
use crate::core::errors::{RampError, Result};
use crate::workload::stage::{Stage, build_stage_profile, peak_target, total_duration};
use crate::workload::threshold::{ThresholdSet, build_thresholds, validate_thresholds};

/// Environment variable overriding the target base URL.
pub const API_URL_ENV: &str = "API_URL";
/// Target used when no override is supplied.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
/// Pause after each iteration of a virtual user.
pub const DEFAULT_ITERATION_DELAY: Duration = Duration::from_secs(1);

/// Pick the override when it is set to anything non-empty, otherwise the fallback.
#[must_use]
pub fn resolve_target_url(env_override: Option<&str>, fallback: &str) -> String {
    match env_override {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => fallback.to_string(),
    }
}

/// Check that `raw` is an absolute `http`/`https` URL with a host.
pub fn validate_base_url(raw: &str) -> Result<Url> {
    let parsed = Url::parse(raw)
        .map_err(|e| RampError::invalid_config(format!("target base URL {raw:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RampError::invalid_config(format!(
            "target base URL {raw:?} must use http or https, got {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(RampError::invalid_config(format!(
            "target base URL {raw:?} has no host"
        )));
    }
    Ok(parsed)
}

/// What to test: target, ramp curve, pass/fail rules, per-iteration pause.
///
/// Constructed once and never mutated; every constructor validates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadSpec {
    target_base_url: String,
    stages: Vec<Stage>,
    thresholds: ThresholdSet,
    #[serde(with = "crate::core::duration::literal")]
    iteration_delay: Duration,
}

impl WorkloadSpec {
    /// Validate and freeze a workload.
    pub fn new(
        target_base_url: impl Into<String>,
        stages: Vec<Stage>,
        thresholds: ThresholdSet,
        iteration_delay: Duration,
    ) -> Result<Self> {
        let target_base_url = target_base_url.into();
        validate_base_url(&target_base_url)?;

        if stages.is_empty() {
            return Err(RampError::invalid_config("at least one stage is required"));
        }
        if let Some((index, _)) = stages
            .iter()
            .enumerate()
            .find(|(_, s)| s.duration.is_zero())
        {
            return Err(RampError::invalid_config(format!(
                "stages[{index}].duration must be positive"
            )));
        }
        validate_thresholds(&thresholds)?;

        Ok(Self {
            target_base_url,
            stages,
            thresholds,
            iteration_delay,
        })
    }

    /// The stock workload: five-phase ramp, default thresholds, one second pause,
    /// aimed at `env_override` or the local fallback.
    pub fn standard(env_override: Option<&str>) -> Result<Self> {
        Self::new(
            resolve_target_url(env_override, DEFAULT_BASE_URL),
            build_stage_profile(),
            build_thresholds(),
            DEFAULT_ITERATION_DELAY,
        )
    }

    /// Build from a loaded configuration (env overrides already applied).
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.target.base_url.clone(),
            cfg.stages.clone(),
            cfg.thresholds.clone(),
            cfg.iteration.delay,
        )
    }

    pub fn target_base_url(&self) -> &str {
        &self.target_base_url
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn iteration_delay(&self) -> Duration {
        self.iteration_delay
    }

    /// Sum of all stage durations.
    pub fn total_duration(&self) -> Duration {
        total_duration(&self.stages)
    }

    /// Highest virtual-user count the ramp reaches.
    pub fn peak_concurrency(&self) -> u32 {
        peak_target(&self.stages)
    }

    /// Options document in the shape the load engine consumes.
    pub fn engine_options(&self) -> Value {
        let stages: Vec<Value> = self
            .stages
            .iter()
            .map(|s| json!({ "duration": format_duration(s.duration), "target": s.target }))
            .collect();
        let thresholds: serde_json::Map<String, Value> = self
            .thresholds
            .iter()
            .map(|(name, exprs)| {
                let list = exprs.iter().map(|e| Value::String(e.to_string())).collect();
                (name.clone(), Value::Array(list))
            })
            .collect();
        json!({
            "stages": stages,
            "thresholds": thresholds,
        })
    }
}
