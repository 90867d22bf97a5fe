//! One unit of simulated traffic: request the stress endpoint, check the answer,
//! feed the custom error rate.
//!
//! The HTTP client and the metric sink are injected so the iteration body runs
//! the same against a real target, a test double, or a host engine's bindings.

#![allow(missing_docs)]

#[cfg(feature = "http")]
pub mod http;
pub mod recorder;

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::TargetConfig;
use crate::workload::spec::WorkloadSpec;
use crate::workload::threshold::ERRORS;

/// Check: the endpoint answered 200.
pub const CHECK_STATUS_200: &str = "status is 200";
/// Check: body field `status` equals `"completed"`.
pub const CHECK_COMPLETED: &str = "response has status";
/// Check: body field `pod_name` is present and not null.
pub const CHECK_POD_NAME: &str = "response has pod_name";

/// Raw answer from the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Why a request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("network error: {0}")]
    Other(String),
}

/// Issues GET requests on behalf of an iteration.
pub trait HttpClient {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// Receives per-iteration observations. Implementations aggregate; the
/// iteration never reads back.
pub trait MetricsRecorder {
    /// Add one boolean sample to a rate metric (`true` counts as a hit).
    fn add_rate(&self, metric: &str, hit: bool);
}

/// First reason an iteration did not pass. Local to the iteration, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IterationFailure {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    #[error("response body is not JSON: {0}")]
    MalformedBody(String),
    #[error("check failed: {0}")]
    CheckFailed(&'static str),
}

/// Outcome of one named check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
}

/// Everything one iteration observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationResult {
    pub success: bool,
    pub status_code: Option<u16>,
    pub body_parsed: bool,
    pub checks: Vec<CheckOutcome>,
    pub failure: Option<IterationFailure>,
}

/// The per-virtual-user body handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedIteration {
    url: String,
    delay: Duration,
}

impl SimulatedIteration {
    /// `GET {base_url}{path}?duration={stress_duration_secs}`, then pause for `delay`.
    #[must_use]
    pub fn new(base_url: &str, path: &str, stress_duration_secs: u64, delay: Duration) -> Self {
        let url = format!(
            "{}{path}?duration={stress_duration_secs}",
            base_url.trim_end_matches('/')
        );
        Self { url, delay }
    }

    /// Iteration aimed at a workload's target.
    #[must_use]
    pub fn for_workload(spec: &WorkloadSpec, target: &TargetConfig) -> Self {
        Self::new(
            spec.target_base_url(),
            &target.path,
            target.stress_duration_secs,
            spec.iteration_delay(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Pause the caller should take before the next iteration on the same user.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run one request-and-check cycle. Always completes; failures come back as data.
    pub fn run(&self, client: &dyn HttpClient, recorder: &dyn MetricsRecorder) -> IterationResult {
        let result = match client.get(&self.url) {
            Ok(response) => evaluate_response(&response),
            Err(error) => IterationResult {
                success: false,
                status_code: None,
                body_parsed: false,
                checks: all_checks(false, false, false),
                failure: Some(IterationFailure::Transport(error)),
            },
        };
        recorder.add_rate(ERRORS, !result.success);
        result
    }
}

fn all_checks(status_ok: bool, completed: bool, has_pod: bool) -> Vec<CheckOutcome> {
    vec![
        CheckOutcome {
            name: CHECK_STATUS_200,
            passed: status_ok,
        },
        CheckOutcome {
            name: CHECK_COMPLETED,
            passed: completed,
        },
        CheckOutcome {
            name: CHECK_POD_NAME,
            passed: has_pod,
        },
    ]
}

fn evaluate_response(response: &HttpResponse) -> IterationResult {
    let status_ok = response.status == 200;
    let parsed = serde_json::from_slice::<Value>(&response.body);

    let (body_parsed, completed, has_pod, parse_error) = match &parsed {
        Ok(body) => (
            true,
            body.get("status").and_then(Value::as_str) == Some("completed"),
            body.get("pod_name").is_some_and(|v| !v.is_null()),
            None,
        ),
        Err(e) => (false, false, false, Some(e.to_string())),
    };

    let checks = all_checks(status_ok, completed, has_pod);
    let success = checks.iter().all(|c| c.passed);

    let failure = if success {
        None
    } else if !status_ok {
        Some(IterationFailure::UnexpectedStatus(response.status))
    } else if let Some(detail) = parse_error {
        Some(IterationFailure::MalformedBody(detail))
    } else {
        checks
            .iter()
            .find(|c| !c.passed)
            .map(|c| IterationFailure::CheckFailed(c.name))
    };

    IterationResult {
        success,
        status_code: Some(response.status),
        body_parsed,
        checks,
        failure,
    }
}
