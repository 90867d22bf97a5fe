//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::duration::parse_duration;
use crate::core::errors::{RampError, Result};
use crate::workload::spec::{
    API_URL_ENV, DEFAULT_BASE_URL, DEFAULT_ITERATION_DELAY, WorkloadSpec, resolve_target_url,
};
use crate::workload::stage::{Stage, build_stage_profile};
use crate::workload::threshold::{ThresholdSet, build_thresholds};

/// Default name of the machine-readable run artifact.
pub const DEFAULT_ARTIFACT_FILE: &str = "load-test-results.json";

/// Full rampcheck configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub iteration: IterationConfig,
    pub report: ReportConfig,
    pub paths: PathsConfig,
    pub thresholds: ThresholdSet,
    pub stages: Vec<Stage>,
}

/// The endpoint each iteration hits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    /// Scheme + host (+ optional port/prefix). `API_URL` overrides it.
    pub base_url: String,
    /// Stress endpoint path appended to the base URL.
    pub path: String,
    /// Value of the `duration` query parameter, seconds of CPU work per request.
    pub stress_duration_secs: u64,
    /// Client-side request timeout.
    pub timeout_ms: u64,
}

/// Per-iteration pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IterationConfig {
    /// Pause after each iteration on a virtual user.
    #[serde(with = "crate::core::duration::literal")]
    pub delay: Duration,
}

/// Summary report rendering and artifact placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Prefix written before every report line.
    pub indent: String,
    /// Allow ANSI colors when stdout is a terminal.
    pub colors: bool,
    pub artifact_path: PathBuf,
}

/// Filesystem paths used by rampcheck.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub event_log: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            iteration: IterationConfig::default(),
            report: ReportConfig::default(),
            paths: PathsConfig::default(),
            thresholds: build_thresholds(),
            stages: build_stage_profile(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            path: "/stress".to_string(),
            stress_duration_secs: 15,
            timeout_ms: 60_000,
        }
    }
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_ITERATION_DELAY,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            indent: " ".to_string(),
            colors: true,
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_FILE),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[RC-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("rampcheck").join("config.toml"),
            event_log: home_dir
                .join(".local")
                .join("share")
                .join("rampcheck")
                .join("events.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::read_file(path)?;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn read_file(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| RampError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(RampError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // API_URL keeps its own rule: any non-empty value wins verbatim.
        self.target.base_url =
            resolve_target_url(lookup(API_URL_ENV).as_deref(), &self.target.base_url);

        // Indents are whitespace by nature; only an empty value is ignored.
        if let Some(raw) = lookup("RAMPCHECK_REPORT_INDENT").filter(|raw| !raw.is_empty()) {
            self.report.indent = raw;
        }

        let mut lookup = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = lookup("RAMPCHECK_TARGET_PATH") {
            self.target.path = raw;
        }
        if let Some(raw) = lookup("RAMPCHECK_STRESS_DURATION_SECS") {
            self.target.stress_duration_secs = parse_env_u64("RAMPCHECK_STRESS_DURATION_SECS", &raw)?;
        }
        if let Some(raw) = lookup("RAMPCHECK_HTTP_TIMEOUT_MS") {
            self.target.timeout_ms = parse_env_u64("RAMPCHECK_HTTP_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("RAMPCHECK_ITERATION_DELAY") {
            self.iteration.delay = parse_duration(&raw).map_err(|error| RampError::ConfigParse {
                context: "env",
                details: format!("RAMPCHECK_ITERATION_DELAY={raw:?}: {error}"),
            })?;
        }
        if let Some(raw) = lookup("RAMPCHECK_REPORT_COLORS") {
            self.report.colors = parse_env_bool("RAMPCHECK_REPORT_COLORS", &raw)?;
        }
        if let Some(raw) = lookup("RAMPCHECK_ARTIFACT_PATH") {
            self.report.artifact_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("RAMPCHECK_EVENT_LOG") {
            self.paths.event_log = PathBuf::from(raw);
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.target.path.starts_with('/') {
            return Err(RampError::invalid_config(format!(
                "target.path must start with '/', got {:?}",
                self.target.path
            )));
        }
        // The stress endpoint rejects anything outside 1..=60 with a 422.
        if !(1..=60).contains(&self.target.stress_duration_secs) {
            return Err(RampError::invalid_config(format!(
                "target.stress_duration_secs must be in [1, 60], got {}",
                self.target.stress_duration_secs
            )));
        }
        if self.target.timeout_ms == 0 {
            return Err(RampError::invalid_config("target.timeout_ms must be > 0"));
        }
        if self.report.artifact_path.as_os_str().is_empty() {
            return Err(RampError::invalid_config(
                "report.artifact_path must not be empty",
            ));
        }

        WorkloadSpec::from_config(self).map(|_| ())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| RampError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| RampError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
