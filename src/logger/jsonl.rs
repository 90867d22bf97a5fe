//! JSONL event log: one self-contained JSON object per line.
//!
//! Lines are assembled in memory and written with a single `write_all`, so a
//! tailing process never sees a partial line. When the log file cannot be
//! written the writer degrades to stderr (prefixed `[RC-JSONL]`), then to
//! silently discarding. Logging never fails a command.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions, rename};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{RampError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ConfigLoaded,
    ProbeIteration,
    ReportRendered,
    ArtifactWritten,
    ThresholdsEvaluated,
    Error,
}

/// A single event. Everything beyond `ts`, `event` and `severity` is optional
/// and omitted from the line when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEntry {
    /// RFC 3339 UTC timestamp, millisecond precision.
    pub ts: String,
    pub event: Option<EventType>,
    pub severity: Option<Severity>,
    /// URL requested by a probe iteration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
    /// Summary, artifact or config file involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// `Config::stable_hash` of the configuration in effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

impl LogEntry {
    /// Entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event: Some(event),
            severity: Some(severity),
            ..Self::default()
        }
    }

    /// Error event carrying the `RC-xxxx` code and message.
    pub fn from_error(err: &RampError) -> Self {
        Self {
            error_code: Some(err.code().to_string()),
            error_message: Some(err.to_string()),
            ..Self::new(EventType::Error, Severity::Critical)
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Rotate once the file would exceed this many bytes. Default: 10 MiB.
    pub max_size_bytes: u64,
    /// Rotated generations kept (`events.jsonl.1` ..). Default: 3.
    pub max_rotated_files: u32,
}

impl JsonlConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// Append-only JSONL writer with size-based rotation.
pub struct JsonlWriter {
    config: JsonlConfig,
    writer: Option<BufWriter<File>>,
    state: WriterState,
    bytes_written: u64,
}

impl JsonlWriter {
    /// Open (creating parent directories) or fall straight to stderr.
    pub fn open(config: JsonlConfig) -> Self {
        let mut w = Self {
            config,
            writer: None,
            state: WriterState::Discard,
            bytes_written: 0,
        };
        match open_append(&w.config.path) {
            Ok((file, size)) => {
                w.writer = Some(BufWriter::new(file));
                w.state = WriterState::Normal;
                w.bytes_written = size;
            }
            Err(e) => {
                let _ = writeln!(io::stderr(), "[RC-JSONL] {e}; logging to stderr");
                w.state = WriterState::Stderr;
            }
        }
        w
    }

    pub fn write_entry(&mut self, entry: &LogEntry) {
        if self.state == WriterState::Discard {
            return;
        }
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[RC-JSONL] serialize error: {e}");
                return;
            }
        };
        self.write_line(&line);
    }

    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state: `normal`, `stderr` or `discard`.
    pub fn state(&self) -> &'static str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn write_line(&mut self, line: &str) {
        if self.state == WriterState::Normal
            && self.bytes_written + line.len() as u64 > self.config.max_size_bytes
        {
            self.rotate();
        }

        match self.state {
            WriterState::Normal => {
                let Some(w) = self.writer.as_mut() else {
                    self.degrade();
                    self.write_line(line);
                    return;
                };
                if w.write_all(line.as_bytes()).is_err() {
                    self.degrade();
                    self.write_line(line);
                    return;
                }
                self.bytes_written += line.len() as u64;
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[RC-JSONL] {line}").is_err() {
                    self.degrade();
                }
            }
            WriterState::Discard => {}
        }
    }

    fn degrade(&mut self) {
        self.writer = None;
        self.state = match self.state {
            WriterState::Normal => {
                let _ = writeln!(io::stderr(), "[RC-JSONL] log write failed, using stderr");
                WriterState::Stderr
            }
            WriterState::Stderr | WriterState::Discard => WriterState::Discard,
        };
    }

    fn rotate(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
        self.writer = None;

        let base = self.config.path.clone();
        let keep = self.config.max_rotated_files;
        if keep == 0 {
            let _ = fs::remove_file(&base);
        } else {
            let _ = fs::remove_file(rotated_name(&base, keep));
            for i in (1..keep).rev() {
                let _ = rename(rotated_name(&base, i), rotated_name(&base, i + 1));
            }
            let _ = rename(&base, rotated_name(&base, 1));
        }

        match open_append(&base) {
            Ok((file, _)) => {
                self.writer = Some(BufWriter::new(file));
                self.bytes_written = 0;
            }
            Err(_) => self.degrade(),
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Open or create for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RampError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| RampError::io(path, source))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    Ok((file, size))
}

/// `events.jsonl` → `events.jsonl.2`.
fn rotated_name(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: PathBuf, max_size_bytes: u64) -> JsonlConfig {
        JsonlConfig {
            path,
            max_size_bytes,
            max_rotated_files: 2,
        }
    }

    #[test]
    fn entries_are_single_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));

        writer.write_entry(&LogEntry::new(EventType::ConfigLoaded, Severity::Info));
        let mut probe = LogEntry::new(EventType::ProbeIteration, Severity::Warning);
        probe.target = Some("http://localhost:8080/stress?duration=15".to_string());
        probe.status_code = Some(503);
        probe.ok = Some(false);
        writer.write_entry(&probe);
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "config_loaded");
        assert_eq!(lines[0]["severity"], "info");
        assert_eq!(lines[1]["event"], "probe_iteration");
        assert_eq!(lines[1]["status_code"], 503);
        assert_eq!(lines[1]["ok"], false);
    }

    #[test]
    fn unset_fields_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 1024 * 1024));
        writer.write_entry(&LogEntry::new(EventType::ReportRendered, Severity::Info));
        writer.flush();

        let line = fs::read_to_string(&path).unwrap();
        assert!(line.contains("\"ts\""));
        assert!(!line.contains("\"metric\""));
        assert!(!line.contains("\"actual\""));
        assert!(!line.contains("\"error_code\""));
    }

    #[test]
    fn error_entries_carry_code() {
        let err = RampError::invalid_config("stages must not be empty");
        let entry = LogEntry::from_error(&err);
        assert_eq!(entry.event, Some(EventType::Error));
        assert_eq!(entry.severity, Some(Severity::Critical));
        assert_eq!(entry.error_code.as_deref(), Some("RC-1001"));
        assert!(entry.error_message.unwrap().contains("stages must not be empty"));
    }

    #[test]
    fn rotation_keeps_bounded_generations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone(), 100));

        for _ in 0..10 {
            writer.write_entry(&LogEntry::new(EventType::ThresholdsEvaluated, Severity::Info));
        }
        writer.flush();

        assert!(path.exists());
        assert!(rotated_name(&path, 1).exists());
        assert!(rotated_name(&path, 2).exists());
        assert!(!rotated_name(&path, 3).exists());
    }

    #[test]
    fn unwritable_path_degrades_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();
        let mut writer = JsonlWriter::open(config(blocker.join("events.jsonl"), 1024));
        assert_eq!(writer.state(), "stderr");
        writer.write_entry(&LogEntry::new(EventType::Error, Severity::Critical));
    }
}
