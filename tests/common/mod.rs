#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Isolated HOME + working directory so config, event log and artifacts never
/// touch the real user's files.
pub struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create sandbox"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn event_log(&self) -> PathBuf {
        self.dir.path().join("events.jsonl")
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_rampcheck") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) {
        "rampcheck.exe"
    } else {
        "rampcheck"
    };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve rampcheck binary path for integration test"),
    }
}

/// Run the binary in a throwaway sandbox.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let sandbox = Sandbox::new();
    run_cli_case_in(&sandbox, case_name, args, &[])
}

/// Run the binary with `sandbox` as HOME and working directory, plus extra env.
pub fn run_cli_case_in(
    sandbox: &Sandbox,
    case_name: &str,
    args: &[&str],
    env: &[(&str, &str)],
) -> CmdResult {
    let root = std::env::temp_dir().join("rampcheck-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .current_dir(sandbox.path())
        .env("HOME", sandbox.path())
        .env("RAMPCHECK_EVENT_LOG", sandbox.event_log())
        .env("RUST_BACKTRACE", "1");
    for name in [
        "API_URL",
        "RAMPCHECK_OUTPUT_FORMAT",
        "RAMPCHECK_TARGET_PATH",
        "RAMPCHECK_STRESS_DURATION_SECS",
        "RAMPCHECK_HTTP_TIMEOUT_MS",
        "RAMPCHECK_ITERATION_DELAY",
        "RAMPCHECK_REPORT_INDENT",
        "RAMPCHECK_REPORT_COLORS",
        "RAMPCHECK_ARTIFACT_PATH",
    ] {
        command.env_remove(name);
    }
    for (name, value) in env {
        command.env(name, value);
    }
    let output = command.output().expect("execute rampcheck command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("env={env:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Engine end-of-test summary with the given latency p95 and request count.
pub fn engine_summary(request_count: u64, p95: f64) -> String {
    serde_json::json!({
        "root_group": { "name": "", "checks": [] },
        "state": { "isStdOutTTY": false, "testRunDurationMs": 300_000.0 },
        "metrics": {
            "http_reqs": { "type": "counter", "values": { "count": request_count, "rate": 33.33 } },
            "http_req_duration": {
                "type": "trend",
                "values": { "avg": 120.5, "med": 100.0, "p(50)": 100.0, "p(95)": p95, "p(99)": p95.max(400.0), "max": p95.max(600.0) }
            },
            "http_req_failed": { "type": "rate", "values": { "rate": 0.005 } },
            "errors": { "type": "rate", "values": { "rate": 0.002 } },
            "vus": { "type": "gauge", "values": { "max": 100 } }
        }
    })
    .to_string()
}
