//! Machine-readable run artifact: the full snapshot, engine metadata included.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::core::errors::{RampError, Result};
use crate::report::snapshot::MetricsSnapshot;

/// Serialize the whole snapshot as UTF-8 JSON.
pub fn render_artifact(snapshot: &MetricsSnapshot) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(snapshot)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `bytes` to `path` via a sibling temp file and rename, so readers never
/// see a half-written artifact.
pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RampError::io(parent, source))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes).map_err(|source| RampError::io(&tmp_path, source))?;
    fs::rename(&tmp_path, path).map_err(|source| RampError::io(path, source))?;
    Ok(())
}

/// Load a snapshot from an engine summary or a previous artifact on disk.
pub fn read_snapshot_file(path: &Path) -> Result<MetricsSnapshot> {
    let raw = fs::read_to_string(path).map_err(|source| RampError::io(path, source))?;
    let doc: Value = serde_json::from_str(&raw).map_err(|e| RampError::InvalidSummary {
        details: format!("{}: {e}", path.display()),
    })?;
    MetricsSnapshot::from_document(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary() -> Value {
        json!({
            "state": { "isStdOutTTY": false },
            "metrics": {
                "http_reqs": { "values": { "count": 12, "rate": 0.4 } },
                "http_req_duration": { "values": { "avg": 15_010.2, "p(50)": 15_004.0, "p(95)": 15_030.9, "p(99)": 15_040.1, "max": 15_041.0 } },
                "http_req_failed": { "values": { "rate": 0.0 } },
                "errors": { "values": { "rate": 0.0 } },
                "vus": { "values": { "max": 2 } }
            }
        })
    }

    #[test]
    fn artifact_carries_engine_metadata() {
        let snap = MetricsSnapshot::from_engine_summary(&summary()).unwrap();
        let bytes = render_artifact(&snap).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["request_count"], 12);
        assert_eq!(doc["duration"]["p95"], 15_030.9);
        assert_eq!(doc["engine"]["state"]["isStdOutTTY"], false);
    }

    #[test]
    fn artifact_rendering_is_deterministic() {
        let snap = MetricsSnapshot::from_engine_summary(&summary()).unwrap();
        assert_eq!(render_artifact(&snap).unwrap(), render_artifact(&snap).unwrap());
    }

    #[test]
    fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("load-test-results.json");
        let snap = MetricsSnapshot::from_engine_summary(&summary()).unwrap();

        write_artifact(&path, &render_artifact(&snap).unwrap()).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let back = read_snapshot_file(&path).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn reads_engine_summary_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        fs::write(&path, serde_json::to_vec(&summary()).unwrap()).unwrap();
        let snap = read_snapshot_file(&path).unwrap();
        assert_eq!(snap.request_count, 12);
        assert_eq!(snap.max_concurrency, Some(2));
    }

    #[test]
    fn non_json_input_is_an_invalid_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        fs::write(&path, "checks.........: 100.00%").unwrap();
        let err = read_snapshot_file(&path).unwrap_err();
        assert_eq!(err.code(), "RC-2001");
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let err = read_snapshot_file(Path::new("/nonexistent/summary.json")).unwrap_err();
        assert_eq!(err.code(), "RC-3002");
    }
}
