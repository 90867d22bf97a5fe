//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use rampcheck::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{RampError, Result};

// Workload
pub use crate::workload::spec::WorkloadSpec;
pub use crate::workload::stage::{Stage, build_stage_profile};
pub use crate::workload::threshold::{ThresholdExpr, ThresholdSet, build_thresholds};

// Iteration
#[cfg(feature = "http")]
pub use crate::iteration::http::ReqwestClient;
pub use crate::iteration::recorder::MemoryRecorder;
pub use crate::iteration::{HttpClient, IterationResult, MetricsRecorder, SimulatedIteration};

// Report
pub use crate::report::artifact::{read_snapshot_file, render_artifact, write_artifact};
pub use crate::report::render::{RenderOptions, render_text};
pub use crate::report::snapshot::{DurationStats, MetricsSnapshot};
pub use crate::report::thresholds::{ThresholdOutcome, all_passed, evaluate_thresholds};
