//! Staged concurrency profile: ordered windows that ramp virtual users toward a target.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One ramp window. The engine moves linearly from the previous stage's
/// target to this stage's `target` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Length of the window.
    #[serde(with = "crate::core::duration::literal")]
    pub duration: Duration,
    /// Virtual users to reach by the end of the window.
    pub target: u32,
}

impl Stage {
    /// Convenience constructor from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: u64, target: u32) -> Self {
        Self {
            duration: Duration::from_secs(secs),
            target,
        }
    }
}

/// The fixed five-phase ramp: warm up, climb, hold the peak, step down, drain.
#[must_use]
pub fn build_stage_profile() -> Vec<Stage> {
    vec![
        Stage::from_secs(30, 10),
        Stage::from_secs(60, 50),
        Stage::from_secs(120, 100),
        Stage::from_secs(60, 50),
        Stage::from_secs(30, 0),
    ]
}

/// Wall-clock length of the whole ramp.
#[must_use]
pub fn total_duration(stages: &[Stage]) -> Duration {
    stages
        .iter()
        .fold(Duration::ZERO, |acc, stage| acc.saturating_add(stage.duration))
}

/// Highest concurrency any stage asks for.
#[must_use]
pub fn peak_target(stages: &[Stage]) -> u32 {
    stages.iter().map(|s| s.target).max().unwrap_or(0)
}
