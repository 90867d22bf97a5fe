//! Declarative load profile: ramp stages, pass/fail thresholds, target URL.

pub mod spec;
pub mod stage;
pub mod threshold;
