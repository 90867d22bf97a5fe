//! End-of-run reporting: snapshot extraction, fixed-layout text, JSON artifact,
//! threshold verdicts.

pub mod artifact;
pub mod render;
pub mod snapshot;
pub mod thresholds;
