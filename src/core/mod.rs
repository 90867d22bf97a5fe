//! Core types: errors, configuration, duration literals.

pub mod config;
pub mod duration;
pub mod errors;
