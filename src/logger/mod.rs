//! Append-only JSONL event log with graceful degradation.

pub mod jsonl;
