//! RC-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, RampError>;

/// Top-level error type for rampcheck.
///
/// Only the configuration family is fatal to a run. Per-iteration failures and
/// missing metrics are carried as data instead (see
/// [`crate::iteration::IterationFailure`] and [`crate::report::snapshot`]).
#[derive(Debug, Error)]
pub enum RampError {
    #[error("[RC-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[RC-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[RC-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[RC-2001] unusable engine summary: {details}")]
    InvalidSummary { details: String },

    #[error("[RC-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[RC-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RampError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "RC-1001",
            Self::MissingConfig { .. } => "RC-1002",
            Self::ConfigParse { .. } => "RC-1003",
            Self::InvalidSummary { .. } => "RC-2001",
            Self::Serialization { .. } => "RC-2101",
            Self::Io { .. } => "RC-3002",
        }
    }

    /// Whether the error belongs to the configuration family that aborts a run
    /// before any traffic is sent.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::MissingConfig { .. } | Self::ConfigParse { .. }
        )
    }

    /// Shorthand for an [`RampError::InvalidConfig`] with formatted details.
    #[must_use]
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for RampError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for RampError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for RampError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
