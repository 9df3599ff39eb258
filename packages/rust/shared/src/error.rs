//! Error types for the fallacy detector.
//!
//! Library crates use [`FallacyDetectorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level error type for all fallacy detector operations.
#[derive(Debug, thiserror::Error)]
pub enum FallacyDetectorError {
    /// Missing or invalid configuration, credentials, or reference data.
    #[error("config error: {message}")]
    Config { message: String },

    /// The search collaborator returned zero results.
    #[error("no articles found for the given search criteria (query: {query})")]
    NoResults { query: String },

    /// Transport or decoding fault from the search collaborator.
    #[error("search failed: {0}")]
    Search(String),

    /// Transport, status, or extraction fault while fetching an article.
    #[error("article fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Fault from the completion backend.
    #[error("model invocation failed during {stage}: {message}")]
    ModelInvocation { stage: String, message: String },

    /// A stage exceeded its time budget.
    #[error("{stage} timed out after {secs}s")]
    StageTimeout { stage: String, secs: u64 },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FallacyDetectorError>;

/// Stable category of a failure, carried by error-shaped analysis results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    NoResults,
    Search,
    Fetch,
    ModelInvocation,
    Timeout,
    Internal,
}

impl FallacyDetectorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a fetch error for `url`.
    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a model invocation error for the named stage.
    pub fn model(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ModelInvocation {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The failure category surfaced in error-shaped results.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config { .. } => FailureKind::Configuration,
            Self::NoResults { .. } => FailureKind::NoResults,
            Self::Search(_) => FailureKind::Search,
            Self::Fetch { .. } => FailureKind::Fetch,
            Self::ModelInvocation { .. } => FailureKind::ModelInvocation,
            Self::StageTimeout { .. } => FailureKind::Timeout,
            Self::Io { .. } | Self::Validation { .. } => FailureKind::Internal,
        }
    }
}
