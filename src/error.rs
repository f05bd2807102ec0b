//! Named failure reasons for a marketplace run.

use thiserror::Error;

/// Why a marketplace run (or a batch export) produced no output file.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The store URL for this marketplace was not configured.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// The store URL could not be turned into an identifier.
    #[error("invalid store URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The store request or its response failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReviewError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        ReviewError::InvalidUrl { url: url.into(), reason: reason.into() }
    }

    /// Wraps an upstream failure, keeping its full context chain.
    pub fn upstream(err: anyhow::Error) -> Self {
        ReviewError::Upstream(format!("{:#}", err))
    }
}

pub type ReviewResult<T> = std::result::Result<T, ReviewError>;
