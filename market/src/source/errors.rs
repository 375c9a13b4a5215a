use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("rate limited by venue")]
    RateLimited,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("venue error {code}: {message}")]
    Venue { code: i64, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    /// Worth trying again on a later cycle without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Venue { .. } | Self::Parse(_) => false,
        }
    }

    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Http(_) => "network",
            Self::Status { .. } => "status",
            Self::Venue { .. } => "venue",
            Self::Parse(_) => "parse",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
