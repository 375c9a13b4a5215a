mod log_sink;
mod telegram;
mod templates;

pub use log_sink::LogSink;
pub use telegram::{TELEGRAM_API_BASE, TelegramSink};
pub use templates::{MAX_MESSAGE_CHARS, RenderedBatch, render_batch};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// |Z| at or above this is flagged `Extreme`, independent of the alerting
/// threshold.
pub const EXTREME_Z: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// First leg rich relative to the second.
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Extreme,
}

/// One qualifying divergence, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub pair_a: String,
    pub pair_b: String,
    pub z_score: f64,
    pub direction: Direction,
    pub severity: Severity,
}

impl Alert {
    pub fn new(pair_a: impl Into<String>, pair_b: impl Into<String>, z_score: f64) -> Self {
        let direction = if z_score > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };
        let severity = if z_score.abs() >= EXTREME_Z {
            Severity::Extreme
        } else {
            Severity::Normal
        };
        Self {
            pair_a: pair_a.into(),
            pair_b: pair_b.into(),
            z_score,
            direction,
            severity,
        }
    }

    pub fn pair_id(&self) -> String {
        format!("{}/{}", self.pair_a, self.pair_b)
    }
}

/// Best-effort delivery channel. Failures are reported, never retried here.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// `formatted = true` marks `message` as HTML markup.
    async fn dispatch(&self, message: &str, formatted: bool) -> Result<(), DeliveryError>;

    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Transport failure. The URL is stripped so credentials embedded in it
    /// never reach logs.
    #[error("http error: {0}")]
    Http(String),

    #[error("rejected by sink (status {status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url().to_string())
    }
}
