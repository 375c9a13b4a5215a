//! Shared types used by the monitor scheduler.

use std::collections::HashSet;
use std::time::Duration;

use market::pulse::AlignMode;
use notifier::Alert;
use thiserror::Error;

/// Default universe: MEXC USDT-margined futures.
pub const DEFAULT_INSTRUMENTS: [&str; 14] = [
    "BTC_USDT",
    "ETH_USDT",
    "ETC_USDT",
    "SOL_USDT",
    "ADA_USDT",
    "DOT_USDT",
    "XRP_USDT",
    "XLM_USDT",
    "DOGE_USDT",
    "1000SHIB_USDT",
    "AVAX_USDT",
    "LTC_USDT",
    "LINK_USDT",
    "TRX_USDT",
];

/// Configuration knobs for the monitor. Validated once at startup.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Instruments to monitor. Every unordered pair is evaluated.
    pub instruments: Vec<String>,

    /// Number of spread points in the Z-score history (candles).
    pub rolling_period: usize,

    /// Extra samples kept per window beyond `rolling_period`.
    pub window_margin: usize,

    /// Alert when |Z| reaches this.
    pub z_threshold: f64,

    /// Minimum time between two alerts for the same pair.
    pub cooldown: Duration,

    /// Tick period of the steady-state loop.
    pub cycle_interval: Duration,

    /// Upper bound on any single data-source call.
    pub fetch_timeout: Duration,

    /// Candles requested when (re)building a window.
    pub initial_fetch_limit: usize,

    /// Candles requested on an incremental refresh.
    pub refresh_fetch_limit: usize,

    pub align_mode: AlignMode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            instruments: DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
            rolling_period: 300,
            window_margin: 10,
            z_threshold: 3.0,
            cooldown: Duration::from_secs(300),
            cycle_interval: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(10),
            initial_fetch_limit: 500,
            refresh_fetch_limit: 2,
            align_mode: AlignMode::Trailing,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for symbol in &self.instruments {
            if symbol.trim().is_empty() {
                return Err(ConfigError::EmptySymbol);
            }
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::DuplicateInstrument(symbol.clone()));
            }
        }
        if self.instruments.len() < 2 {
            return Err(ConfigError::TooFewInstruments(self.instruments.len()));
        }
        if self.rolling_period < 2 {
            return Err(ConfigError::Period(self.rolling_period));
        }
        if !(self.z_threshold.is_finite() && self.z_threshold > 0.0) {
            return Err(ConfigError::Threshold(self.z_threshold));
        }
        if self.cycle_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("cycle_interval"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("fetch_timeout"));
        }
        if self.initial_fetch_limit < self.rolling_period + 1 {
            return Err(ConfigError::FetchLimit {
                limit: self.initial_fetch_limit,
                need: self.rolling_period + 1,
            });
        }
        if self.refresh_fetch_limit == 0 {
            return Err(ConfigError::FetchLimit {
                limit: 0,
                need: 1,
            });
        }
        Ok(())
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown.as_millis() as u64
    }
}

/// Startup configuration problems. Any of these keeps the monitor from
/// starting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("at least 2 instruments are required, got {0}")]
    TooFewInstruments(usize),

    #[error("instrument symbols must not be empty")]
    EmptySymbol,

    #[error("instrument listed twice: {0}")]
    DuplicateInstrument(String),

    #[error("rolling period must be at least 2, got {0}")]
    Period(usize),

    #[error("z threshold must be a positive number, got {0}")]
    Threshold(f64),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("fetch limit {limit} is below the required {need}")]
    FetchLimit { limit: usize, need: usize },

    #[error("invalid value for {key}: `{value}` ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    /// Initial bulk load not finished.
    WarmingUp,
    /// Bulk load settled; periodic cycling.
    Steady,
}

/// What happened to this cycle's alert batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No alerts this cycle.
    Nothing,
    Delivered,
    /// Sink reported an error. Cooldowns were recorded anyway.
    Failed(String),
}

/// Summary of a single monitor cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub now_ms: u64,

    /// Instruments whose fetch succeeded this cycle.
    pub refreshed: usize,
    /// Instruments whose fetch failed or timed out.
    pub fetch_failed: usize,
    /// Instruments rebuilt from a full history fetch.
    pub recovered: usize,
    /// New samples appended across all windows.
    pub appended: usize,

    /// Pairs that reached the Z computation.
    pub pairs_evaluated: usize,
    pub skipped_cooldown: usize,
    pub skipped_insufficient: usize,
    pub skipped_degenerate: usize,

    /// Alerts sent this cycle. Every one of them now has a cooldown.
    pub alerts: Vec<Alert>,
    /// Qualifying alerts that did not fit into the message. They carry no
    /// cooldown and are retried next cycle.
    pub deferred: usize,
    pub dispatch: DispatchOutcome,
}

impl CycleReport {
    pub(crate) fn new(cycle: u64, now_ms: u64) -> Self {
        Self {
            cycle,
            now_ms,
            refreshed: 0,
            fetch_failed: 0,
            recovered: 0,
            appended: 0,
            pairs_evaluated: 0,
            skipped_cooldown: 0,
            skipped_insufficient: 0,
            skipped_degenerate: 0,
            alerts: Vec::new(),
            deferred: 0,
            dispatch: DispatchOutcome::Nothing,
        }
    }
}
