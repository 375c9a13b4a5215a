use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use market::pulse::AlignMode;
use market::source::Interval;
use scheduler::types::DEFAULT_INSTRUMENTS;
use scheduler::{ConfigError, MonitorConfig};

/// Which market-data venue backs the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Venue {
    #[default]
    Mexc,
    Binance,
}

impl FromStr for Venue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mexc" => Ok(Self::Mexc),
            "binance" => Ok(Self::Binance),
            other => Err(format!("unknown venue `{other}`, expected mexc or binance")),
        }
    }
}

/// Bot credentials. `Debug` never prints the token.
#[derive(Clone)]
pub struct TelegramCreds {
    pub token: String,
    pub chat_id: String,
}

impl fmt::Debug for TelegramCreds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramCreds")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Scheduler knobs, validated before the monitor starts.
    pub monitor: MonitorConfig,

    pub venue: Venue,
    pub interval: Interval,

    /// `None` sends alerts to the log instead of Telegram.
    pub telegram: Option<TelegramCreds>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset or blank keys fall back
    /// to their defaults; anything set but unparsable is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = MonitorConfig::default();

        let instruments = match get("MONITOR_SYMBOLS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
        };

        let monitor = MonitorConfig {
            instruments,
            rolling_period: parse_or(&get, "Z_PERIOD", defaults.rolling_period)?,
            window_margin: parse_or(&get, "Z_WINDOW_MARGIN", defaults.window_margin)?,
            z_threshold: parse_or(&get, "Z_THRESHOLD", defaults.z_threshold)?,
            cooldown: secs_or(&get, "RENOTIFY_COOLDOWN_SECS", defaults.cooldown)?,
            cycle_interval: secs_or(&get, "CYCLE_INTERVAL_SECS", defaults.cycle_interval)?,
            fetch_timeout: secs_or(&get, "FETCH_TIMEOUT_SECS", defaults.fetch_timeout)?,
            initial_fetch_limit: parse_or(&get, "INITIAL_FETCH_LIMIT", defaults.initial_fetch_limit)?,
            refresh_fetch_limit: parse_or(&get, "REFRESH_FETCH_LIMIT", defaults.refresh_fetch_limit)?,
            align_mode: parse_or(&get, "ALIGN_MODE", AlignMode::default())?,
        };
        monitor.validate()?;

        let telegram = match (get("TELEGRAM_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramCreds { token, chat_id }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::Invalid {
                    key: "TELEGRAM_CHAT_ID",
                    value: String::new(),
                    reason: "required when TELEGRAM_TOKEN is set".into(),
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid {
                    key: "TELEGRAM_TOKEN",
                    value: String::new(),
                    reason: "required when TELEGRAM_CHAT_ID is set".into(),
                });
            }
        };

        Ok(Self {
            monitor,
            venue: parse_or(&get, "MONITOR_VENUE", Venue::default())?,
            interval: parse_or(&get, "MONITOR_INTERVAL", Interval::default())?,
            telegram,
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn secs_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parse_or(get, key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let cfg = from(&[]).unwrap();

        assert_eq!(cfg.monitor.instruments.len(), 14);
        assert_eq!(cfg.monitor.rolling_period, 300);
        assert_eq!(cfg.monitor.z_threshold, 3.0);
        assert_eq!(cfg.monitor.cooldown, Duration::from_secs(300));
        assert_eq!(cfg.monitor.align_mode, AlignMode::Trailing);
        assert_eq!(cfg.venue, Venue::Mexc);
        assert_eq!(cfg.interval, Interval::Min5);
        assert!(cfg.telegram.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = from(&[
            ("MONITOR_SYMBOLS", "BTC_USDT, ETH_USDT ,,SOL_USDT"),
            ("MONITOR_VENUE", "Binance"),
            ("Z_PERIOD", "20"),
            ("Z_THRESHOLD", "2.5"),
            ("RENOTIFY_COOLDOWN_SECS", "60"),
            ("INITIAL_FETCH_LIMIT", "100"),
            ("ALIGN_MODE", "timestamp"),
        ])
        .unwrap();

        assert_eq!(cfg.monitor.instruments, vec!["BTC_USDT", "ETH_USDT", "SOL_USDT"]);
        assert_eq!(cfg.venue, Venue::Binance);
        assert_eq!(cfg.monitor.rolling_period, 20);
        assert_eq!(cfg.monitor.z_threshold, 2.5);
        assert_eq!(cfg.monitor.cooldown, Duration::from_secs(60));
        assert_eq!(cfg.monitor.align_mode, AlignMode::Timestamp);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = from(&[("Z_PERIOD", "  "), ("TELEGRAM_TOKEN", "")]).unwrap();

        assert_eq!(cfg.monitor.rolling_period, 300);
        assert!(cfg.telegram.is_none());
    }

    #[test]
    fn unparsable_number_is_fatal() {
        let err = from(&[("Z_THRESHOLD", "three")]).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { key: "Z_THRESHOLD", .. }));
    }

    #[test]
    fn validation_rules_apply() {
        assert_eq!(
            from(&[("MONITOR_SYMBOLS", "BTC_USDT")]).unwrap_err(),
            ConfigError::TooFewInstruments(1)
        );
        assert_eq!(
            from(&[("MONITOR_SYMBOLS", "BTC_USDT,BTC_USDT")]).unwrap_err(),
            ConfigError::DuplicateInstrument("BTC_USDT".into())
        );
        assert_eq!(
            from(&[("Z_THRESHOLD", "0")]).unwrap_err(),
            ConfigError::Threshold(0.0)
        );
        assert_eq!(
            from(&[("CYCLE_INTERVAL_SECS", "0")]).unwrap_err(),
            ConfigError::ZeroDuration("cycle_interval")
        );
        assert_eq!(
            from(&[("Z_PERIOD", "600")]).unwrap_err(),
            ConfigError::FetchLimit { limit: 500, need: 601 }
        );
    }

    #[test]
    fn telegram_needs_both_halves() {
        let err = from(&[("TELEGRAM_TOKEN", "123:abc")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TELEGRAM_CHAT_ID", .. }));

        let cfg = from(&[("TELEGRAM_TOKEN", "123:abc"), ("TELEGRAM_CHAT_ID", "-42")]).unwrap();
        let creds = cfg.telegram.unwrap();
        assert_eq!(creds.chat_id, "-42");
    }

    #[test]
    fn debug_output_hides_token() {
        let cfg = from(&[("TELEGRAM_TOKEN", "123:SECRET"), ("TELEGRAM_CHAT_ID", "-42")]).unwrap();

        let dbg = format!("{cfg:?}");

        assert!(!dbg.contains("SECRET"));
        assert!(dbg.contains("-42"));
    }

    #[test]
    fn unknown_venue_is_rejected() {
        let err = from(&[("MONITOR_VENUE", "kraken")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MONITOR_VENUE", .. }));
    }
}
