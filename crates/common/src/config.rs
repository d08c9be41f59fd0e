use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

use crate::models::{Pair, PairError, Timeframe, Universe, UnknownTimeframe};

pub const DEFAULT_BROADCAST_INTERVAL_SECS: u64 = 180;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DISPLAY_TZ: Tz = chrono_tz::Europe::London;
pub const DEFAULT_EXCHANGE: &str = "OANDA";
pub const DEFAULT_SCREENER: &str = "forex";
pub const DEFAULT_SCANNER_URL: &str = "https://scanner.tradingview.com";
pub const DEFAULT_CHART_URL_BASE: &str = "https://www.tradingview.com/chart/?symbol=";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{name}={value:?} is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("PAIRS: {0}")]
    Pairs(#[from] PairError),
    #[error("timeframe: {0}")]
    Timeframe(#[from] UnknownTimeframe),
}

/// Process-wide settings, built once at startup and shared read-only.
#[derive(Clone)]
pub struct AppConfig {
    pub bot_token: String,
    /// Channel that receives every published signal.
    pub channel_id: i64,
    pub broadcast_interval: Duration,
    pub broadcast_timeframe: Timeframe,
    pub universe: Universe,
    /// Timeframes offered in the interactive menu, in display order.
    pub timeframes: Vec<Timeframe>,
    /// Upper bound on a single market-data fetch, rate-limit retries included.
    pub fetch_timeout: Duration,
    pub display_tz: Tz,
    pub exchange: String,
    pub screener: String,
    pub scanner_url: String,
    pub chart_url_base: String,
    /// Handle printed on the first line of every signal message.
    pub signature: Option<String>,
}

impl AppConfig {
    pub fn new(bot_token: impl Into<String>, channel_id: i64) -> Self {
        Self {
            bot_token: bot_token.into(),
            channel_id,
            broadcast_interval: Duration::from_secs(DEFAULT_BROADCAST_INTERVAL_SECS),
            broadcast_timeframe: Timeframe::OneMinute,
            universe: Universe::default(),
            timeframes: Timeframe::ALL.to_vec(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            display_tz: DEFAULT_DISPLAY_TZ,
            exchange: DEFAULT_EXCHANGE.to_string(),
            screener: DEFAULT_SCREENER.to_string(),
            scanner_url: DEFAULT_SCANNER_URL.to_string(),
            chart_url_base: DEFAULT_CHART_URL_BASE.to_string(),
            signature: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;
        let channel_raw = get("TELEGRAM_CHAT_ID").ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?;
        let channel_id = parse_value("TELEGRAM_CHAT_ID", &channel_raw)?;

        let mut config = Self::new(bot_token, channel_id);

        if let Some(raw) = get("BROADCAST_INTERVAL_SECS") {
            config.broadcast_interval = parse_secs("BROADCAST_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = get("FETCH_TIMEOUT_SECS") {
            config.fetch_timeout = parse_secs("FETCH_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = get("BROADCAST_TIMEFRAME") {
            config.broadcast_timeframe = raw.trim().parse()?;
        }
        if let Some(raw) = get("PAIRS") {
            let pairs = split_list(&raw)
                .map(Pair::new)
                .collect::<Result<Vec<_>, _>>()?;
            config.universe = Universe::new(pairs)?;
        }
        if let Some(raw) = get("TIMEFRAMES") {
            let timeframes = split_list(&raw)
                .map(Timeframe::from_str)
                .collect::<Result<Vec<_>, _>>()?;
            if timeframes.is_empty() {
                return Err(ConfigError::Invalid {
                    name: "TIMEFRAMES",
                    value: raw,
                    reason: "at least one timeframe is required".to_string(),
                });
            }
            config.timeframes = timeframes;
        }
        if let Some(raw) = get("DISPLAY_TZ") {
            config.display_tz = parse_value("DISPLAY_TZ", &raw)?;
        }
        if let Some(raw) = get("MARKET_EXCHANGE") {
            config.exchange = raw.trim().to_ascii_uppercase();
        }
        if let Some(raw) = get("MARKET_SCREENER") {
            config.screener = raw.trim().to_string();
        }
        if let Some(raw) = get("SCANNER_URL") {
            config.scanner_url = raw.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("CHART_URL_BASE") {
            config.chart_url_base = raw.trim().to_string();
        }
        config.signature = get("SIGNATURE").map(|s| s.trim().to_string());

        Ok(config)
    }

    /// Deep link to the external chart viewer for `pair`.
    pub fn chart_link(&self, pair: &Pair) -> String {
        format!("{}{}:{}", self.chart_url_base, self.exchange, pair)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bot_token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("broadcast_interval", &self.broadcast_interval)
            .field("broadcast_timeframe", &self.broadcast_timeframe)
            .field("pairs", &self.universe.len())
            .field("timeframes", &self.timeframes)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("display_tz", &self.display_tz)
            .field("exchange", &self.exchange)
            .field("screener", &self.screener)
            .field("scanner_url", &self.scanner_url)
            .finish_non_exhaustive()
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_secs(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: u64 = parse_value(name, raw)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            name,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
