use common::models::{IndicatorSnapshot, Timeframe};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Scanner columns, in the order they come back in `ScanRow::d`.
pub const COLUMNS: [&str; 5] = ["RSI", "MACD.macd", "MACD.signal", "SMA10", "close"];

const RSI: usize = 0;
const MACD: usize = 1;
const MACD_SIGNAL: usize = 2;
const SMA: usize = 3;
const CLOSE: usize = 4;

/// Scanner interval suffix for a timeframe (`RSI|5` is the 5 minute RSI).
pub fn interval_suffix(timeframe: Timeframe) -> &'static str {
    match timeframe {
        Timeframe::OneMinute => "1",
        Timeframe::FiveMinutes => "5",
        Timeframe::FifteenMinutes => "15",
    }
}

#[derive(Debug, Serialize)]
pub struct ScanRequest {
    pub symbols: ScanSymbols,
    pub columns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanSymbols {
    pub tickers: Vec<String>,
    pub query: ScanQuery,
}

#[derive(Debug, Default, Serialize)]
pub struct ScanQuery {
    pub types: Vec<String>,
}

impl ScanRequest {
    pub fn new(ticker: &str, timeframe: Timeframe) -> Self {
        let suffix = interval_suffix(timeframe);
        Self {
            symbols: ScanSymbols {
                tickers: vec![ticker.to_string()],
                query: ScanQuery::default(),
            },
            columns: COLUMNS
                .iter()
                .map(|c| format!("{}|{}", c, suffix))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub data: Vec<ScanRow>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRow {
    /// Fully qualified ticker, e.g. `OANDA:EURUSD`.
    pub s: String,
    #[serde(default)]
    pub d: Vec<Option<f64>>,
}

impl ScanRow {
    fn value_or(&self, idx: usize, neutral: f64) -> f64 {
        self.d
            .get(idx)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
            .unwrap_or(neutral)
    }
}

impl ScanResponse {
    pub fn to_snapshot(&self, ticker: &str) -> Result<IndicatorSnapshot, FetchError> {
        let row = self
            .data
            .iter()
            .find(|row| row.s.eq_ignore_ascii_case(ticker))
            .ok_or_else(|| FetchError::UnknownSymbol(ticker.to_string()))?;

        let neutral = IndicatorSnapshot::default();
        Ok(IndicatorSnapshot {
            rsi: row.value_or(RSI, neutral.rsi),
            macd: row.value_or(MACD, neutral.macd),
            macd_signal: row.value_or(MACD_SIGNAL, neutral.macd_signal),
            sma: row.value_or(SMA, neutral.sma),
            close: row.value_or(CLOSE, neutral.close),
        })
    }
}
