use serde::{Deserialize, Serialize};

pub const NEUTRAL_RSI: f64 = 50.0;

/// Raw indicator values for one symbol and interval, as supplied by the
/// market-data provider. Missing values fall back to neutral ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub sma: f64,
    pub close: f64,
}

impl Default for IndicatorSnapshot {
    fn default() -> Self {
        Self {
            rsi: NEUTRAL_RSI,
            macd: 0.0,
            macd_signal: 0.0,
            sma: 0.0,
            close: 0.0,
        }
    }
}
