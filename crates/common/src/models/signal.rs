use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Pair, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Up => "CALL",
            Self::Down => "PUT",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Self::Up => "🔼",
            Self::Down => "🔽",
        }
    }
}

/// A directional call for one pair and timeframe.
///
/// `confidence` is a display value drawn uniformly from a fixed band. It is
/// not derived from the indicators and must not be read as a probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub pair: Pair,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub confidence: u8,
    pub generated_at: DateTime<Utc>,
}
