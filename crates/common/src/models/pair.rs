use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAIRS: [&str; 20] = [
    // Majors
    "EURUSD", "GBPUSD", "USDJPY", "AUDUSD", "USDCAD",
    // Crosses
    "EURJPY", "GBPJPY", "EURGBP", "AUDJPY", "CHFJPY",
    "NZDUSD", "GBPAUD", "EURAUD", "AUDCAD", "CADJPY",
    "EURCHF", "USDCHF", "GBPCAD", "NZDJPY", "EURCAD",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PairError {
    #[error("pair code is empty")]
    Empty,
    #[error("pair code {0:?} must be ASCII letters and digits only")]
    InvalidCode(String),
    #[error("pair {0} listed more than once")]
    Duplicate(String),
    #[error("pair universe is empty")]
    EmptyUniverse,
}

/// A tradable symbol code such as `EURUSD`, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pair(String);

impl Pair {
    pub fn new(code: &str) -> Result<Self, PairError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(PairError::Empty);
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PairError::InvalidCode(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Pair {
    type Error = PairError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::new(&code)
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> Self {
        pair.0
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed, ordered set of pairs offered to users and the broadcaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    pairs: Vec<Pair>,
}

impl Universe {
    pub fn new(pairs: Vec<Pair>) -> Result<Self, PairError> {
        if pairs.is_empty() {
            return Err(PairError::EmptyUniverse);
        }
        for (i, pair) in pairs.iter().enumerate() {
            if pairs[..i].contains(pair) {
                return Err(PairError::Duplicate(pair.to_string()));
            }
        }
        Ok(Self { pairs })
    }

    pub fn from_codes<'a, I>(codes: I) -> Result<Self, PairError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pairs = codes
            .into_iter()
            .map(Pair::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(pairs)
    }

    /// Exact, case-sensitive lookup. Codes coming back from button payloads
    /// were produced from this universe, so anything else is foreign input.
    pub fn get(&self, code: &str) -> Option<&Pair> {
        self.pairs.iter().find(|p| p.code() == code)
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            pairs: DEFAULT_PAIRS.iter().map(|c| Pair(c.to_string())).collect(),
        }
    }
}
