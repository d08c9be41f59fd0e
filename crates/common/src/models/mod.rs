pub mod indicators;
pub mod pair;
pub mod signal;
pub mod timeframe;

pub use indicators::IndicatorSnapshot;
pub use pair::{DEFAULT_PAIRS, Pair, PairError, Universe};
pub use signal::{Direction, Signal};
pub use timeframe::{Timeframe, UnknownTimeframe};
