use async_trait::async_trait;
use common::models::{IndicatorSnapshot, Pair, Timeframe};

use crate::error::FetchError;

/// Source of indicator snapshots for a symbol on a given exchange.
///
/// Implementations translate `timeframe` to their own interval constant and
/// report every failure as a [`FetchError`].
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    async fn fetch_indicators(
        &self,
        pair: &Pair,
        exchange: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot, FetchError>;
}
