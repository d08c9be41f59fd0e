use std::time::Duration;

use async_trait::async_trait;
use common::models::{IndicatorSnapshot, Pair, Timeframe};
use reqwest::{Client, StatusCode};
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::backoff::ExponentialBackoff;
use crate::error::FetchError;
use crate::remote::scan_response::{ScanRequest, ScanResponse};
use crate::traits::IndicatorSource;

const USER_AGENT: &str = "forex_signal_bot/0.1.0";
const MAX_RETRIES: u32 = 3;

/// Indicator source backed by the TradingView scanner endpoint.
///
/// One fetch, rate-limit retries included, never runs past `budget`.
pub struct TradingViewClient {
    client: Client,
    base_url: String,
    screener: String,
    budget: Duration,
}

impl TradingViewClient {
    pub fn new(
        base_url: impl Into<String>,
        screener: impl Into<String>,
        budget: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            screener: screener.into(),
            budget,
        })
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::within(self.budget, MAX_RETRIES)
    }

    fn scan_url(&self) -> String {
        format!("{}/{}/scan", self.base_url, self.screener)
    }

    async fn make_request(
        &self,
        request: &ScanRequest,
        time_left: Duration,
    ) -> Result<ScanResponse, FetchError> {
        if time_left.is_zero() {
            return Err(FetchError::Timeout(self.budget));
        }

        let response = self
            .client
            .post(self.scan_url())
            .timeout(time_left)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            return Err(FetchError::RateLimited(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str::<ScanResponse>(&body)?)
    }
}

#[async_trait]
impl IndicatorSource for TradingViewClient {
    async fn fetch_indicators(
        &self,
        pair: &Pair,
        exchange: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot, FetchError> {
        let ticker = format!("{}:{}", exchange, pair);
        let request = ScanRequest::new(&ticker, timeframe);
        let deadline = Instant::now() + self.budget;
        let mut backoff = self.backoff();

        loop {
            let time_left = deadline.saturating_duration_since(Instant::now());
            match self.make_request(&request, time_left).await {
                Ok(response) => {
                    let snapshot = response.to_snapshot(&ticker)?;
                    debug!("Indicators for {} ({}): {:?}", ticker, timeframe, snapshot);
                    return Ok(snapshot);
                }
                Err(e) if e.is_rate_limit() => {
                    let time_left = deadline.saturating_duration_since(Instant::now());
                    let Some(delay) = backoff.retry_in(time_left) else {
                        warn!("Rate limited for {}, giving up after {} retries", ticker, backoff.attempt());
                        return Err(e);
                    };
                    warn!(
                        "Rate limited for {}, backing off for {:?} (attempt {}/{})",
                        ticker,
                        delay,
                        backoff.attempt(),
                        MAX_RETRIES
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_url_joins_screener() {
        let client = TradingViewClient::new(
            "https://scanner.tradingview.com",
            "forex",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.scan_url(), "https://scanner.tradingview.com/forex/scan");
    }

    #[tokio::test]
    async fn test_unreachable_host_surfaces_typed_error() {
        let client =
            TradingViewClient::new("http://127.0.0.1:9", "forex", Duration::from_secs(2)).unwrap();
        let pair = Pair::new("EURUSD").unwrap();

        let err = client
            .fetch_indicators(&pair, "OANDA", Timeframe::OneMinute)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }

    #[test]
    fn test_retry_schedule_is_sized_from_fetch_budget() {
        let client =
            TradingViewClient::new("http://127.0.0.1:9", "forex", Duration::from_secs(10)).unwrap();
        let mut backoff = client.backoff();
        let mut slept = Duration::ZERO;

        while let Some(delay) = backoff.retry_in(Duration::from_secs(10) - slept) {
            slept += delay;
        }
        assert_eq!(backoff.attempt(), MAX_RETRIES);
        assert!(slept < Duration::from_secs(6), "slept {:?}", slept);
    }

    #[tokio::test]
    async fn test_spent_budget_fails_without_a_request() {
        let client =
            TradingViewClient::new("http://127.0.0.1:9", "forex", Duration::from_secs(2)).unwrap();
        let request = ScanRequest::new("OANDA:EURUSD", Timeframe::OneMinute);

        let err = client.make_request(&request, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_secs(2)));
    }
}
