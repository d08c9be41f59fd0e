use std::sync::Arc;

use chrono::Utc;
use common::config::AppConfig;
use common::models::{Pair, Signal, Timeframe};
use market_data::{FetchError, IndicatorSource};
use render::{Artifact, RenderError, SignalRenderer};
use strategy::services::ScoringEngine;
use tokio::time::timeout;
use tracing::info;

/// Fetch, score, render and format, shared by the interactive and the
/// broadcast paths. Holds no per-request state.
pub struct SignalPipeline {
    config: Arc<AppConfig>,
    source: Arc<dyn IndicatorSource>,
    renderer: Arc<dyn SignalRenderer>,
    engine: ScoringEngine,
}

impl SignalPipeline {
    pub fn new(
        config: Arc<AppConfig>,
        source: Arc<dyn IndicatorSource>,
        renderer: Arc<dyn SignalRenderer>,
    ) -> Self {
        Self {
            config,
            source,
            renderer,
            engine: ScoringEngine::new(),
        }
    }

    /// Scores a fresh snapshot. A failed or slow fetch is returned as an
    /// error and the engine is never invoked.
    pub async fn analyze(&self, pair: &Pair, timeframe: Timeframe) -> Result<Signal, FetchError> {
        let limit = self.config.fetch_timeout;
        let snapshot = timeout(
            limit,
            self.source
                .fetch_indicators(pair, &self.config.exchange, timeframe),
        )
        .await
        .map_err(|_| FetchError::Timeout(limit))??;

        let verdict = self.engine.evaluate(&snapshot);
        info!(
            "Signal {} {}: {:?} score={} confidence={}%",
            pair, timeframe, verdict.direction, verdict.score, verdict.confidence
        );

        Ok(Signal {
            pair: pair.clone(),
            timeframe,
            direction: verdict.direction,
            confidence: verdict.confidence,
            generated_at: Utc::now(),
        })
    }

    pub fn render(&self, signal: &Signal) -> Result<Artifact, RenderError> {
        self.renderer.render(signal)
    }

    /// Message text used both as the requester reply and the photo caption.
    pub fn format_message(&self, signal: &Signal) -> String {
        let time = signal
            .generated_at
            .with_timezone(&self.config.display_tz)
            .format("%H:%M:%S");

        let mut msg = String::new();
        if let Some(signature) = &self.config.signature {
            msg.push_str(&format!("{} 👈\n\n", signature));
        }
        msg.push_str(&format!(
            "💷 {}\n💎 {}\n{} {}\n🤖 Confidence: {}%\n⌚ Time: {}\n🔗 TV: {}",
            signal.pair,
            signal.timeframe,
            signal.direction.glyph(),
            signal.direction.label(),
            signal.confidence,
            time,
            self.config.chart_link(&signal.pair),
        ));
        msg
    }
}
