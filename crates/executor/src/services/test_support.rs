use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::models::{IndicatorSnapshot, Pair, Signal, Timeframe};
use market_data::{FetchError, IndicatorSource};
use render::{Artifact, RenderError, SignalRenderer};

use crate::services::platform::{BotPlatform, Menu, MessageTarget, PublishError};

/// Serves fixed snapshots by pair code; unknown codes fail.
#[derive(Default)]
pub struct FakeSource {
    snapshots: HashMap<String, IndicatorSnapshot>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    fail_first: usize,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn with(mut self, code: &str, snapshot: IndicatorSnapshot) -> Self {
        self.snapshots.insert(code.to_string(), snapshot);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn with_delay_for(mut self, code: &str, delay: Duration) -> Self {
        self.delays.insert(code.to_string(), delay);
        self
    }

    /// The first `n` calls fail with a 503 regardless of pair.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndicatorSource for FakeSource {
    async fn fetch_indicators(
        &self,
        pair: &Pair,
        _exchange: &str,
        _timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(pair.code()).or(self.default_delay.as_ref()) {
            tokio::time::sleep(*delay).await;
        }
        if call < self.fail_first {
            return Err(FetchError::Status(503));
        }
        self.snapshots
            .get(pair.code())
            .copied()
            .ok_or_else(|| FetchError::UnknownSymbol(pair.to_string()))
    }
}

/// Artifact bytes are the pair code so tests can match artifacts to requests.
#[derive(Default)]
pub struct FakeRenderer {
    pub calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SignalRenderer for FakeRenderer {
    fn render(&self, signal: &Signal) -> Result<Artifact, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Artifact {
            file_name: format!("{}_{}.png", signal.pair, signal.timeframe),
            bytes: signal.pair.code().as_bytes().to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub destination: i64,
    pub artifact: Artifact,
    pub caption: String,
}

/// Records every outbound call. Publishing fails while `fail_publish` is set.
#[derive(Default)]
pub struct RecordingPlatform {
    pub sent: Mutex<Vec<(i64, Menu)>>,
    pub edits: Mutex<Vec<(MessageTarget, Menu)>>,
    pub published: Mutex<Vec<Published>>,
    pub fail_publish: AtomicBool,
    pub fail_edit: AtomicBool,
}

impl RecordingPlatform {
    pub fn edits(&self) -> Vec<(MessageTarget, Menu)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(i64, Menu)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl BotPlatform for RecordingPlatform {
    async fn send_menu(&self, chat_id: i64, menu: &Menu) -> Result<(), PublishError> {
        self.sent.lock().unwrap().push((chat_id, menu.clone()));
        Ok(())
    }

    async fn edit_message(&self, target: MessageTarget, menu: &Menu) -> Result<(), PublishError> {
        if self.fail_edit.load(Ordering::SeqCst) {
            return Err(PublishError::Platform("message to edit not found".to_string()));
        }
        self.edits.lock().unwrap().push((target, menu.clone()));
        Ok(())
    }

    async fn publish_artifact(
        &self,
        destination: i64,
        artifact: Artifact,
        caption: &str,
    ) -> Result<(), PublishError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(PublishError::Platform("chat not found".to_string()));
        }
        self.published.lock().unwrap().push(Published {
            destination,
            artifact,
            caption: caption.to_string(),
        });
        Ok(())
    }
}

pub fn bullish() -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi: 25.0,
        macd: 0.4,
        macd_signal: 0.1,
        sma: 1.0,
        close: 1.2,
    }
}

pub fn bearish() -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi: 75.0,
        macd: 0.1,
        macd_signal: 0.4,
        sma: 1.2,
        close: 1.0,
    }
}
