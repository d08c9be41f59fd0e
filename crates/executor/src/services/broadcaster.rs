use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use common::actors::{Actor, ActorType, ControlMessage};
use common::config::AppConfig;
use common::models::{Pair, Signal};
use rand::Rng;
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{info, warn};

use crate::services::analysis::SignalPipeline;
use crate::services::outbox::Outbox;

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Published(Signal),
    /// Analysis failed; nothing was posted this tick.
    Skipped,
    PublishFailed,
}

/// Posts a signal for a random pair to the broadcast channel on a fixed
/// interval. Best effort: failures are logged and the next tick retries.
pub struct BroadcasterActor {
    config: Arc<AppConfig>,
    pipeline: Arc<SignalPipeline>,
    outbox: Outbox,
}

#[async_trait]
impl Actor for BroadcasterActor {
    fn name(&self) -> ActorType {
        ActorType::BroadcasterActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> Result<()> {
        let _heartbeat = self.spawn_heartbeat(supervisor_tx);

        info!(
            "Starting broadcaster: every {:?} on {}",
            self.config.broadcast_interval, self.config.broadcast_timeframe
        );

        loop {
            self.tick().await;
            time::sleep(self.config.broadcast_interval).await;
        }
    }
}

impl BroadcasterActor {
    pub fn new(config: Arc<AppConfig>, pipeline: Arc<SignalPipeline>, outbox: Outbox) -> Self {
        Self {
            config,
            pipeline,
            outbox,
        }
    }

    pub fn pick_pair<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Pair> {
        self.config.universe.pairs().choose(rng).cloned()
    }

    pub async fn tick(&self) -> TickOutcome {
        let Some(pair) = self.pick_pair(&mut rand::thread_rng()) else {
            return TickOutcome::Skipped;
        };
        let timeframe = self.config.broadcast_timeframe;

        let signal = match self.pipeline.analyze(&pair, timeframe).await {
            Ok(signal) => signal,
            Err(e) => {
                warn!("Broadcast skipped for {} {}: {}", pair, timeframe, e);
                return TickOutcome::Skipped;
            }
        };

        let artifact = match self.pipeline.render(&signal) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("Broadcast render failed for {}: {}", pair, e);
                return TickOutcome::PublishFailed;
            }
        };

        let caption = self.pipeline.format_message(&signal);
        match self.outbox.publish(artifact, caption).await {
            Ok(()) => {
                info!("Broadcast {} {} {:?}", signal.pair, signal.timeframe, signal.direction);
                TickOutcome::Published(signal)
            }
            Err(e) => {
                warn!("Broadcast publish failed for {}: {}", pair, e);
                TickOutcome::PublishFailed
            }
        }
    }
}
