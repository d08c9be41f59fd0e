use std::fmt;
use std::sync::Arc;

use common::models::{Pair, Signal};
use tracing::{error, info, warn};

use crate::services::analysis::SignalPipeline;
use crate::services::conversation::{Conversation, Selection};
use crate::services::outbox::Outbox;
use crate::services::platform::{BotPlatform, MessageTarget, PublishError};

/// Sent to the requester when their signal could not be posted to the channel.
pub const PUBLISH_FAILED_NOTICE: &str = "⚠️ Signal could not be posted to the channel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}

impl DeliveryOutcome {
    fn from_result<E: fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::Sent,
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryResult {
    /// Market data could not be obtained; only the notice was sent.
    FetchUnavailable {
        pair: Pair,
        reason: String,
        reply: DeliveryOutcome,
    },
    Delivered {
        signal: Signal,
        reply: DeliveryOutcome,
        broadcast: DeliveryOutcome,
    },
}

/// Turns a completed selection into a reply for the requester and a post
/// on the broadcast channel.
pub struct RequestDispatcher {
    pipeline: Arc<SignalPipeline>,
    platform: Arc<dyn BotPlatform>,
    outbox: Outbox,
}

impl RequestDispatcher {
    pub fn new(pipeline: Arc<SignalPipeline>, platform: Arc<dyn BotPlatform>, outbox: Outbox) -> Self {
        Self {
            pipeline,
            platform,
            outbox,
        }
    }

    pub async fn handle(&self, requester: MessageTarget, selection: &Selection) -> DeliveryResult {
        let Selection { pair, timeframe } = selection;

        let signal = match self.pipeline.analyze(pair, *timeframe).await {
            Ok(signal) => signal,
            Err(e) => {
                // No retry here, the source adapter owns retries
                warn!("Analysis unavailable for {} {}: {}", pair, timeframe, e);
                let notice = Conversation::with_new_trade(format!("⚠️ Analysis unavailable for {}", pair));
                let reply = DeliveryOutcome::from_result(self.platform.edit_message(requester, &notice).await);
                return DeliveryResult::FetchUnavailable {
                    pair: pair.clone(),
                    reason: e.to_string(),
                    reply,
                };
            }
        };

        let message = self.pipeline.format_message(&signal);

        // Independent side effects: neither may suppress the other
        let reply_menu = Conversation::with_new_trade(message.clone());
        let (reply, broadcast) = tokio::join!(
            self.platform.edit_message(requester, &reply_menu),
            self.broadcast(&signal, message),
        );

        let reply = DeliveryOutcome::from_result(reply);
        let broadcast = DeliveryOutcome::from_result(broadcast);

        if let DeliveryOutcome::Failed(reason) = &broadcast {
            warn!("Channel post failed for {} {}: {}", signal.pair, signal.timeframe, reason);
            let notice = Conversation::with_new_trade(PUBLISH_FAILED_NOTICE);
            if let Err(e) = self.platform.send_menu(requester.chat_id, &notice).await {
                error!("Failed to notify chat {} of channel failure: {}", requester.chat_id, e);
            }
        }
        info!(
            "Delivered {} {} to chat {}: reply={:?} broadcast={:?}",
            signal.pair, signal.timeframe, requester.chat_id, reply, broadcast
        );

        DeliveryResult::Delivered {
            signal,
            reply,
            broadcast,
        }
    }

    async fn broadcast(&self, signal: &Signal, caption: String) -> Result<(), PublishError> {
        let artifact = self
            .pipeline
            .render(signal)
            .map_err(|e| PublishError::Platform(format!("render failed: {}", e)))?;
        self.outbox.publish(artifact, caption).await
    }
}
