use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use common::actors::{Actor, ActorType, ControlMessage};
use tokio::sync::{broadcast, mpsc};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::services::conversation::{Conversation, Transition};
use crate::services::dispatcher::{DeliveryResult, RequestDispatcher};
use crate::services::platform::{BotPlatform, InboundEvent, MessageTarget};

#[derive(Debug)]
pub enum Handled {
    Menu,
    Delivery(DeliveryResult),
    Malformed,
}

/// Everything needed to answer one interaction. Shared by every
/// per-event task.
pub struct InteractionContext {
    conversation: Arc<Conversation>,
    dispatcher: Arc<RequestDispatcher>,
    platform: Arc<dyn BotPlatform>,
}

impl InteractionContext {
    pub fn new(
        conversation: Arc<Conversation>,
        dispatcher: Arc<RequestDispatcher>,
        platform: Arc<dyn BotPlatform>,
    ) -> Self {
        Self {
            conversation,
            dispatcher,
            platform,
        }
    }

    pub async fn handle_event(&self, event: &InboundEvent) -> Handled {
        match event {
            InboundEvent::Start { chat_id } => {
                if let Err(e) = self.platform.send_menu(*chat_id, &self.conversation.main_menu()).await {
                    error!("Failed to send main menu to {}: {}", chat_id, e);
                }
                Handled::Menu
            }
            InboundEvent::Callback { target, token } => self.handle_callback(*target, token).await,
        }
    }

    async fn handle_callback(&self, target: MessageTarget, token: &str) -> Handled {
        match self.conversation.transition(token) {
            Ok(Transition::Show(menu)) => {
                if let Err(e) = self.platform.edit_message(target, &menu).await {
                    error!("Failed to show menu in chat {}: {}", target.chat_id, e);
                }
                Handled::Menu
            }
            Ok(Transition::Completed(selection)) => {
                Handled::Delivery(self.dispatcher.handle(target, &selection).await)
            }
            Err(e) => {
                warn!("{}", e);
                if let Err(e) = self.platform.edit_message(target, &self.conversation.error_menu()).await {
                    error!("Failed to show error menu in chat {}: {}", target.chat_id, e);
                }
                Handled::Malformed
            }
        }
    }
}

/// Receives interaction events and answers each one in its own task, so a
/// slow analysis never holds up menus for other users.
pub struct ListenerActor {
    events_rx: broadcast::Receiver<Arc<InboundEvent>>,
    context: Arc<InteractionContext>,
}

#[async_trait]
impl Actor for ListenerActor {
    fn name(&self) -> ActorType {
        ActorType::ListenerActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> Result<()> {
        let heartbeat = self.spawn_heartbeat(supervisor_tx.clone());

        info!("Starting interaction listener");

        loop {
            match self.events_rx.recv().await {
                Ok(event) => {
                    let context = self.context.clone();
                    let span = info_span!("interaction", request_id = %Uuid::new_v4());
                    tokio::spawn(
                        async move {
                            debug!("Handling {:?}", event);
                            let handled = context.handle_event(&event).await;
                            debug!("Done: {:?}", handled);
                        }
                        .instrument(span),
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Listener lagged: missed {} interaction events", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    let err_msg = "Interaction channel closed. Stopping listener.".to_string();
                    heartbeat.stop();
                    supervisor_tx
                        .send(ControlMessage::Error(self.name(), err_msg.clone()))
                        .await?;
                    bail!(err_msg);
                }
            }
        }
    }
}

impl ListenerActor {
    pub fn new(
        events_rx: broadcast::Receiver<Arc<InboundEvent>>,
        context: Arc<InteractionContext>,
    ) -> Self {
        Self { events_rx, context }
    }
}
