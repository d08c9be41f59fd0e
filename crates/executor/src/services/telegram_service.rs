use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use common::actors::{Actor, ActorType, ControlMessage};
use render::Artifact;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId};
use teloxide::utils::command::BotCommands;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::services::platform::{BotPlatform, InboundEvent, Menu, MessageTarget, PublishError};

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "open the signal menu")]
    Start,
}

fn keyboard(menu: &Menu) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(menu.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.token.clone()))
            .collect::<Vec<_>>()
    }))
}

fn platform_error(e: teloxide::RequestError) -> PublishError {
    PublishError::Platform(e.to_string())
}

/// Outbound Telegram calls. `Bot` is cheap to clone and safe to share.
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl BotPlatform for TelegramPlatform {
    async fn send_menu(&self, chat_id: i64, menu: &Menu) -> Result<(), PublishError> {
        self.bot
            .send_message(ChatId(chat_id), menu.text.clone())
            .reply_markup(keyboard(menu))
            .await
            .map(|_| ())
            .map_err(platform_error)
    }

    async fn edit_message(&self, target: MessageTarget, menu: &Menu) -> Result<(), PublishError> {
        self.bot
            .edit_message_text(
                ChatId(target.chat_id),
                MessageId(target.message_id),
                menu.text.clone(),
            )
            .reply_markup(keyboard(menu))
            .await
            .map(|_| ())
            .map_err(platform_error)
    }

    async fn publish_artifact(
        &self,
        destination: i64,
        artifact: Artifact,
        caption: &str,
    ) -> Result<(), PublishError> {
        let photo = InputFile::memory(artifact.bytes).file_name(artifact.file_name);
        self.bot
            .send_photo(ChatId(destination), photo)
            .caption(caption.to_string())
            .await
            .map(|_| ())
            .map_err(platform_error)
    }
}

/// Long-polls Telegram and republishes commands and button presses as
/// [`InboundEvent`]s.
pub struct TelegramGateway {
    bot: Bot,
    events_tx: broadcast::Sender<Arc<InboundEvent>>,
}

#[async_trait]
impl Actor for TelegramGateway {
    fn name(&self) -> ActorType {
        ActorType::TelegramGatewayActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> Result<()> {
        let heartbeat = self.spawn_heartbeat(supervisor_tx.clone());

        info!("Starting Telegram gateway (long polling)");

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(on_command),
            )
            .branch(Update::filter_callback_query().endpoint(on_callback));

        Dispatcher::builder(self.bot.clone(), handler)
            .dependencies(dptree::deps![self.events_tx.clone()])
            .default_handler(|update| async move {
                debug!("Ignoring update {:?}", update.id);
            })
            .build()
            .dispatch()
            .await;

        let err_msg = "Telegram dispatcher stopped".to_string();
        heartbeat.stop();
        supervisor_tx
            .send(ControlMessage::Error(self.name(), err_msg.clone()))
            .await?;
        bail!(err_msg);
    }
}

impl TelegramGateway {
    pub fn new(bot: Bot, events_tx: broadcast::Sender<Arc<InboundEvent>>) -> Self {
        Self { bot, events_tx }
    }
}

fn forward(events_tx: &broadcast::Sender<Arc<InboundEvent>>, event: InboundEvent) {
    if events_tx.send(Arc::new(event)).is_err() {
        warn!("No listener subscribed, dropping interaction event");
    }
}

async fn on_command(
    msg: Message,
    cmd: Command,
    events_tx: broadcast::Sender<Arc<InboundEvent>>,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => forward(&events_tx, InboundEvent::Start { chat_id: msg.chat.id.0 }),
    }
    Ok(())
}

async fn on_callback(
    bot: Bot,
    q: CallbackQuery,
    events_tx: broadcast::Sender<Arc<InboundEvent>>,
) -> ResponseResult<()> {
    // Stops the client-side spinner; the real answer is the edited message
    bot.answer_callback_query(q.id.clone()).await?;

    let (Some(token), Some(message)) = (q.data.as_ref(), q.message.as_ref()) else {
        debug!("Callback {:?} without data or message, ignoring", q.id);
        return Ok(());
    };

    let target = MessageTarget {
        chat_id: message.chat().id.0,
        message_id: message.id().0,
    };
    forward(
        &events_tx,
        InboundEvent::Callback {
            target,
            token: token.clone(),
        },
    );
    Ok(())
}
