use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::Bot;
use tokio::sync::broadcast;
use tracing::{debug, info};

use common::actors::ActorType;
use common::config::AppConfig;
use common::logger;
use market_data::IndicatorSource;
use market_data::remote::tradingview_client::TradingViewClient;
use render::{CardRenderer, SignalRenderer};

use crate::actors::supervisor::Supervisor;
use crate::services::analysis::SignalPipeline;
use crate::services::broadcaster::BroadcasterActor;
use crate::services::conversation::Conversation;
use crate::services::dispatcher::RequestDispatcher;
use crate::services::listener::{InteractionContext, ListenerActor};
use crate::services::outbox::Outbox;
use crate::services::platform::{BotPlatform, InboundEvent};
use crate::services::telegram_service::{TelegramGateway, TelegramPlatform};

mod actors;
mod services;

const OUTBOX_CAPACITY: usize = 64;
const EVENT_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::setup_logger();
    dotenv().ok();
    debug!("System starting up...");

    let config = Arc::new(AppConfig::from_env()?);
    info!("Loaded configuration: {:?}", config);

    let bot = Bot::new(config.bot_token.clone());
    let platform: Arc<dyn BotPlatform> = Arc::new(TelegramPlatform::new(bot.clone()));

    let source: Arc<dyn IndicatorSource> = Arc::new(TradingViewClient::new(
        config.scanner_url.clone(),
        config.screener.clone(),
        config.fetch_timeout,
    )?);
    let renderer: Arc<dyn SignalRenderer> = Arc::new(CardRenderer::new(config.display_tz));
    let pipeline = Arc::new(SignalPipeline::new(config.clone(), source, renderer));

    let (outbox, _outbox_handle) = Outbox::spawn(platform.clone(), config.channel_id, OUTBOX_CAPACITY);

    let conversation = Arc::new(Conversation::new(config.clone()));
    let dispatcher = Arc::new(RequestDispatcher::new(
        pipeline.clone(),
        platform.clone(),
        outbox.clone(),
    ));
    let context = Arc::new(InteractionContext::new(conversation, dispatcher, platform));

    let (events_tx, events_rx) = broadcast::channel::<Arc<InboundEvent>>(EVENT_BUFFER);

    let mut supervisor = Supervisor::new();

    let tx_for_gateway = events_tx.clone();
    supervisor.register_actor(
        ActorType::TelegramGatewayActor,
        Box::new(move || Box::new(TelegramGateway::new(bot.clone(), tx_for_gateway.clone()))),
    );

    supervisor.register_actor(
        ActorType::ListenerActor,
        Box::new(move || {
            Box::new(ListenerActor::new(
                events_rx.resubscribe(),
                context.clone(),
            ))
        }),
    );

    supervisor.register_actor(
        ActorType::BroadcasterActor,
        Box::new(move || {
            Box::new(BroadcasterActor::new(
                config.clone(),
                pipeline.clone(),
                outbox.clone(),
            ))
        }),
    );

    supervisor.start().await;
    info!("System stopped.");
    Ok(())
}
