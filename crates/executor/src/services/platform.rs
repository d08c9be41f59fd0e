use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use render::Artifact;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Callback payload, see `conversation` for the grammar.
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Message text plus an inline keyboard, one `Vec` per keyboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menu {
    pub text: String,
    pub rows: Vec<Vec<Button>>,
}

impl Menu {
    /// One button per row, in the given order.
    pub fn stacked(text: impl Into<String>, buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            text: text.into(),
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// A message previously sent by the bot, which callbacks point back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageTarget {
    pub chat_id: i64,
    pub message_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Start { chat_id: i64 },
    Callback { target: MessageTarget, token: String },
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("platform rejected request: {0}")]
    Platform(String),
    #[error("outbox is closed")]
    OutboxClosed,
}

/// Outbound half of the chat platform. Implementations must tolerate
/// concurrent callers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BotPlatform: Send + Sync {
    async fn send_menu(&self, chat_id: i64, menu: &Menu) -> Result<(), PublishError>;

    async fn edit_message(&self, target: MessageTarget, menu: &Menu) -> Result<(), PublishError>;

    async fn publish_artifact(
        &self,
        destination: i64,
        artifact: Artifact,
        caption: &str,
    ) -> Result<(), PublishError>;
}
