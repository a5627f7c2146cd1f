//! Notification channel bound to one chat.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use seedwatch_torrent_core::{ChannelResult, MessageHandle, NotificationChannel};

use crate::api::TelegramBot;

/// [`NotificationChannel`] delivering to a single Telegram chat.
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Arc<TelegramBot>,
    chat_id: String,
}

impl TelegramChannel {
    /// Bind `bot` to `chat_id`.
    #[must_use]
    pub fn new(bot: Arc<TelegramBot>, chat_id: impl Into<String>) -> Self {
        Self {
            bot,
            chat_id: chat_id.into(),
        }
    }

    /// Destination chat identifier.
    #[must_use]
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send_message(&self, text: &str) -> ChannelResult<MessageHandle> {
        let message = self.bot.send_message(&self.chat_id, text).await?;
        Ok(MessageHandle(message.message_id))
    }

    async fn edit_message(&self, handle: MessageHandle, text: &str) -> ChannelResult<()> {
        self.bot
            .edit_message_text(&self.chat_id, handle.0, text)
            .await
    }

    async fn delete_message(&self, handle: MessageHandle) -> ChannelResult<()> {
        self.bot.delete_message(&self.chat_id, handle.0).await
    }

    async fn send_document(&self, path: &Path, caption: &str) -> ChannelResult<()> {
        self.bot
            .send_document(&self.chat_id, path, caption)
            .await
            .map(|_| ())
    }
}
