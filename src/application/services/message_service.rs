use std::sync::Arc;

use crate::application::errors::BotError;
use crate::domain::entities::StoredMessage;
use crate::domain::traits::{Bot, KeyboardButton, Store};

/// Service for outbound messages.
///
/// Delivered messages are also appended to the message log; a failed log
/// write is reported but never fails the send.
#[derive(Clone)]
pub struct MessageService {
    bot: Arc<dyn Bot>,
    store: Arc<dyn Store>,
}

impl MessageService {
    pub fn new(bot: Arc<dyn Bot>, store: Arc<dyn Store>) -> Self {
        Self { bot, store }
    }

    /// Send a plain message
    pub async fn send(&self, chat_id: i64, text: &str) -> Result<i64, BotError> {
        let message_id = self.bot.send_message(chat_id, text).await?;
        tracing::debug!(" => [{}] {}", chat_id, text);
        self.log_outgoing(chat_id, text).await;
        Ok(message_id)
    }

    /// Send a message with an inline keyboard
    pub async fn send_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<i64, BotError> {
        let message_id = self.bot.send_with_keyboard(chat_id, text, buttons).await?;
        tracing::debug!(" => [{}] {} (keyboard)", chat_id, text);
        self.log_outgoing(chat_id, text).await;
        Ok(message_id)
    }

    pub async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), BotError> {
        self.bot.answer_callback(callback_id, text).await
    }

    pub async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        text: Option<&str>,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), BotError> {
        self.bot.edit_keyboard(chat_id, message_id, text, buttons).await
    }

    async fn log_outgoing(&self, chat_id: i64, text: &str) {
        let entry = StoredMessage::outgoing(chat_id, text);
        if let Err(e) = self.store.store_message(&entry).await {
            tracing::error!("store message for user [{}] failed: {}", chat_id, e);
        }
    }
}
