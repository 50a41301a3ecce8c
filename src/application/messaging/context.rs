//! Context handed to command callbacks

use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::application::services::PluginService;
use crate::domain::entities::{CallbackQuery, Update, User};
use crate::domain::traits::{KeyboardButton, Store};

/// Everything a callback needs for one dispatched update
#[derive(Clone)]
pub struct CommandContext {
    pub service: Arc<PluginService>,
    pub update: Update,
    pub command: String,
    pub args: String,
    pub user: User,
}

impl CommandContext {
    pub fn store(&self) -> &dyn Store {
        self.service.store()
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        self.update.callback_query()
    }

    /// Send a plain message to the acting user
    pub async fn reply(&self, text: &str) -> Result<(), CommandError> {
        self.service.messages().send(self.user.telegram_id, text).await?;
        Ok(())
    }

    pub async fn reply_with_keyboard(
        &self,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), CommandError> {
        self.service
            .messages()
            .send_with_keyboard(self.user.telegram_id, text, buttons)
            .await?;
        Ok(())
    }

    /// Acknowledge the pressed button, if this update came from one
    pub async fn answer(&self, text: Option<&str>) {
        if let Some(query) = self.callback_query() {
            if let Err(e) = self.service.messages().answer_callback(&query.id, text).await {
                tracing::error!("Failed to answer callback {}: {}", query.id, e);
            }
        }
    }

    /// Show a keyboard: edited in place for button presses, sent otherwise
    pub async fn show_keyboard(
        &self,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), CommandError> {
        match self.callback_query().and_then(|q| q.origin) {
            Some((chat_id, message_id)) => {
                self.answer(None).await;
                self.service
                    .messages()
                    .edit_keyboard(chat_id, message_id, Some(text), buttons)
                    .await?;
                Ok(())
            }
            None => self.reply_with_keyboard(text, buttons).await,
        }
    }
}
