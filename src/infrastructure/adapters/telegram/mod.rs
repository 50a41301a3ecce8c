//! Telegram adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::update as domain;
use crate::domain::traits::{Bot, BotInfo, KeyboardButton};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Pause after a failed poll before retrying
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

impl From<User> for domain::Sender {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username.unwrap_or_default(),
            first_name: user.first_name.unwrap_or_default(),
            last_name: user.last_name.unwrap_or_default(),
            is_bot: user.is_bot,
        }
    }
}

impl Update {
    /// Convert to the transport-neutral update; `None` for updates we don't route
    pub fn into_domain(self) -> Option<domain::Update> {
        let kind = if let Some(query) = self.callback_query {
            domain::UpdateKind::Callback(domain::CallbackQuery {
                id: query.id,
                origin: query.message.as_ref().map(|m| (m.chat.id, m.message_id)),
                from: query.from.into(),
                data: query.data.unwrap_or_default(),
            })
        } else {
            let message = self.message?;
            let from = message.from?;
            domain::UpdateKind::Message(domain::IncomingMessage {
                message_id: message.message_id,
                chat: domain::Chat {
                    id: message.chat.id,
                    kind: domain::ChatKind::parse(&message.chat.kind),
                    title: message.chat.title,
                },
                from: from.into(),
                text: message.text,
                date: DateTime::from_timestamp(message.date, 0).unwrap_or_else(Utc::now),
            })
        };

        Some(domain::Update {
            id: self.update_id,
            kind,
        })
    }
}

/// Envelope of every Bot API response
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct MessageResult {
    message_id: i64,
}

#[derive(Serialize)]
struct InlineKeyboardButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<String>,
}

#[derive(Serialize)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    fn from_buttons(buttons: Vec<Vec<KeyboardButton>>) -> Self {
        let inline_keyboard = buttons
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|btn| InlineKeyboardButton {
                        text: btn.text,
                        callback_data: btn.callback_data,
                    })
                    .collect()
            })
            .collect();
        Self { inline_keyboard }
    }
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    client: Client,
    info: BotInfo,
    debug: bool,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            client: Client::new(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "crewbot".to_string(),
                username: "crewbot".to_string(),
            },
            debug: false,
        }
    }

    /// Log raw API traffic at debug level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    async fn call<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp, BotError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.api_url(method))
            .json(request)
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;
        if self.debug {
            tracing::debug!("{} -> {} {}", method, status, body);
        }

        let data: ApiResponse<Resp> =
            serde_json::from_str(&body).map_err(|e| BotError::Parse(e.to_string()))?;
        if !data.ok {
            return Err(BotError::Network(format!(
                "Telegram API error on {}: {}",
                method,
                data.description.unwrap_or_else(|| status.to_string())
            )));
        }
        data.result
            .ok_or_else(|| BotError::Parse(format!("{} returned no result", method)))
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        #[derive(Deserialize)]
        struct Me {
            id: i64,
            first_name: String,
            username: String,
        }

        let me: Me = self.call("getMe", &serde_json::json!({})).await?;
        self.info = BotInfo {
            id: me.id.to_string(),
            name: me.first_name,
            username: me.username,
        };
        Ok(())
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest<'a> {
            offset: i64,
            timeout: u64,
            allowed_updates: &'a [&'a str],
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: &["message", "callback_query"],
        };
        self.call("getUpdates", &request).await
    }

    /// Get the next update offset
    pub fn get_next_offset(updates: &[Update]) -> Option<i64> {
        updates.iter().map(|u| u.update_id + 1).max()
    }

    /// Long-poll Telegram and forward every update until the receiver goes away
    pub async fn run_polling(&self, updates: mpsc::UnboundedSender<domain::Update>, timeout: u64) {
        tracing::info!("Polling Telegram as @{}", self.info.username);
        let mut offset = 0;

        loop {
            let batch = match self.get_updates(offset, timeout).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!("getUpdates failed: {}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            if let Some(next) = Self::get_next_offset(&batch) {
                offset = next;
            }

            for update in batch {
                let id = update.update_id;
                let Some(update) = update.into_domain() else {
                    tracing::debug!("Skipping update {}", id);
                    continue;
                };
                if updates.send(update).is_err() {
                    tracing::info!("Update receiver closed, stopping polling");
                    return;
                }
            }
        }
    }

    /// Publish the command menu shown by Telegram clients
    pub async fn set_commands(&self, commands: &[(String, String)]) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct BotCommand<'a> {
            command: &'a str,
            description: &'a str,
        }

        let commands: Vec<BotCommand<'_>> = commands
            .iter()
            .map(|(command, description)| BotCommand {
                command,
                description,
            })
            .collect();

        let _: bool = self
            .call("setMyCommands", &serde_json::json!({ "commands": commands }))
            .await?;
        tracing::info!("Registered {} bot commands with Telegram", commands.len());
        Ok(())
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: i64,
            text: &'a str,
        }

        let sent: MessageResult = self
            .call("sendMessage", &SendMessageRequest { chat_id, text })
            .await?;
        Ok(sent.message_id)
    }

    async fn send_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<i64, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: i64,
            text: &'a str,
            reply_markup: InlineKeyboardMarkup,
        }

        let request = SendMessageRequest {
            chat_id,
            text,
            reply_markup: InlineKeyboardMarkup::from_buttons(buttons),
        };
        let sent: MessageResult = self.call("sendMessage", &request).await?;
        Ok(sent.message_id)
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct AnswerRequest<'a> {
            callback_query_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            text: Option<&'a str>,
        }

        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerRequest {
                    callback_query_id: callback_id,
                    text,
                },
            )
            .await?;
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        text: Option<&str>,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct EditRequest<'a> {
            chat_id: i64,
            message_id: i64,
            #[serde(skip_serializing_if = "Option::is_none")]
            text: Option<&'a str>,
            reply_markup: InlineKeyboardMarkup,
        }

        let method = if text.is_some() {
            "editMessageText"
        } else {
            "editMessageReplyMarkup"
        };
        let request = EditRequest {
            chat_id,
            message_id,
            text,
            reply_markup: InlineKeyboardMarkup::from_buttons(buttons),
        };

        // Telegram answers with the edited message or `true`
        let _: serde_json::Value = self.call(method, &request).await?;
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
