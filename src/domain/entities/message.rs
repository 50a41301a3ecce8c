use chrono::{DateTime, Utc};

use super::update::IncomingMessage;

/// Entry in the message log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub telegram_id: i64,
    pub text: String,
    pub is_incoming: bool,
    pub date: DateTime<Utc>,
}

impl StoredMessage {
    pub fn incoming(message: &IncomingMessage, text: impl Into<String>) -> Self {
        Self {
            telegram_id: message.from.id,
            text: text.into(),
            is_incoming: true,
            date: message.date,
        }
    }

    pub fn outgoing(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            telegram_id: chat_id,
            text: text.into(),
            is_incoming: false,
            date: Utc::now(),
        }
    }
}
