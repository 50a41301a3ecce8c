//! Inbound events delivered by a chat transport

use chrono::{DateTime, Utc};

/// Who sent an update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_bot: bool,
}

impl Sender {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

/// Kind of chat a message was posted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
    /// Missing or unrecognized chat type
    Other,
}

impl ChatKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "private" => ChatKind::Private,
            "group" => ChatKind::Group,
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            _ => ChatKind::Other,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
            ChatKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    pub kind: ChatKind,
    pub title: Option<String>,
}

/// A text (or other) message
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Sender,
    pub text: Option<String>,
    pub date: DateTime<Utc>,
}

/// An inline button press
#[derive(Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub from: Sender,
    pub data: String,
    /// Chat and message carrying the pressed keyboard
    pub origin: Option<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub enum UpdateKind {
    Message(IncomingMessage),
    Callback(CallbackQuery),
}

/// One inbound event
#[derive(Debug, Clone)]
pub struct Update {
    pub id: i64,
    pub kind: UpdateKind,
}

impl Update {
    /// Private text message, the shape most commands arrive in
    pub fn text(id: i64, from: Sender, text: impl Into<String>) -> Self {
        let chat = Chat {
            id: from.id,
            kind: ChatKind::Private,
            title: None,
        };
        Self {
            id,
            kind: UpdateKind::Message(IncomingMessage {
                message_id: id,
                chat,
                from,
                text: Some(text.into()),
                date: Utc::now(),
            }),
        }
    }

    /// Button press with an opaque payload
    pub fn callback(id: i64, from: Sender, data: impl Into<String>) -> Self {
        Self {
            id,
            kind: UpdateKind::Callback(CallbackQuery {
                id: id.to_string(),
                origin: Some((from.id, id)),
                from,
                data: data.into(),
            }),
        }
    }

    pub fn sender(&self) -> &Sender {
        match &self.kind {
            UpdateKind::Message(m) => &m.from,
            UpdateKind::Callback(c) => &c.from,
        }
    }

    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        match &self.kind {
            UpdateKind::Callback(c) => Some(c),
            UpdateKind::Message(_) => None,
        }
    }

    pub fn message(&self) -> Option<&IncomingMessage> {
        match &self.kind {
            UpdateKind::Message(m) => Some(m),
            UpdateKind::Callback(_) => None,
        }
    }

    /// Commands are only routed from private chats and button presses
    pub fn is_routable(&self) -> bool {
        match &self.kind {
            UpdateKind::Message(m) => m.chat.kind == ChatKind::Private,
            UpdateKind::Callback(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("private", ChatKind::Private)]
    #[case("group", ChatKind::Group)]
    #[case("supergroup", ChatKind::Supergroup)]
    #[case("channel", ChatKind::Channel)]
    #[case("", ChatKind::Other)]
    #[case("Private", ChatKind::Other)]
    fn test_chat_kind_parse(#[case] raw: &str, #[case] expected: ChatKind) {
        assert_eq!(ChatKind::parse(raw), expected);
    }

    #[test]
    fn test_only_private_messages_are_routable() {
        let mut update = Update::text(1, Sender::new(5), "/echo hi");
        assert!(update.is_routable());

        if let UpdateKind::Message(message) = &mut update.kind {
            message.chat.kind = ChatKind::Other;
        }
        assert!(!update.is_routable());
        assert!(Update::callback(2, Sender::new(5), "/echo").is_routable());
    }
}
