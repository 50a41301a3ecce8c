//! Command parser - extracts the command name and argument string from updates

use crate::domain::entities::{Update, UpdateKind};

/// Command name plus the (trimmed) rest of the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: String,
}

impl ParsedCommand {
    fn new(name: &str, args: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            args: args.trim().to_string(),
        })
    }
}

/// Parses incoming updates into commands
#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    bot_username: Option<String>,
}

impl CommandParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept `/cmd@name` mentions addressed to this bot
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    /// Parse whichever shape the update has; `None` when it carries no command
    pub fn parse(&self, update: &Update) -> Option<ParsedCommand> {
        match &update.kind {
            UpdateKind::Callback(query) => Self::parse_callback(&query.data),
            UpdateKind::Message(message) => message.text.as_deref().and_then(|t| self.parse_text(t)),
        }
    }

    /// Button payload: leading slashes stripped, split on the first space
    pub fn parse_callback(data: &str) -> Option<ParsedCommand> {
        let payload = data.trim_start_matches('/');
        match payload.split_once(' ') {
            Some((name, args)) => ParsedCommand::new(name, args),
            None => ParsedCommand::new(payload, ""),
        }
    }

    /// Text message: `/name[@bot] args...`
    pub fn parse_text(&self, text: &str) -> Option<ParsedCommand> {
        let body = text.strip_prefix('/')?;
        let (token, rest) = match body.find(char::is_whitespace) {
            Some(i) => body.split_at(i),
            None => (body, ""),
        };

        let name = match token.split_once('@') {
            Some((name, mention)) => {
                if let Some(own) = &self.bot_username {
                    if !own.eq_ignore_ascii_case(mention) {
                        return None;
                    }
                }
                name
            }
            None => token,
        };

        ParsedCommand::new(name, rest)
    }
}
