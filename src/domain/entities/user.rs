use chrono::{DateTime, Utc};
use std::fmt;

use super::role;
use super::update::Sender;

/// A chat user as known to the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub is_bot: bool,
    pub role: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(telegram_id: i64) -> Self {
        Self {
            id: 0,
            telegram_id,
            first_name: String::new(),
            last_name: String::new(),
            user_name: String::new(),
            is_bot: false,
            role: role::NEW.to_string(),
            created_at: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.user_name = username.into();
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Compact name: `@user First Last`, falling back to the telegram id
    pub fn short(&self) -> String {
        let parts: Vec<String> = [
            (!self.user_name.is_empty()).then(|| format!("@{}", self.user_name)),
            (!self.first_name.is_empty()).then(|| self.first_name.clone()),
            (!self.last_name.is_empty()).then(|| self.last_name.clone()),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            format!("[{}]", self.telegram_id)
        } else {
            parts.join(" ")
        }
    }

    /// Multi-line profile card
    pub fn paragraph(&self) -> String {
        let mut out = String::new();
        let full_name = format!("{} {}", self.first_name, self.last_name);
        if !full_name.trim().is_empty() {
            out.push_str(full_name.trim());
            out.push('\n');
        }
        if !self.user_name.is_empty() {
            out.push_str(&format!("@{}\n", self.user_name));
        }
        out.push_str(&format!("id: {}\n", self.telegram_id));
        out.push_str(&format!("Role: {}\n", self.role));
        out
    }
}

impl From<&Sender> for User {
    fn from(sender: &Sender) -> Self {
        let mut user = User::new(sender.id)
            .with_name(sender.first_name.clone(), sender.last_name.clone())
            .with_username(sender.username.clone());
        user.is_bot = sender.is_bot;
        user
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({})", self.short(), self.telegram_id, self.role)
    }
}
