pub const ACTIVE: &str = "active";
pub const DELETED: &str = "deleted";

/// A named group of users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub state: String,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            state: ACTIVE.to_string(),
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.state == ACTIVE {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.state)
        }
    }
}

/// A Telegram group chat the bot has seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groupchat {
    pub id: i64,
    pub telegram_id: i64,
    pub title: String,
    pub state: String,
    pub invite_link: String,
}

impl Groupchat {
    pub fn new(telegram_id: i64, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            telegram_id,
            title: title.into(),
            state: ACTIVE.to_string(),
            invite_link: String::new(),
        }
    }
}

impl std::fmt::Display for Groupchat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.title, self.telegram_id)?;
        if !self.invite_link.is_empty() {
            write!(f, " {}", self.invite_link)?;
        }
        Ok(())
    }
}
