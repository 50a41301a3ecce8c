//! Console adapter for development/testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::domain::entities::{Sender, Update};
use crate::domain::traits::{Bot, BotInfo, KeyboardButton};

/// Prefix marking a console line as a button press
const CALLBACK_PREFIX: &str = "cb:";

/// Something the bot emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Message {
        chat_id: i64,
        text: String,
        buttons: Vec<Vec<KeyboardButton>>,
    },
    CallbackAnswer {
        callback_id: String,
        text: Option<String>,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: Option<String>,
        buttons: Vec<Vec<KeyboardButton>>,
    },
}

impl Outgoing {
    /// Text of a sent or edited message
    pub fn text(&self) -> Option<&str> {
        match self {
            Outgoing::Message { text, .. } => Some(text),
            Outgoing::Edit { text, .. } => text.as_deref(),
            Outgoing::CallbackAnswer { .. } => None,
        }
    }
}

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    sender: Option<mpsc::UnboundedSender<Outgoing>>,
    next_message_id: AtomicI64,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "crewbot".to_string(),
                username: "console".to_string(),
            },
            sender: None,
            next_message_id: AtomicI64::new(1),
        }
    }

    /// Send everything the bot emits to `sender` instead of stdout
    pub fn with_sender(mut self, sender: mpsc::UnboundedSender<Outgoing>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Adapter plus the receiving end of its output
    pub fn recording() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new().with_sender(tx), rx)
    }

    fn emit(&self, event: Outgoing) {
        match &self.sender {
            Some(sender) => {
                if sender.send(event).is_err() {
                    tracing::debug!("Console output receiver dropped");
                }
            }
            None => print_event(&event),
        }
    }

    /// Turn stdin lines into updates from `user` until EOF
    ///
    /// Lines starting with `cb:` are delivered as button presses.
    pub async fn read_updates(user: Sender, updates: mpsc::UnboundedSender<Update>) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut id = 0;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {}", e);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            id += 1;
            let update = match line.strip_prefix(CALLBACK_PREFIX) {
                Some(data) => Update::callback(id, user.clone(), data.trim()),
                None => Update::text(id, user.clone(), line),
            };
            if updates.send(update).is_err() {
                break;
            }
        }

        tracing::info!("Console input closed");
    }
}

fn print_event(event: &Outgoing) {
    match event {
        Outgoing::Message { chat_id, text, buttons } => {
            println!("[BOT -> {}] {}", chat_id, text);
            print_buttons(buttons);
        }
        Outgoing::Edit { message_id, text, buttons, .. } => {
            println!("[BOT edit #{}] {}", message_id, text.as_deref().unwrap_or(""));
            print_buttons(buttons);
        }
        Outgoing::CallbackAnswer { text: Some(text), .. } => println!("[BOT] ({})", text),
        Outgoing::CallbackAnswer { text: None, .. } => {}
    }
}

fn print_buttons(buttons: &[Vec<KeyboardButton>]) {
    for row in buttons {
        let row_text: Vec<String> = row
            .iter()
            .map(|b| match &b.callback_data {
                Some(data) => format!("{} ({}{})", b.text, CALLBACK_PREFIX, data),
                None => b.text.clone(),
            })
            .collect();
        println!("  [Buttons] {}", row_text.join(" | "));
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, BotError> {
        self.send_with_keyboard(chat_id, text, Vec::new()).await
    }

    async fn send_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<i64, BotError> {
        self.emit(Outgoing::Message {
            chat_id,
            text: text.to_string(),
            buttons,
        });
        Ok(self.next_message_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), BotError> {
        self.emit(Outgoing::CallbackAnswer {
            callback_id: callback_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        chat_id: i64,
        message_id: i64,
        text: Option<&str>,
        buttons: Vec<Vec<KeyboardButton>>,
    ) -> Result<(), BotError> {
        self.emit(Outgoing::Edit {
            chat_id,
            message_id,
            text: text.map(str::to_string),
            buttons,
        });
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
