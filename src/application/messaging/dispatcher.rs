//! Update dispatcher - routes each update to at most one command callback

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::context::CommandContext;
use super::parser::CommandParser;
use crate::application::services::PluginService;
use crate::domain::entities::{
    Access, ChatKind, Groupchat, StoredMessage, Update, UpdateKind, User,
};
use crate::domain::traits::UserStatus;

/// How a single update ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No command, or the command came from a non-private chat
    Ignored,
    /// User could not be resolved; the update was dropped
    Dropped,
    /// Sender is blocked or deleted
    Rejected { telegram_id: i64, role: String },
    /// No command with this name is registered
    UnknownCommand(String),
    /// Command exists but the sender's role is not whitelisted
    Forbidden { command: String, role: String },
    Handled { command: String },
    Failed { command: String, error: String },
    TimedOut { command: String },
}

/// Dispatcher settings
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Reply `unknown command ...` for unregistered names
    pub notify_unknown: bool,
    /// Spawn one task per update instead of processing in order
    pub concurrent: bool,
    pub handler_timeout: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            notify_unknown: true,
            concurrent: false,
            handler_timeout: None,
        }
    }
}

/// Routes updates through user resolution and the authorization gate
pub struct Dispatcher {
    service: Arc<PluginService>,
    parser: CommandParser,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(service: Arc<PluginService>) -> Self {
        Self {
            service,
            parser: CommandParser::new(),
            options: DispatchOptions::default(),
        }
    }

    pub fn with_parser(mut self, parser: CommandParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn service(&self) -> &Arc<PluginService> {
        &self.service
    }

    /// Consume the update stream until the sender side closes.
    ///
    /// In concurrent mode every in-flight update is awaited before this
    /// returns.
    pub async fn run(self: Arc<Self>, mut updates: mpsc::UnboundedReceiver<Update>) {
        tracing::info!(
            "Dispatcher running ({})",
            if self.options.concurrent { "concurrent" } else { "sequential" }
        );

        let mut tasks = JoinSet::new();
        while let Some(update) = updates.recv().await {
            if self.options.concurrent {
                let this = Arc::clone(&self);
                tasks.spawn(async move {
                    this.dispatch(update).await;
                });
                while let Some(finished) = tasks.try_join_next() {
                    log_join_error(finished);
                }
            } else {
                self.dispatch(update).await;
            }
        }

        tracing::info!("Update stream closed, waiting for {} update(s)", tasks.len());
        while let Some(finished) = tasks.join_next().await {
            log_join_error(finished);
        }
    }

    /// Process one update to completion
    pub async fn dispatch(&self, update: Update) -> DispatchOutcome {
        let user = match self.resolve_user(&update).await {
            Ok(user) => user,
            Err(outcome) => return outcome,
        };

        self.log_incoming(&update).await;
        self.record_groupchat(&update).await;

        if !update.is_routable() {
            return DispatchOutcome::Ignored;
        }
        let Some(parsed) = self.parser.parse(&update) else {
            self.answer_unhandled(&update).await;
            return DispatchOutcome::Ignored;
        };

        let callback = match self.service.commands().resolve(&parsed.name, &user.role) {
            Access::Allowed(callback) => callback,
            Access::Forbidden => {
                tracing::debug!("/{} not allowed for {}", parsed.name, user);
                self.answer_unhandled(&update).await;
                return DispatchOutcome::Forbidden {
                    command: parsed.name,
                    role: user.role,
                };
            }
            Access::Unknown => {
                tracing::warn!("Unknown command /{} from {}", parsed.name, user);
                self.answer_unhandled(&update).await;
                if self.options.notify_unknown {
                    let notice = format!("unknown command {}, use /help", parsed.name);
                    if let Err(e) = self.service.messages().send(user.telegram_id, &notice).await {
                        tracing::error!("Failed to send notice to {}: {}", user.telegram_id, e);
                    }
                }
                return DispatchOutcome::UnknownCommand(parsed.name);
            }
        };

        let command = parsed.name.clone();
        let ctx = CommandContext {
            service: Arc::clone(&self.service),
            update,
            command: parsed.name,
            args: parsed.args,
            user,
        };

        let pending = callback(ctx);
        let result = match self.options.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!("/{} timed out after {:?}", command, limit);
                    return DispatchOutcome::TimedOut { command };
                }
            },
            None => pending.await,
        };

        match result {
            Ok(()) => DispatchOutcome::Handled { command },
            Err(e) => {
                tracing::error!("/{} failed: {}", command, e);
                DispatchOutcome::Failed {
                    command,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn resolve_user(&self, update: &Update) -> Result<User, DispatchOutcome> {
        let candidate = User::from(update.sender());

        match self.service.store().create_user_if_absent(&candidate).await {
            Ok(status) if status.is_locked_out() => {
                let user = status.into_user();
                tracing::debug!("Ignoring update from {}", user);
                Err(DispatchOutcome::Rejected {
                    telegram_id: user.telegram_id,
                    role: user.role,
                })
            }
            Ok(UserStatus::Created(user)) => {
                tracing::info!("New user {}", user);
                Ok(user)
            }
            Ok(status) => Ok(status.into_user()),
            Err(e) => {
                tracing::error!("Failed to resolve user {}: {}", candidate.telegram_id, e);
                Err(DispatchOutcome::Dropped)
            }
        }
    }

    async fn log_incoming(&self, update: &Update) {
        match &update.kind {
            UpdateKind::Message(message) => {
                let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) else {
                    return;
                };
                tracing::debug!(" <= {} [{}] {}", message.from.username, message.from.id, text);

                let entry = StoredMessage::incoming(message, text);
                if let Err(e) = self.service.store().store_message(&entry).await {
                    tracing::error!(
                        "store message from user @{} [{}] failed: {}",
                        message.from.username,
                        message.from.id,
                        e
                    );
                }
            }
            UpdateKind::Callback(query) => {
                tracing::debug!(" <= {} [{}] {}", query.from.username, query.from.id, query.data);
            }
        }
    }

    /// Remember supergroups the bot sees, keeping their title current
    async fn record_groupchat(&self, update: &Update) {
        let Some(message) = update.message() else {
            return;
        };
        if message.chat.kind != ChatKind::Supergroup {
            return;
        }

        let title = message.chat.title.as_deref().unwrap_or_default();
        let store = self.service.store();
        match store
            .create_groupchat_if_absent(&Groupchat::new(message.chat.id, title))
            .await
        {
            Ok((chat, true)) => tracing::info!("New groupchat {}", chat),
            Ok((chat, false)) if chat.title != title => {
                if let Err(e) = store.update_groupchat_title(chat.telegram_id, title).await {
                    tracing::error!("Failed to retitle groupchat {}: {}", chat.telegram_id, e);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Failed to record groupchat {}: {}", message.chat.id, e),
        }
    }

    /// Clear the client's pending state for a button press no callback took
    async fn answer_unhandled(&self, update: &Update) {
        let Some(query) = update.callback_query() else {
            return;
        };
        if let Err(e) = self.service.messages().answer_callback(&query.id, None).await {
            tracing::error!("Failed to answer callback {}: {}", query.id, e);
        }
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!("Update task failed: {}", e);
    }
}
