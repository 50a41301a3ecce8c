//! Shared fixtures for plugin tests

use std::sync::Arc;
use tokio::sync::mpsc;

use super::Plugin;
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;
use crate::application::services::PluginService;
use crate::domain::entities::{Access, Sender, Update, User};
use crate::domain::traits::Store;
use crate::infrastructure::adapters::{ConsoleAdapter, Outgoing};
use crate::infrastructure::storage::MemoryStore;

pub struct Harness {
    pub service: Arc<PluginService>,
    pub store: Arc<MemoryStore>,
    output: mpsc::UnboundedReceiver<Outgoing>,
}

impl Harness {
    pub async fn with_plugins(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let (adapter, output) = ConsoleAdapter::recording();
        let service = Arc::new(PluginService::new(store.clone(), Arc::new(adapter)));
        service.bootstrap(plugins).await;

        Self {
            service,
            store,
            output,
        }
    }

    pub async fn add_user(&self, telegram_id: i64, role: &str) {
        self.store
            .create_user_if_absent(&User::new(telegram_id).with_role(role))
            .await
            .unwrap();
    }

    fn build(&self, update: Update, role: &str, command: &str, args: &str) -> CommandContext {
        let user = User::from(update.sender()).with_role(role);
        CommandContext {
            service: Arc::clone(&self.service),
            update,
            command: command.to_string(),
            args: args.to_string(),
            user,
        }
    }

    /// Context for a typed command
    pub fn context(&self, telegram_id: i64, role: &str, command: &str, args: &str) -> CommandContext {
        let text = format!("/{} {}", command, args);
        self.build(Update::text(1, Sender::new(telegram_id), text), role, command, args)
    }

    /// Context for a button press carrying the command
    pub fn callback_context(
        &self,
        telegram_id: i64,
        role: &str,
        command: &str,
        args: &str,
    ) -> CommandContext {
        let data = format!("/{} {}", command, args);
        self.build(Update::callback(1, Sender::new(telegram_id), data), role, command, args)
    }

    pub async fn try_run(&self, ctx: CommandContext) -> Result<(), CommandError> {
        match self.service.commands().resolve(&ctx.command, &ctx.user.role) {
            Access::Allowed(callback) => callback(ctx).await,
            _ => panic!("/{} not runnable as {}", ctx.command, ctx.user.role),
        }
    }

    pub async fn run(&self, ctx: CommandContext) {
        self.try_run(ctx).await.unwrap();
    }

    /// Drain everything emitted so far
    pub fn outputs(&mut self) -> Vec<Outgoing> {
        let mut out = Vec::new();
        while let Ok(event) = self.output.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn texts(&mut self) -> Vec<String> {
        self.outputs()
            .iter()
            .filter_map(|o| o.text().map(str::to_string))
            .collect()
    }
}
