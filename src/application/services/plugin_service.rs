//! Plugin service - the registry handle shared by the dispatcher and plugins

use std::sync::Arc;
use tokio::sync::Mutex;

use super::message_service::MessageService;
use crate::domain::entities::{Command, CommandRegistry, PluginState};
use crate::domain::traits::{Bot, Store};
use crate::plugins::registry::Activation;
use crate::plugins::{Plugin, PluginRegistry};

/// Command table, plugin sets and collaborators behind one handle.
///
/// Constructed once by the entry point (or per test) and passed to the
/// dispatcher and to every plugin hook.
pub struct PluginService {
    commands: CommandRegistry,
    plugins: PluginRegistry,
    store: Arc<dyn Store>,
    messages: MessageService,
    // serializes enable/disable so hooks of one transition never interleave
    transitions: Mutex<()>,
}

impl PluginService {
    pub fn new(store: Arc<dyn Store>, bot: Arc<dyn Bot>) -> Self {
        Self {
            commands: CommandRegistry::new(),
            plugins: PluginRegistry::new(),
            messages: MessageService::new(bot, Arc::clone(&store)),
            store,
            transitions: Mutex::new(()),
        }
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn messages(&self) -> &MessageService {
        &self.messages
    }

    pub fn register_command(&self, command: Command) {
        tracing::debug!("Registering command /{}", command.name);
        self.commands.register(command);
    }

    pub fn unregister_command(&self, name: &str) {
        self.commands.unregister(name);
    }

    pub fn is_allowed(&self, command: &str, role: &str) -> bool {
        self.commands.is_allowed(command, role)
    }

    /// Add a plugin to the active set without starting it
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) {
        let id = plugin.id().to_string();
        if self.plugins.register(plugin) {
            tracing::warn!("Plugin {} registered twice, keeping the latest", id);
        }
    }

    /// Register every plugin, then run `on_start` for each registered one.
    ///
    /// Returns once all commands are registered, so the dispatcher can be
    /// started right after.
    pub async fn bootstrap(&self, plugins: Vec<Arc<dyn Plugin>>) {
        let _guard = self.transitions.lock().await;

        for plugin in plugins {
            self.register_plugin(plugin);
        }
        // a duplicate id leaves only the latest registration to start
        for plugin in self.plugins.active() {
            plugin.on_start(self).await;
        }

        tracing::info!(
            "Plugins started: {} active, {} disabled, {} commands",
            self.plugins.active_ids().len(),
            self.plugins.disabled_ids().len(),
            self.commands.len()
        );
    }

    /// Move an active plugin to the disabled set and run its `on_stop`
    pub async fn disable_plugin(&self, id: &str) -> bool {
        let id = id.trim();
        let _guard = self.transitions.lock().await;

        match self.plugins.deactivate(id) {
            Some(plugin) => {
                plugin.on_stop(self).await;
                tracing::debug!("{} removed from running plugins", id);
                true
            }
            None => {
                tracing::debug!("Plugin '{}' does not exist or is not loaded", id);
                false
            }
        }
    }

    /// Move a disabled plugin back to the active set and run its `on_start`
    pub async fn enable_plugin(&self, id: &str) -> bool {
        let id = id.trim();
        let _guard = self.transitions.lock().await;

        match self.plugins.activate(id) {
            Activation::AlreadyActive => true,
            Activation::Activated(plugin) => {
                plugin.on_start(self).await;
                tracing::debug!("{} enabled", id);
                true
            }
            Activation::Unknown => false,
        }
    }

    /// Reconcile a starting plugin with its persisted state.
    ///
    /// Called from inside `on_start`. Creates the record with
    /// `default_state` when absent. When the stored state is disabled the
    /// plugin is moved to the disabled set without running `on_stop`, and
    /// false is returned so the caller skips registering its commands.
    pub async fn check_if_plugin_disabled(&self, id: &str, default_state: PluginState) -> bool {
        let id = id.trim();
        let state = match self.store.get_or_create_plugin_state(id, default_state).await {
            Ok(record) => record.state,
            Err(e) => {
                tracing::error!("Plugin state lookup for {} failed: {}, using {}", id, e, default_state);
                default_state
            }
        };

        if state.is_enabled() {
            return true;
        }

        if self.plugins.deactivate(id).is_some() {
            tracing::debug!("[{}] Disabled by stored state", id);
        }
        false
    }
}
