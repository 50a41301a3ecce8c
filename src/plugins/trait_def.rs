//! Plugin trait definitions

use async_trait::async_trait;

use crate::application::services::PluginService;
use crate::domain::entities::{Command, PluginState};

/// Core plugin trait that all plugins must implement.
///
/// `on_start` registers the plugin's commands, `on_stop` removes them.
/// Both have default implementations driven by [`Plugin::commands`], gated
/// by the persisted enablement flag.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable registry key, e.g. `echo.Plugin`
    fn id(&self) -> &str;

    /// Commands this plugin owns
    fn commands(&self) -> Vec<Command>;

    /// State recorded the first time the plugin is seen
    fn default_state(&self) -> PluginState {
        PluginState::Enabled
    }

    async fn on_start(&self, service: &PluginService) {
        if !service
            .check_if_plugin_disabled(self.id(), self.default_state())
            .await
        {
            return;
        }

        for command in self.commands() {
            service.register_command(command);
        }
        tracing::debug!("[{}] Started", self.id());
    }

    async fn on_stop(&self, service: &PluginService) {
        for command in self.commands() {
            service.unregister_command(&command.name);
        }
        tracing::debug!("[{}] Stopped", self.id());
    }
}
