//! Plugin administration commands

use async_trait::async_trait;

use super::Plugin;
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;
use crate::domain::entities::{callback, role, Command, PluginState};

pub const ADMIN_PLUGIN_ID: &str = "admin.Plugin";

pub struct AdminPlugin;

#[async_trait]
impl Plugin for AdminPlugin {
    fn id(&self) -> &str {
        ADMIN_PLUGIN_ID
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("pluginlist", "List plugins", role::STAFF, callback(plugin_list)),
            Command::new("pluginenable", "Enable plugin", role::STAFF, callback(plugin_enable)),
            Command::new("plugindisable", "Disable plugin", role::STAFF, callback(plugin_disable)),
        ]
    }
}

async fn plugin_listing(ctx: &CommandContext) -> String {
    let plugins = ctx.service.plugins();
    let loaded: String = plugins
        .active_ids()
        .iter()
        .map(|id| format!("\t{}\n", id))
        .collect();
    let unloaded: String = plugins
        .disabled_ids()
        .iter()
        .map(|id| format!("\t{}\n", id))
        .collect();

    let stored: String = match ctx.store().list_plugin_states().await {
        Ok(records) => records.iter().map(|r| format!("\t{}\n", r)).collect(),
        Err(e) => {
            tracing::warn!("Failed to list stored plugin states: {}", e);
            String::new()
        }
    };

    format!(
        "Enabled plugins:\n{}\nDisabled plugins:\n{}\nStored states:\n{}",
        loaded, unloaded, stored
    )
}

async fn plugin_list(ctx: CommandContext) -> Result<(), CommandError> {
    ctx.reply(&plugin_listing(&ctx).await).await
}

async fn plugin_enable(ctx: CommandContext) -> Result<(), CommandError> {
    let id = ctx.args.trim();
    let plugins = ctx.service.plugins();
    if !plugins.is_active(id) && !plugins.is_disabled(id) {
        return ctx.reply(&plugin_listing(&ctx).await).await;
    }

    // on_start consults the stored state, so it has to flip first
    if let Err(e) = ctx.store().update_plugin_state(id, PluginState::Enabled).await {
        return ctx.reply(&format!("failed: {}", e)).await;
    }

    if ctx.service.enable_plugin(id).await {
        tracing::info!("{} enabled by {}", id, ctx.user);
        ctx.reply(&format!("{} enabled", id)).await
    } else {
        ctx.reply(&plugin_listing(&ctx).await).await
    }
}

async fn plugin_disable(ctx: CommandContext) -> Result<(), CommandError> {
    let id = ctx.args.trim();
    if id == ADMIN_PLUGIN_ID {
        return ctx
            .reply(&format!("failed: {} can't be disabled", ADMIN_PLUGIN_ID))
            .await;
    }

    if !ctx.service.disable_plugin(id).await {
        return ctx.reply(&plugin_listing(&ctx).await).await;
    }
    tracing::info!("{} disabled by {}", id, ctx.user);

    if let Err(e) = ctx.store().update_plugin_state(id, PluginState::Disabled).await {
        return ctx.reply(&format!("failed: {}", e)).await;
    }
    ctx.reply(&format!("{} disabled", id)).await
}
