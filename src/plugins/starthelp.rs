//! Greeting and command help

use async_trait::async_trait;

use super::Plugin;
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;
use crate::domain::entities::{callback, role, Command};

pub struct StartHelpPlugin;

#[async_trait]
impl Plugin for StartHelpPlugin {
    fn id(&self) -> &str {
        "starthelp.Plugin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("start", "Say hello", role::EVERYONE, callback(start)),
            Command::new("help", "Display this help", role::EVERYONE, callback(help)),
        ]
    }
}

async fn start(ctx: CommandContext) -> Result<(), CommandError> {
    ctx.reply("Hello! Send /help").await
}

async fn help(ctx: CommandContext) -> Result<(), CommandError> {
    let lines: String = ctx
        .service
        .commands()
        .list_for_role(&ctx.user.role)
        .into_iter()
        .map(|(name, description)| format!("/{} - {}\n", name, description))
        .collect();

    ctx.reply(&format!("Those are my commands: \n{}", lines)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::testing::Harness;
    use crate::plugins::users::UsersPlugin;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_help_lists_only_allowed_commands() {
        let mut h = Harness::with_plugins(vec![Arc::new(StartHelpPlugin), Arc::new(UsersPlugin)]).await;

        h.run(h.context(1, role::NEW, "help", "")).await;
        let text = h.texts().remove(0);
        assert!(text.starts_with("Those are my commands: \n/help - "));
        assert!(text.contains("/start - "));
        assert!(!text.contains("/userlist"));

        h.run(h.context(1, role::MEMBER, "help", "")).await;
        assert!(h.texts()[0].contains("/userlist - User list"));
    }
}
