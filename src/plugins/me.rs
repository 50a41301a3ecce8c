//! Profile plugin

use async_trait::async_trait;

use super::Plugin;
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;
use crate::domain::entities::{callback, role, Command};

pub struct MePlugin;

#[async_trait]
impl Plugin for MePlugin {
    fn id(&self) -> &str {
        "me.Plugin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("me", "Show your profile", role::EVERYONE, callback(me))]
    }
}

async fn me(ctx: CommandContext) -> Result<(), CommandError> {
    ctx.reply(&ctx.user.paragraph()).await
}
