//! Echo plugin - repeats the arguments back

use async_trait::async_trait;

use super::Plugin;
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;
use crate::domain::entities::{callback, role, Command};

pub struct EchoPlugin;

#[async_trait]
impl Plugin for EchoPlugin {
    fn id(&self) -> &str {
        "echo.Plugin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("echo", "Repeat a message", role::EVERYONE, callback(echo))]
    }
}

async fn echo(ctx: CommandContext) -> Result<(), CommandError> {
    let reply = format!("{} {}", ctx.command, ctx.args);
    ctx.reply(reply.trim_end()).await
}
