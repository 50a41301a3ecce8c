//! Group chats the bot has been added to

use async_trait::async_trait;

use super::Plugin;
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;
use crate::domain::entities::{callback, role, Command};

pub struct GroupchatsPlugin;

#[async_trait]
impl Plugin for GroupchatsPlugin {
    fn id(&self) -> &str {
        "groupchats.Plugin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new(
            "groupchatlist",
            "Groupchat list",
            role::MEMBERS,
            callback(groupchat_list),
        )]
    }
}

async fn groupchat_list(ctx: CommandContext) -> Result<(), CommandError> {
    let states: Vec<String> = ctx.args.split_whitespace().map(str::to_string).collect();
    let chats = ctx.store().list_groupchats(&states).await?;
    if chats.is_empty() {
        return ctx.reply("groupchat list is empty").await;
    }

    let lines: Vec<String> = chats.iter().map(|c| format!("• {}", c)).collect();
    ctx.reply(&lines.join("\n")).await
}
