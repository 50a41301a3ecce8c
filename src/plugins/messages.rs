//! Direct and broadcast messages from staff

use async_trait::async_trait;

use super::Plugin;
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;
use crate::domain::entities::{callback, role, Command};

const MESSAGE_USAGE: &str =
    "failed: you must provide user id and message with a new line between them";

pub struct MessagesPlugin;

#[async_trait]
impl Plugin for MessagesPlugin {
    fn id(&self) -> &str {
        "messages.Plugin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("broadcast", "Message every user", role::STAFF, callback(broadcast)),
            Command::new("message", "Message one user", role::STAFF, callback(message)),
        ]
    }
}

async fn broadcast(ctx: CommandContext) -> Result<(), CommandError> {
    let text = ctx.args.trim();
    if text.is_empty() {
        return ctx.reply("failed: empty message").await;
    }

    let users = ctx.store().list_users(&[]).await?;
    if users.is_empty() {
        return ctx.reply("nobody to broadcast to").await;
    }

    let mut report = Vec::with_capacity(users.len());
    for user in &users {
        match ctx.service.messages().send(user.telegram_id, text).await {
            Ok(_) => report.push(format!("* {} - success", user)),
            Err(e) => {
                tracing::warn!("Broadcast to {} failed: {}", user, e);
                report.push(format!("* {} - failed: {}", user, e));
            }
        }
    }

    ctx.reply(&report.join("\n")).await
}

async fn message(ctx: CommandContext) -> Result<(), CommandError> {
    let Some((id, text)) = ctx.args.split_once('\n') else {
        return ctx.reply(MESSAGE_USAGE).await;
    };
    let (id, text) = (id.trim(), text.trim());
    if text.is_empty() {
        return ctx.reply(MESSAGE_USAGE).await;
    }
    let Ok(telegram_id) = id.parse::<i64>() else {
        return ctx.reply(MESSAGE_USAGE).await;
    };

    match ctx.service.messages().send(telegram_id, text).await {
        Ok(_) => ctx.reply("message sent").await,
        Err(e) => ctx.reply(&format!("failed: {}", e)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::Outgoing;
    use crate::plugins::testing::Harness;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_broadcast_reaches_listed_users() {
        let mut h = Harness::with_plugins(vec![Arc::new(MessagesPlugin)]).await;
        h.add_user(7, role::MEMBER).await;
        h.add_user(8, role::NEW).await;
        h.add_user(9, role::BLOCKED).await;

        h.run(h.context(1, role::ADMIN, "broadcast", "meeting at 5")).await;

        let recipients: Vec<i64> = h
            .outputs()
            .iter()
            .filter_map(|o| match o {
                Outgoing::Message { chat_id, text, .. } if text == "meeting at 5" => Some(*chat_id),
                _ => None,
            })
            .collect();
        assert_eq!(recipients, vec![7, 8]);
    }

    #[tokio::test]
    async fn test_direct_message() {
        let mut h = Harness::with_plugins(vec![Arc::new(MessagesPlugin)]).await;

        h.run(h.context(1, role::OWNER, "message", "7\nhello")).await;
        let sent = h.outputs();
        assert!(matches!(&sent[0], Outgoing::Message { chat_id: 7, text, .. } if text == "hello"));
        assert_eq!(sent[1].text(), Some("message sent"));

        h.run(h.context(1, role::OWNER, "message", "hello")).await;
        assert_eq!(h.texts(), vec![MESSAGE_USAGE]);
    }
}
