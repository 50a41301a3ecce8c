//! User management commands

use async_trait::async_trait;

use super::Plugin;
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;
use crate::domain::entities::{callback, role, Command, User};
use crate::domain::traits::KeyboardButton;

const PROMOTE_USAGE: &str =
    "failed: you must provide TelegramID and new role with a new line between them";
const MISSING_ID: &str = "please provide user telegram ID";

pub struct UsersPlugin;

#[async_trait]
impl Plugin for UsersPlugin {
    fn id(&self) -> &str {
        "users.Plugin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("userlist", "User list", role::MEMBERS, callback(user_list)),
            Command::new("user", "User actions", role::STAFF, callback(user_actions)),
            Command::new("userpromote", "Change user role", role::STAFF, callback(user_promote)),
            Command::new("userblock", "Block user", role::STAFF, callback(user_block_unblock)),
            Command::new("userunblock", "Unblock user", role::STAFF, callback(user_block_unblock)),
            Command::new("userdelete", "Delete user", role::STAFF, callback(user_delete_undelete)),
            Command::new("userundelete", "Undelete user", role::STAFF, callback(user_delete_undelete)),
        ]
    }
}

fn parse_telegram_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id != 0)
}

fn button(text: &str, data: String) -> Vec<KeyboardButton> {
    vec![KeyboardButton::new(text).with_callback(data)]
}

/// Actions available for a user in their current role
fn actions_keyboard(user: &User) -> Vec<Vec<KeyboardButton>> {
    let id = user.telegram_id;
    let block = || button("block user", format!("/userblock {}", id));
    let delete = || button("delete user", format!("/userdelete {}", id));
    let promote = |label: &str, to: &str| button(label, format!("/userpromote {}\n{}", id, to));

    match user.role.as_str() {
        role::DELETED => vec![button("undelete user", format!("/userundelete {}", id))],
        role::BLOCKED => vec![button("unblock user", format!("/userunblock {}", id))],
        role::NEW => vec![
            block(),
            delete(),
            promote("make member", role::MEMBER),
            promote("make admin", role::ADMIN),
        ],
        role::MEMBER => vec![block(), delete(), promote("make admin", role::ADMIN)],
        role::ADMIN => vec![block(), delete(), promote("make member", role::MEMBER)],
        _ => vec![button("user actions", format!("/user {}", id))],
    }
}

async fn user_list(ctx: CommandContext) -> Result<(), CommandError> {
    let roles: Vec<String> = ctx.args.split_whitespace().map(str::to_string).collect();
    let users = ctx.store().list_users(&roles).await?;
    if users.is_empty() {
        return ctx.reply("user list is empty").await;
    }

    let keyboard = users
        .iter()
        .map(|u| button(&u.to_string(), format!("/user {}", u.telegram_id)))
        .collect();
    ctx.show_keyboard("Choose user", keyboard).await
}

async fn user_actions(ctx: CommandContext) -> Result<(), CommandError> {
    let Some(telegram_id) = parse_telegram_id(&ctx.args) else {
        return ctx.reply("wrong telegramID provided").await;
    };

    match ctx.store().get_user(telegram_id).await? {
        Some(target) => ctx.show_keyboard(&target.paragraph(), actions_keyboard(&target)).await,
        None => ctx.reply(&format!("user {} not found", telegram_id)).await,
    }
}

async fn user_promote(ctx: CommandContext) -> Result<(), CommandError> {
    let params: Vec<&str> = ctx.args.split('\n').map(str::trim).collect();
    let [id, new_role] = params.as_slice() else {
        return ctx.reply(PROMOTE_USAGE).await;
    };
    if !role::is_assignable(new_role) {
        return ctx.reply(PROMOTE_USAGE).await;
    }
    let Some(telegram_id) = parse_telegram_id(id) else {
        return ctx.reply(PROMOTE_USAGE).await;
    };

    let new_role = new_role.to_string();
    apply_role(&ctx, telegram_id, &new_role).await
}

async fn user_block_unblock(ctx: CommandContext) -> Result<(), CommandError> {
    let new_role = if ctx.command == "userblock" {
        role::BLOCKED
    } else {
        role::MEMBER
    };

    match parse_telegram_id(&ctx.args) {
        Some(telegram_id) => apply_role(&ctx, telegram_id, new_role).await,
        None => ctx.reply(MISSING_ID).await,
    }
}

async fn user_delete_undelete(ctx: CommandContext) -> Result<(), CommandError> {
    let new_role = if ctx.command == "userdelete" {
        role::DELETED
    } else {
        role::MEMBER
    };

    match parse_telegram_id(&ctx.args) {
        Some(telegram_id) => apply_role(&ctx, telegram_id, new_role).await,
        None => ctx.reply(MISSING_ID).await,
    }
}

/// Change a role, tell the target, then confirm to the actor
async fn apply_role(ctx: &CommandContext, telegram_id: i64, new_role: &str) -> Result<(), CommandError> {
    let rows = ctx.store().update_user_role(telegram_id, new_role).await?;
    if rows != 1 {
        return ctx.reply("failed").await;
    }
    tracing::info!("{} set role of {} to {}", ctx.user, telegram_id, new_role);

    let notice = format!(
        "you were assigned the role \"{}\", use /help for command list",
        new_role
    );
    if let Err(e) = ctx.service.messages().send(telegram_id, &notice).await {
        tracing::error!("Failed to notify {}: {}", telegram_id, e);
    }

    if ctx.callback_query().is_some() {
        if let Some(target) = ctx.store().get_user(telegram_id).await? {
            return ctx
                .show_keyboard(&target.paragraph(), actions_keyboard(&target))
                .await;
        }
    }
    ctx.reply("success").await
}
