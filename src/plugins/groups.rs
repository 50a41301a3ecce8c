//! Named user groups

use async_trait::async_trait;

use super::Plugin;
use crate::application::errors::{CommandError, StorageError};
use crate::application::messaging::CommandContext;
use crate::domain::entities::{callback, group, role, Command};

const RENAME_USAGE: &str =
    "failed: you must provide the names of the two groups with a new line between them";
const USER_USAGE: &str =
    "failed: you must provide two lines (group name and user id) with a new line between them";
const GROUPCHAT_USAGE: &str =
    "failed: you must provide two lines (group name and groupchat id) with a new line between them";

pub struct GroupsPlugin;

#[async_trait]
impl Plugin for GroupsPlugin {
    fn id(&self) -> &str {
        "groups.Plugin"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("grouplist", "Group list", role::MEMBERS, callback(group_list)),
            Command::new("groupcreate", "Create group", role::STAFF, callback(group_create)),
            Command::new("grouprename", "Rename group", role::STAFF, callback(group_rename)),
            Command::new("groupdelete", "Delete group", role::STAFF, callback(group_delete_undelete)),
            Command::new("groupundelete", "Undelete group", role::STAFF, callback(group_delete_undelete)),
            Command::new("groupaddgroupchat", "Add groupchat to group", role::STAFF, callback(group_groupchat)),
            Command::new("groupdeletegroupchat", "Delete groupchat from group", role::STAFF, callback(group_groupchat)),
            Command::new("groupadduser", "Add user to group", role::STAFF, callback(group_user)),
            Command::new("groupdeleteuser", "Delete user from group", role::STAFF, callback(group_user)),
        ]
    }
}

async fn group_list(ctx: CommandContext) -> Result<(), CommandError> {
    let states: Vec<String> = ctx.args.split_whitespace().map(str::to_string).collect();
    let groups = ctx.store().list_groups(&states).await?;
    if groups.is_empty() {
        return ctx.reply("group list is empty").await;
    }

    let mut lines = Vec::new();
    for group in &groups {
        lines.push(format!("* {}", group));
        for chat in ctx.store().list_group_groupchats(group.id).await? {
            lines.push(format!("    * {}", chat));
        }
    }
    ctx.reply(&lines.join("\n")).await
}

async fn group_create(ctx: CommandContext) -> Result<(), CommandError> {
    let name = ctx.args.trim();
    if name.is_empty() {
        return ctx.reply("failed: empty group name").await;
    }

    let (_, created) = ctx.store().create_group_if_absent(name).await?;
    if created {
        ctx.reply("group created").await
    } else {
        ctx.reply("group already exists").await
    }
}

async fn group_rename(ctx: CommandContext) -> Result<(), CommandError> {
    let names: Vec<&str> = ctx.args.split('\n').map(str::trim).collect();
    let [old_name, new_name] = names.as_slice() else {
        return ctx.reply(RENAME_USAGE).await;
    };
    if old_name.is_empty() || new_name.is_empty() {
        return ctx.reply(RENAME_USAGE).await;
    }

    match ctx.store().rename_group(old_name, new_name).await? {
        1 => ctx.reply("success").await,
        _ => ctx.reply("failed").await,
    }
}

async fn group_delete_undelete(ctx: CommandContext) -> Result<(), CommandError> {
    let name = ctx.args.trim();
    if name.is_empty() {
        return ctx.reply("failed: empty group name").await;
    }
    let state = if ctx.command == "groupdelete" {
        group::DELETED
    } else {
        group::ACTIVE
    };

    match ctx.store().update_group_state(name, state).await? {
        1 => ctx.reply("success").await,
        _ => ctx.reply("failed").await,
    }
}

/// `group name\nid` arguments
fn group_and_id(args: &str) -> Option<(&str, i64)> {
    let (name, id) = args.split_once('\n')?;
    let (name, id) = (name.trim(), id.trim());
    if name.is_empty() || id.contains('\n') {
        return None;
    }
    Some((name, id.parse().ok()?))
}

async fn reply_membership(
    ctx: &CommandContext,
    result: Result<bool, StorageError>,
) -> Result<(), CommandError> {
    match result {
        Ok(true) => ctx.reply("success").await,
        Ok(false) => ctx.reply("failed").await,
        Err(e @ StorageError::NotFound(_)) => ctx.reply(&format!("failed: {}", e)).await,
        Err(e) => Err(e.into()),
    }
}

async fn group_user(ctx: CommandContext) -> Result<(), CommandError> {
    let Some((group, telegram_id)) = group_and_id(&ctx.args) else {
        return ctx.reply(USER_USAGE).await;
    };

    let result = if ctx.command == "groupadduser" {
        ctx.store().add_group_user(group, telegram_id).await
    } else {
        ctx.store().delete_group_user(group, telegram_id).await
    };
    reply_membership(&ctx, result).await
}

async fn group_groupchat(ctx: CommandContext) -> Result<(), CommandError> {
    let Some((group, chat_id)) = group_and_id(&ctx.args) else {
        return ctx.reply(GROUPCHAT_USAGE).await;
    };

    let result = if ctx.command == "groupaddgroupchat" {
        ctx.store().add_group_groupchat(group, chat_id).await
    } else {
        ctx.store().delete_group_groupchat(group, chat_id).await
    };
    reply_membership(&ctx, result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Groupchat;
    use crate::domain::traits::Store;
    use crate::plugins::testing::Harness;
    use rstest::rstest;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_group_lifecycle() {
        let mut h = Harness::with_plugins(vec![Arc::new(GroupsPlugin)]).await;

        h.run(h.context(1, role::ADMIN, "groupcreate", "dev")).await;
        h.run(h.context(1, role::ADMIN, "groupcreate", "dev")).await;
        h.run(h.context(1, role::ADMIN, "grouprename", "dev\nplatform")).await;
        h.run(h.context(1, role::ADMIN, "groupdelete", "platform")).await;
        h.run(h.context(1, role::MEMBER, "grouplist", "")).await;
        h.run(h.context(1, role::MEMBER, "grouplist", "active deleted")).await;

        assert_eq!(
            h.texts(),
            vec![
                "group created",
                "group already exists",
                "success",
                "success",
                "group list is empty",
                "* platform (deleted)",
            ]
        );
    }

    #[tokio::test]
    async fn test_rename_usage() {
        let mut h = Harness::with_plugins(vec![Arc::new(GroupsPlugin)]).await;
        h.run(h.context(1, role::ADMIN, "grouprename", "dev")).await;
        h.run(h.context(1, role::ADMIN, "grouprename", "dev\nops")).await;

        assert_eq!(h.texts(), vec![RENAME_USAGE, "failed"]);
    }

    #[rstest]
    #[case("dev")]
    #[case("dev\nabc")]
    #[case("\n42")]
    #[case("dev\n42\nextra")]
    fn test_group_and_id_rejects_malformed(#[case] args: &str) {
        assert_eq!(group_and_id(args), None);
    }

    #[test]
    fn test_group_and_id_trims() {
        assert_eq!(group_and_id(" dev \n -100 "), Some(("dev", -100)));
    }

    #[tokio::test]
    async fn test_membership_commands() {
        let mut h = Harness::with_plugins(vec![Arc::new(GroupsPlugin)]).await;
        h.add_user(7, role::MEMBER).await;
        h.store
            .create_groupchat_if_absent(&Groupchat::new(-100, "Dev chat"))
            .await
            .unwrap();

        h.run(h.context(1, role::ADMIN, "groupcreate", "dev")).await;
        h.run(h.context(1, role::ADMIN, "groupadduser", "dev\n7")).await;
        h.run(h.context(1, role::ADMIN, "groupadduser", "dev\n8")).await;
        h.run(h.context(1, role::ADMIN, "groupadduser", "dev")).await;
        h.run(h.context(1, role::ADMIN, "groupdeleteuser", "dev\n7")).await;
        h.run(h.context(1, role::ADMIN, "groupdeleteuser", "dev\n7")).await;
        h.run(h.context(1, role::ADMIN, "groupaddgroupchat", "dev\n-100")).await;
        h.run(h.context(1, role::ADMIN, "groupaddgroupchat", "ops\n-100")).await;
        h.run(h.context(1, role::ADMIN, "groupaddgroupchat", "dev\nchat")).await;
        h.run(h.context(1, role::MEMBER, "grouplist", "")).await;
        h.run(h.context(1, role::ADMIN, "groupdeletegroupchat", "dev\n-100")).await;
        h.run(h.context(1, role::MEMBER, "grouplist", "")).await;

        assert_eq!(
            h.texts(),
            vec![
                "group created",
                "success",
                "failed: user not found",
                USER_USAGE,
                "success",
                "failed",
                "success",
                "failed: group not found",
                GROUPCHAT_USAGE,
                "* dev\n    * Dev chat [-100]",
                "success",
                "* dev",
            ]
        );
    }

    #[tokio::test]
    async fn test_membership_is_staff_only() {
        let h = Harness::with_plugins(vec![Arc::new(GroupsPlugin)]).await;
        for command in ["groupadduser", "groupdeleteuser", "groupaddgroupchat", "groupdeletegroupchat"] {
            assert!(h.service.is_allowed(command, role::ADMIN));
            assert!(!h.service.is_allowed(command, role::MEMBER));
        }
    }
}
