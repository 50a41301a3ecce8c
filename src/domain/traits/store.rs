use async_trait::async_trait;

use crate::application::errors::StorageError;
use crate::domain::entities::{role, Group, Groupchat, PluginRecord, PluginState, StoredMessage, User};

/// Outcome of `create_user_if_absent`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserStatus {
    Created(User),
    Existing(User),
    Blocked(User),
    Deleted(User),
}

impl UserStatus {
    pub fn user(&self) -> &User {
        match self {
            UserStatus::Created(u)
            | UserStatus::Existing(u)
            | UserStatus::Blocked(u)
            | UserStatus::Deleted(u) => u,
        }
    }

    pub fn into_user(self) -> User {
        match self {
            UserStatus::Created(u)
            | UserStatus::Existing(u)
            | UserStatus::Blocked(u)
            | UserStatus::Deleted(u) => u,
        }
    }

    /// Classify an already stored user by role
    pub fn from_existing(user: User) -> Self {
        match user.role.as_str() {
            role::BLOCKED => UserStatus::Blocked(user),
            role::DELETED => UserStatus::Deleted(user),
            _ => UserStatus::Existing(user),
        }
    }

    pub fn is_locked_out(&self) -> bool {
        matches!(self, UserStatus::Blocked(_) | UserStatus::Deleted(_))
    }
}

/// Roles listed when a caller passes none
pub const DEFAULT_LISTED_ROLES: &[&str] = &[role::OWNER, role::ADMIN, role::MEMBER, role::NEW];

/// Store trait - abstraction for data persistence
#[async_trait]
pub trait Store: Send + Sync {
    // User operations
    async fn get_user(&self, telegram_id: i64) -> Result<Option<User>, StorageError>;
    async fn create_user_if_absent(&self, user: &User) -> Result<UserStatus, StorageError>;
    /// Non-bot users with one of `roles` (defaults when empty), by role then id
    async fn list_users(&self, roles: &[String]) -> Result<Vec<User>, StorageError>;
    /// Never touches owners; 0 rows when the role is unchanged
    async fn update_user_role(&self, telegram_id: i64, role: &str) -> Result<u64, StorageError>;
    /// Create or promote a user to owner
    async fn seed_owner(&self, telegram_id: i64) -> Result<(), StorageError>;

    // Plugin state
    async fn get_or_create_plugin_state(
        &self,
        name: &str,
        default_state: PluginState,
    ) -> Result<PluginRecord, StorageError>;
    async fn update_plugin_state(&self, name: &str, state: PluginState) -> Result<u64, StorageError>;
    async fn list_plugin_states(&self) -> Result<Vec<PluginRecord>, StorageError>;

    // Message log
    async fn store_message(&self, message: &StoredMessage) -> Result<(), StorageError>;

    // Groups
    /// Returns the group and whether it was created now
    async fn create_group_if_absent(&self, name: &str) -> Result<(Group, bool), StorageError>;
    async fn list_groups(&self, states: &[String]) -> Result<Vec<Group>, StorageError>;
    async fn rename_group(&self, old_name: &str, new_name: &str) -> Result<u64, StorageError>;
    async fn update_group_state(&self, name: &str, state: &str) -> Result<u64, StorageError>;

    // Group membership
    //
    // These fail with `StorageError::NotFound` when the group, user or chat
    // does not exist, and return false when nothing changed.
    async fn add_group_user(&self, group: &str, telegram_id: i64) -> Result<bool, StorageError>;
    async fn delete_group_user(&self, group: &str, telegram_id: i64) -> Result<bool, StorageError>;
    async fn add_group_groupchat(&self, group: &str, chat_id: i64) -> Result<bool, StorageError>;
    async fn delete_group_groupchat(&self, group: &str, chat_id: i64) -> Result<bool, StorageError>;
    /// Chats attached to a group, by state then title
    async fn list_group_groupchats(&self, group_id: i64) -> Result<Vec<Groupchat>, StorageError>;

    // Group chats
    /// Returns the chat and whether it was created now
    async fn create_groupchat_if_absent(&self, chat: &Groupchat) -> Result<(Groupchat, bool), StorageError>;
    async fn update_groupchat_title(&self, telegram_id: i64, title: &str) -> Result<u64, StorageError>;
    async fn list_groupchats(&self, states: &[String]) -> Result<Vec<Groupchat>, StorageError>;
}
