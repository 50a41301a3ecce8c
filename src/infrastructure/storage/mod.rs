//! In-memory storage implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::{
    group, role, Group, Groupchat, PluginRecord, PluginState, StoredMessage, User,
};
use crate::domain::traits::store::DEFAULT_LISTED_ROLES;
use crate::domain::traits::{Store, UserStatus};

/// Store kept entirely in process memory, for development and tests
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<i64, User>>,
    plugins: RwLock<BTreeMap<String, PluginState>>,
    messages: RwLock<Vec<StoredMessage>>,
    groups: RwLock<Vec<Group>>,
    groupchats: RwLock<Vec<Groupchat>>,
    // (group id, user telegram id)
    group_users: RwLock<BTreeSet<(i64, i64)>>,
    // (group id, chat telegram id)
    group_chats: RwLock<BTreeSet<(i64, i64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message log snapshot, oldest first
    pub async fn messages(&self) -> Vec<StoredMessage> {
        self.messages.read().await.clone()
    }

    async fn group_id(&self, name: &str) -> Result<i64, StorageError> {
        let groups = self.groups.read().await;
        groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.id)
            .ok_or(StorageError::NotFound("group"))
    }

    async fn require_user(&self, telegram_id: i64) -> Result<(), StorageError> {
        if self.users.read().await.contains_key(&telegram_id) {
            Ok(())
        } else {
            Err(StorageError::NotFound("user"))
        }
    }

    async fn require_groupchat(&self, telegram_id: i64) -> Result<(), StorageError> {
        let chats = self.groupchats.read().await;
        if chats.iter().any(|c| c.telegram_id == telegram_id) {
            Ok(())
        } else {
            Err(StorageError::NotFound("groupchat"))
        }
    }
}

fn state_filter<'a>(states: &'a [String]) -> impl Fn(&str) -> bool + 'a {
    move |state: &str| {
        if states.is_empty() {
            state == group::ACTIVE
        } else {
            states.iter().any(|s| s == state)
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, telegram_id: i64) -> Result<Option<User>, StorageError> {
        let users = self.users.read().await;
        Ok(users.get(&telegram_id).cloned())
    }

    async fn create_user_if_absent(&self, user: &User) -> Result<UserStatus, StorageError> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.get(&user.telegram_id) {
            return Ok(UserStatus::from_existing(existing.clone()));
        }

        let mut created = user.clone();
        created.id = users.len() as i64 + 1;
        created.created_at = Some(Utc::now());
        users.insert(created.telegram_id, created.clone());
        Ok(UserStatus::Created(created))
    }

    async fn list_users(&self, roles: &[String]) -> Result<Vec<User>, StorageError> {
        let users = self.users.read().await;
        let wanted = |r: &str| {
            if roles.is_empty() {
                DEFAULT_LISTED_ROLES.contains(&r)
            } else {
                roles.iter().any(|w| w == r)
            }
        };

        let mut listed: Vec<User> = users
            .values()
            .filter(|u| !u.is_bot && wanted(&u.role))
            .cloned()
            .collect();
        listed.sort_by(|a, b| (&a.role, a.id).cmp(&(&b.role, b.id)));
        Ok(listed)
    }

    async fn update_user_role(&self, telegram_id: i64, new_role: &str) -> Result<u64, StorageError> {
        let mut users = self.users.write().await;
        match users.get_mut(&telegram_id) {
            Some(u) if u.role != new_role && u.role != role::OWNER => {
                u.role = new_role.to_string();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn seed_owner(&self, telegram_id: i64) -> Result<(), StorageError> {
        let mut users = self.users.write().await;
        let next_id = users.len() as i64 + 1;
        let entry = users.entry(telegram_id).or_insert_with(|| {
            let mut u = User::new(telegram_id);
            u.id = next_id;
            u.created_at = Some(Utc::now());
            u
        });
        entry.role = role::OWNER.to_string();
        Ok(())
    }

    async fn get_or_create_plugin_state(
        &self,
        name: &str,
        default_state: PluginState,
    ) -> Result<PluginRecord, StorageError> {
        let mut plugins = self.plugins.write().await;
        let state = *plugins.entry(name.to_string()).or_insert(default_state);
        Ok(PluginRecord {
            name: name.to_string(),
            state,
        })
    }

    async fn update_plugin_state(&self, name: &str, state: PluginState) -> Result<u64, StorageError> {
        let mut plugins = self.plugins.write().await;
        match plugins.get_mut(name) {
            Some(current) if *current != state => {
                *current = state;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn list_plugin_states(&self) -> Result<Vec<PluginRecord>, StorageError> {
        let plugins = self.plugins.read().await;
        Ok(plugins
            .iter()
            .map(|(name, state)| PluginRecord {
                name: name.clone(),
                state: *state,
            })
            .collect())
    }

    async fn store_message(&self, message: &StoredMessage) -> Result<(), StorageError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn create_group_if_absent(&self, name: &str) -> Result<(Group, bool), StorageError> {
        let mut groups = self.groups.write().await;
        if let Some(existing) = groups.iter().find(|g| g.name == name) {
            return Ok((existing.clone(), false));
        }

        let mut group = Group::new(name);
        group.id = groups.len() as i64 + 1;
        groups.push(group.clone());
        Ok((group, true))
    }

    async fn list_groups(&self, states: &[String]) -> Result<Vec<Group>, StorageError> {
        let groups = self.groups.read().await;
        let wanted = state_filter(states);
        let mut listed: Vec<Group> = groups.iter().filter(|g| wanted(&g.state)).cloned().collect();
        listed.sort_by(|a, b| (&a.state, &a.name).cmp(&(&b.state, &b.name)));
        Ok(listed)
    }

    async fn rename_group(&self, old_name: &str, new_name: &str) -> Result<u64, StorageError> {
        let mut groups = self.groups.write().await;
        if old_name == new_name || groups.iter().any(|g| g.name == new_name) {
            return Ok(0);
        }
        match groups.iter_mut().find(|g| g.name == old_name) {
            Some(group) => {
                group.name = new_name.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_group_state(&self, name: &str, state: &str) -> Result<u64, StorageError> {
        let mut groups = self.groups.write().await;
        match groups.iter_mut().find(|g| g.name == name && g.state != state) {
            Some(group) => {
                group.state = state.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn add_group_user(&self, group: &str, telegram_id: i64) -> Result<bool, StorageError> {
        let group_id = self.group_id(group).await?;
        self.require_user(telegram_id).await?;
        Ok(self.group_users.write().await.insert((group_id, telegram_id)))
    }

    async fn delete_group_user(&self, group: &str, telegram_id: i64) -> Result<bool, StorageError> {
        let group_id = self.group_id(group).await?;
        self.require_user(telegram_id).await?;
        Ok(self.group_users.write().await.remove(&(group_id, telegram_id)))
    }

    async fn add_group_groupchat(&self, group: &str, chat_id: i64) -> Result<bool, StorageError> {
        let group_id = self.group_id(group).await?;
        self.require_groupchat(chat_id).await?;
        Ok(self.group_chats.write().await.insert((group_id, chat_id)))
    }

    async fn delete_group_groupchat(&self, group: &str, chat_id: i64) -> Result<bool, StorageError> {
        let group_id = self.group_id(group).await?;
        self.require_groupchat(chat_id).await?;
        Ok(self.group_chats.write().await.remove(&(group_id, chat_id)))
    }

    async fn list_group_groupchats(&self, group_id: i64) -> Result<Vec<Groupchat>, StorageError> {
        let links = self.group_chats.read().await;
        let chats = self.groupchats.read().await;
        let mut listed: Vec<Groupchat> = chats
            .iter()
            .filter(|c| links.contains(&(group_id, c.telegram_id)))
            .cloned()
            .collect();
        listed.sort_by(|a, b| (&a.state, &a.title).cmp(&(&b.state, &b.title)));
        Ok(listed)
    }

    async fn create_groupchat_if_absent(
        &self,
        chat: &Groupchat,
    ) -> Result<(Groupchat, bool), StorageError> {
        let mut chats = self.groupchats.write().await;
        if let Some(existing) = chats.iter().find(|c| c.telegram_id == chat.telegram_id) {
            return Ok((existing.clone(), false));
        }

        let mut created = chat.clone();
        created.id = chats.len() as i64 + 1;
        chats.push(created.clone());
        Ok((created, true))
    }

    async fn update_groupchat_title(&self, telegram_id: i64, title: &str) -> Result<u64, StorageError> {
        let mut chats = self.groupchats.write().await;
        match chats.iter_mut().find(|c| c.telegram_id == telegram_id && c.title != title) {
            Some(chat) => {
                chat.title = title.to_string();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_groupchats(&self, states: &[String]) -> Result<Vec<Groupchat>, StorageError> {
        let chats = self.groupchats.read().await;
        let wanted = state_filter(states);
        let mut listed: Vec<Groupchat> = chats.iter().filter(|c| wanted(&c.state)).cloned().collect();
        listed.sort_by(|a, b| (&a.state, &a.title).cmp(&(&b.state, &b.title)));
        Ok(listed)
    }
}
