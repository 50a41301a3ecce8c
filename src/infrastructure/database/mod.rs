//! SQLite storage implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::application::errors::StorageError;
use crate::domain::entities::{
    group, role, Group, Groupchat, PluginRecord, PluginState, StoredMessage, User,
};
use crate::domain::traits::store::DEFAULT_LISTED_ROLES;
use crate::domain::traits::{Store, UserStatus};

const USER_COLUMNS: &str =
    "id, telegram_id, first_name, last_name, user_name, is_bot, role, created_at";
const GROUPCHAT_COLUMNS: &str = "id, telegram_id, title, state, invite_link";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_tables()?;
        Ok(db)
    }

    fn init_tables(&self) -> Result<(), StorageError> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_id INTEGER NOT NULL UNIQUE,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                user_name TEXT NOT NULL DEFAULT '',
                is_bot INTEGER NOT NULL DEFAULT 0,
                role TEXT NOT NULL DEFAULT 'new',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS telegram_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_id INTEGER NOT NULL,
                message TEXT NOT NULL DEFAULT '',
                is_incoming INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS plugins (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                state TEXT NOT NULL DEFAULT 'enabled',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                CONSTRAINT groups_name UNIQUE (name) ON CONFLICT IGNORE
            );

            CREATE TABLE IF NOT EXISTS groupchats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_id INTEGER NOT NULL UNIQUE,
                title TEXT NOT NULL DEFAULT '',
                invite_link TEXT NOT NULL DEFAULT '',
                state TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS groups_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                CONSTRAINT groups_users_pair UNIQUE (group_id, user_id) ON CONFLICT IGNORE
            );

            CREATE TABLE IF NOT EXISTS groups_groupchats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
                groupchat_id INTEGER NOT NULL REFERENCES groupchats(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                CONSTRAINT groups_groupchats_pair UNIQUE (group_id, groupchat_id) ON CONFLICT IGNORE
            );

            CREATE INDEX IF NOT EXISTS idx_messages_telegram_id ON telegram_messages(telegram_id);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Message count, mostly for diagnostics
    pub fn message_count(&self) -> Result<i64, StorageError> {
        let count = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM telegram_messages", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        user_name: row.get(4)?,
        is_bot: row.get(5)?,
        role: row.get(6)?,
        created_at: parse_timestamp(row.get(7)?),
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        state: row.get(2)?,
    })
}

fn groupchat_from_row(row: &Row<'_>) -> rusqlite::Result<Groupchat> {
    Ok(Groupchat {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        title: row.get(2)?,
        state: row.get(3)?,
        invite_link: row.get(4)?,
    })
}

/// Row id behind a natural key, or `NotFound(what)`
fn lookup_id(
    conn: &Connection,
    sql: &str,
    key: impl rusqlite::ToSql,
    what: &'static str,
) -> Result<i64, StorageError> {
    conn.query_row(sql, [key], |row| row.get(0))
        .optional()?
        .ok_or(StorageError::NotFound(what))
}

fn group_id(conn: &Connection, name: &str) -> Result<i64, StorageError> {
    lookup_id(conn, "SELECT id FROM groups WHERE name = ?1", name, "group")
}

fn user_id(conn: &Connection, telegram_id: i64) -> Result<i64, StorageError> {
    lookup_id(conn, "SELECT id FROM users WHERE telegram_id = ?1", telegram_id, "user")
}

fn groupchat_id(conn: &Connection, telegram_id: i64) -> Result<i64, StorageError> {
    lookup_id(
        conn,
        "SELECT id FROM groupchats WHERE telegram_id = ?1",
        telegram_id,
        "groupchat",
    )
}

/// `?, ?, ?` for an IN clause
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn or_defaults(values: &[String], defaults: &[&str]) -> Vec<String> {
    if values.is_empty() {
        defaults.iter().map(|v| v.to_string()).collect()
    } else {
        values.to_vec()
    }
}

#[async_trait]
impl Store for Database {
    async fn get_user(&self, telegram_id: i64) -> Result<Option<User>, StorageError> {
        let user = self
            .conn()?
            .query_row(
                &format!("SELECT {} FROM users WHERE telegram_id = ?1", USER_COLUMNS),
                [telegram_id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn create_user_if_absent(&self, user: &User) -> Result<UserStatus, StorageError> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE telegram_id = ?1", USER_COLUMNS),
                [user.telegram_id],
                user_from_row,
            )
            .optional()?;

        if let Some(existing) = existing {
            return Ok(UserStatus::from_existing(existing));
        }

        conn.execute(
            "INSERT INTO users (telegram_id, first_name, last_name, user_name, is_bot, role)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.telegram_id,
                user.first_name,
                user.last_name,
                user.user_name,
                user.is_bot,
                user.role
            ],
        )?;

        let mut created = user.clone();
        created.id = conn.last_insert_rowid();
        created.created_at = Some(Utc::now());
        tracing::debug!("{} ({}) added", created.short(), created.id);
        Ok(UserStatus::Created(created))
    }

    async fn list_users(&self, roles: &[String]) -> Result<Vec<User>, StorageError> {
        let roles = or_defaults(roles, DEFAULT_LISTED_ROLES);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE role IN ({}) AND is_bot = 0 ORDER BY role, id",
            USER_COLUMNS,
            placeholders(roles.len())
        ))?;

        let rows = stmt.query_map(params_from_iter(roles.iter()), user_from_row)?;
        let mut users = Vec::new();
        for user in rows {
            users.push(user?);
        }
        Ok(users)
    }

    async fn update_user_role(&self, telegram_id: i64, new_role: &str) -> Result<u64, StorageError> {
        let rows = self.conn()?.execute(
            "UPDATE users SET role = ?1 WHERE telegram_id = ?2 AND role != ?1 AND role != ?3",
            params![new_role, telegram_id, role::OWNER],
        )?;
        Ok(rows as u64)
    }

    async fn seed_owner(&self, telegram_id: i64) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT INTO users (telegram_id, role) VALUES (?1, ?2)
             ON CONFLICT(telegram_id) DO UPDATE SET role = excluded.role",
            params![telegram_id, role::OWNER],
        )?;
        Ok(())
    }

    async fn get_or_create_plugin_state(
        &self,
        name: &str,
        default_state: PluginState,
    ) -> Result<PluginRecord, StorageError> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO plugins (name, state) VALUES (?1, ?2)",
            params![name, default_state.as_str()],
        )?;
        if inserted > 0 {
            tracing::debug!("{} ({}) added", name, default_state);
        }

        let state: String = conn.query_row(
            "SELECT state FROM plugins WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(PluginRecord {
            name: name.to_string(),
            state: PluginState::parse(&state),
        })
    }

    async fn update_plugin_state(&self, name: &str, state: PluginState) -> Result<u64, StorageError> {
        let rows = self.conn()?.execute(
            "UPDATE plugins SET state = ?1 WHERE name = ?2 AND state != ?1",
            params![state.as_str(), name],
        )?;
        Ok(rows as u64)
    }

    async fn list_plugin_states(&self) -> Result<Vec<PluginRecord>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, state FROM plugins ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            let state: String = row.get(1)?;
            Ok(PluginRecord {
                name: row.get(0)?,
                state: PluginState::parse(&state),
            })
        })?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    async fn store_message(&self, message: &StoredMessage) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT INTO telegram_messages (telegram_id, message, is_incoming, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                message.telegram_id,
                message.text,
                message.is_incoming,
                message.date.format("%Y-%m-%d %H:%M:%S").to_string()
            ],
        )?;
        Ok(())
    }

    async fn create_group_if_absent(&self, name: &str) -> Result<(Group, bool), StorageError> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                "SELECT id, name, state FROM groups WHERE name = ?1",
                [name],
                group_from_row,
            )
            .optional()?;
        if let Some(existing) = existing {
            return Ok((existing, false));
        }

        conn.execute(
            "INSERT INTO groups (name, state) VALUES (?1, ?2)",
            params![name, group::ACTIVE],
        )?;
        let mut created = Group::new(name);
        created.id = conn.last_insert_rowid();
        Ok((created, true))
    }

    async fn list_groups(&self, states: &[String]) -> Result<Vec<Group>, StorageError> {
        let states = or_defaults(states, &[group::ACTIVE]);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, name, state FROM groups WHERE state IN ({}) ORDER BY state, name",
            placeholders(states.len())
        ))?;

        let rows = stmt.query_map(params_from_iter(states.iter()), group_from_row)?;
        let mut groups = Vec::new();
        for group in rows {
            groups.push(group?);
        }
        Ok(groups)
    }

    async fn rename_group(&self, old_name: &str, new_name: &str) -> Result<u64, StorageError> {
        let rows = self.conn()?.execute(
            "UPDATE groups SET name = ?1 WHERE name = ?2 AND name != ?1",
            params![new_name, old_name],
        )?;
        Ok(rows as u64)
    }

    async fn update_group_state(&self, name: &str, state: &str) -> Result<u64, StorageError> {
        let rows = self.conn()?.execute(
            "UPDATE groups SET state = ?1 WHERE name = ?2 AND state != ?1",
            params![state, name],
        )?;
        Ok(rows as u64)
    }

    async fn add_group_user(&self, group: &str, telegram_id: i64) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let group_id = group_id(&conn, group)?;
        let user_id = user_id(&conn, telegram_id)?;
        let rows = conn.execute(
            "INSERT INTO groups_users (group_id, user_id) VALUES (?1, ?2)",
            params![group_id, user_id],
        )?;
        Ok(rows > 0)
    }

    async fn delete_group_user(&self, group: &str, telegram_id: i64) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let group_id = group_id(&conn, group)?;
        let user_id = user_id(&conn, telegram_id)?;
        let rows = conn.execute(
            "DELETE FROM groups_users WHERE group_id = ?1 AND user_id = ?2",
            params![group_id, user_id],
        )?;
        Ok(rows > 0)
    }

    async fn add_group_groupchat(&self, group: &str, chat_id: i64) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let group_id = group_id(&conn, group)?;
        let groupchat_id = groupchat_id(&conn, chat_id)?;
        let rows = conn.execute(
            "INSERT INTO groups_groupchats (group_id, groupchat_id) VALUES (?1, ?2)",
            params![group_id, groupchat_id],
        )?;
        Ok(rows > 0)
    }

    async fn delete_group_groupchat(&self, group: &str, chat_id: i64) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let group_id = group_id(&conn, group)?;
        let groupchat_id = groupchat_id(&conn, chat_id)?;
        let rows = conn.execute(
            "DELETE FROM groups_groupchats WHERE group_id = ?1 AND groupchat_id = ?2",
            params![group_id, groupchat_id],
        )?;
        Ok(rows > 0)
    }

    async fn list_group_groupchats(&self, group_id: i64) -> Result<Vec<Groupchat>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM groupchats
             WHERE id IN (SELECT groupchat_id FROM groups_groupchats WHERE group_id = ?1)
             ORDER BY state, title",
            GROUPCHAT_COLUMNS
        ))?;

        let rows = stmt.query_map([group_id], groupchat_from_row)?;
        let mut chats = Vec::new();
        for chat in rows {
            chats.push(chat?);
        }
        Ok(chats)
    }

    async fn create_groupchat_if_absent(
        &self,
        chat: &Groupchat,
    ) -> Result<(Groupchat, bool), StorageError> {
        let conn = self.conn()?;
        let existing = conn
            .query_row(
                &format!("SELECT {} FROM groupchats WHERE telegram_id = ?1", GROUPCHAT_COLUMNS),
                [chat.telegram_id],
                groupchat_from_row,
            )
            .optional()?;
        if let Some(existing) = existing {
            return Ok((existing, false));
        }

        conn.execute(
            "INSERT INTO groupchats (telegram_id, title, invite_link, state) VALUES (?1, ?2, ?3, ?4)",
            params![chat.telegram_id, chat.title, chat.invite_link, chat.state],
        )?;
        let mut created = chat.clone();
        created.id = conn.last_insert_rowid();
        tracing::debug!("{} ({}) added", created.title, created.id);
        Ok((created, true))
    }

    async fn update_groupchat_title(&self, telegram_id: i64, title: &str) -> Result<u64, StorageError> {
        let rows = self.conn()?.execute(
            "UPDATE groupchats SET title = ?1 WHERE telegram_id = ?2 AND title != ?1",
            params![title, telegram_id],
        )?;
        Ok(rows as u64)
    }

    async fn list_groupchats(&self, states: &[String]) -> Result<Vec<Groupchat>, StorageError> {
        let states = or_defaults(states, &[group::ACTIVE]);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM groupchats WHERE state IN ({}) ORDER BY state, title",
            GROUPCHAT_COLUMNS,
            placeholders(states.len())
        ))?;

        let rows = stmt.query_map(params_from_iter(states.iter()), groupchat_from_row)?;
        let mut chats = Vec::new();
        for chat in rows {
            chats.push(chat?);
        }
        Ok(chats)
    }
}
