use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::role::{self, RoleSet};
use crate::application::errors::CommandError;
use crate::application::messaging::CommandContext;

/// Future returned by a command callback
pub type CommandFuture = Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send>>;

/// Command callback function type
pub type CommandCallback = Arc<dyn Fn(CommandContext) -> CommandFuture + Send + Sync>;

/// Wrap an async fn (or closure returning a future) as a callback
pub fn callback<F, Fut>(f: F) -> CommandCallback
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// A registered, role-gated bot command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: String,
    pub allowed_roles: RoleSet,
    pub callback: CommandCallback,
}

impl Command {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        allowed_roles: &[&str],
        callback: CommandCallback,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            allowed_roles: role::roles(allowed_roles),
            callback,
        }
    }

    pub fn allows(&self, role: &str) -> bool {
        self.allowed_roles.contains(role)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("allowed_roles", &self.allowed_roles)
            .finish_non_exhaustive()
    }
}

/// Result of looking a command up for a given role
pub enum Access {
    /// Registered and the role is whitelisted
    Allowed(CommandCallback),
    /// Registered, but not for this role
    Forbidden,
    /// No such command
    Unknown,
}

/// Runtime-mutable command table.
///
/// Keyed by command name; a name maps to at most one registration and
/// the last registration wins. Iteration is by name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<BTreeMap<String, Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // writers never leave the map half-updated, so poison is ignored
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Command>> {
        self.commands.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Command>> {
        self.commands.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a command, replacing any earlier registration of the same name
    pub fn register(&self, command: Command) -> Option<Command> {
        let previous = self.write().insert(command.name.clone(), command);
        if let Some(prev) = &previous {
            tracing::warn!("Command /{} re-registered, previous entry replaced", prev.name);
        }
        previous
    }

    /// Remove a command; unknown names are ignored
    pub fn unregister(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Sole authorization gate: true iff `name` exists and lists `role`
    pub fn is_allowed(&self, name: &str, role: &str) -> bool {
        self.read().get(name).is_some_and(|cmd| cmd.allows(role))
    }

    /// Look a command up for dispatch
    pub fn resolve(&self, name: &str, role: &str) -> Access {
        match self.read().get(name) {
            Some(cmd) if cmd.allows(role) => Access::Allowed(Arc::clone(&cmd.callback)),
            Some(_) => Access::Forbidden,
            None => Access::Unknown,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// All `(name, description)` pairs, ordered by name
    pub fn list(&self) -> Vec<(String, String)> {
        self.read()
            .values()
            .map(|cmd| (cmd.name.clone(), cmd.description.clone()))
            .collect()
    }

    /// Commands a role may run, ordered by name
    pub fn list_for_role(&self, role: &str) -> Vec<(String, String)> {
        self.read()
            .values()
            .filter(|cmd| cmd.allows(role))
            .map(|cmd| (cmd.name.clone(), cmd.description.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
