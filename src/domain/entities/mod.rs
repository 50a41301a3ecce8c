//! Domain entities - Core business objects

pub mod command;
pub mod group;
pub mod message;
pub mod plugin_state;
pub mod role;
pub mod update;
pub mod user;

pub use command::{callback, Access, Command, CommandCallback, CommandRegistry};
pub use group::{Group, Groupchat};
pub use message::StoredMessage;
pub use plugin_state::{PluginRecord, PluginState};
pub use update::{CallbackQuery, Chat, ChatKind, IncomingMessage, Sender, Update, UpdateKind};
pub use user::User;
