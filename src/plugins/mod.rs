//! Plugin system
//!
//! Plugins are compiled in and handed to `PluginService::bootstrap` at boot.
//! Each one owns a set of commands that it registers in `on_start` and
//! removes in `on_stop`.

pub mod admin;
pub mod echo;
pub mod groupchats;
pub mod groups;
pub mod me;
pub mod messages;
pub mod registry;
pub mod starthelp;
pub mod trait_def;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

pub use registry::{Activation, PluginRegistry};
pub use trait_def::Plugin;

/// Every plugin shipped with the bot
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(admin::AdminPlugin),
        Arc::new(starthelp::StartHelpPlugin),
        Arc::new(echo::EchoPlugin),
        Arc::new(me::MePlugin),
        Arc::new(users::UsersPlugin),
        Arc::new(messages::MessagesPlugin),
        Arc::new(groups::GroupsPlugin),
        Arc::new(groupchats::GroupchatsPlugin),
    ]
}
