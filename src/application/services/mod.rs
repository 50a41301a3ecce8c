//! Application services - plugin lifecycle and outbound messaging

pub mod message_service;
pub mod plugin_service;

pub use message_service::MessageService;
pub use plugin_service::PluginService;
