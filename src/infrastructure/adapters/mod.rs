//! Chat transports

pub mod console;
pub mod telegram;

pub use console::{ConsoleAdapter, Outgoing};
pub use telegram::TelegramAdapter;
