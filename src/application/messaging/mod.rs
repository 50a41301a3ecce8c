//! Message handling - command parsing and update dispatching

pub mod context;
pub mod dispatcher;
pub mod parser;

pub use context::CommandContext;
pub use dispatcher::{DispatchOptions, DispatchOutcome, Dispatcher};
pub use parser::{CommandParser, ParsedCommand};
