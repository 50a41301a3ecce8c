//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: plugin lifecycle and outbound messaging
//! - Errors: Domain-specific errors
//! - Messaging: command parsing and update dispatching

pub mod errors;
pub mod messaging;
pub mod services;
