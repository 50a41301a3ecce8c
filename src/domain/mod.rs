//! Domain layer - Core business objects and collaborator abstractions
//!
//! This layer contains:
//! - Entities: Users, roles, commands, updates, plugin state
//! - Traits: Abstractions for infrastructure (Bot, Store)

pub mod entities;
pub mod traits;
