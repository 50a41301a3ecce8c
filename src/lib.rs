//! Chat-bot plugin registry and command dispatch

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
