// Discord layer - commands, dispatch and sync glue.

#[path = "commands/command_catalog.rs"]
pub mod commands;
pub mod command_sync;
pub mod dispatcher;
pub mod presence;

// Re-export command types for convenience
pub use commands::{BotSynchronizer, Data, Error};
