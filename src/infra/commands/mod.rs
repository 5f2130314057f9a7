// Implementations of the command-sync ports.

#[cfg(test)]
pub mod in_memory;
pub mod json_source;
pub mod serenity_api;
pub mod sqlite_hash_store;

#[cfg(test)]
pub use in_memory::InMemoryCommandStore;
pub use json_source::{read_command_dir, CustomCommandFile};
pub use serenity_api::{CommandScope, SerenityCommandApi};
pub use sqlite_hash_store::SqliteCommandStore;
