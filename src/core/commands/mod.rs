pub mod command_models;
pub mod command_registry;
pub mod command_store;
pub mod remote_api;
pub mod sync_service;

pub use command_models::{
    canonicalize, content_hash, CommandDefinition, CommandKind, CommandOption, OptionChoice,
    OptionKind,
};
pub use command_registry::{
    CommandRegistry, CommandSource, DeclaredCommand, LoadError, RegisteredCommand,
};
pub use command_store::{CommandHashStore, CommandRecord, StorageError};
pub use remote_api::{RemoteApiError, RemoteCommand, RemoteCommandApi};
pub use sync_service::{CommandSynchronizer, FailedDeletion, SyncError, SyncPlan, SyncReport};
