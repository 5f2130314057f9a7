use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

/// Last synced state of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub name: String,
    pub content_hash: String,
    pub remote_id: String,
}

impl CommandRecord {
    pub fn new(
        name: impl Into<String>,
        content_hash: impl Into<String>,
        remote_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_hash: content_hash.into(),
            remote_id: remote_id.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage error for command `{name}`: {message}")]
    Command { name: String, message: String },

    #[error("storage error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn for_command(name: &str, err: impl std::fmt::Display) -> Self {
        StorageError::Command {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

/// Persistent name -> (hash, remote id) mapping.
///
/// Every mutation must be durable before it returns.
#[async_trait]
pub trait CommandHashStore: Send + Sync {
    /// Stored hash for `name`; `None` when the command was never synced.
    async fn get(&self, name: &str) -> Result<Option<String>, StorageError>;

    async fn get_record(&self, name: &str) -> Result<Option<CommandRecord>, StorageError>;

    /// Insert or overwrite the record for `record.name`.
    async fn upsert(&self, record: &CommandRecord) -> Result<(), StorageError>;

    /// Write a whole batch or nothing.
    async fn upsert_all(&self, records: &[CommandRecord]) -> Result<(), StorageError>;

    async fn list_names(&self) -> Result<BTreeSet<String>, StorageError>;

    /// Remove the record; absent names are not an error.
    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}
