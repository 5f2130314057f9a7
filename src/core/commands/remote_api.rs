use super::command_models::CommandDefinition;
use async_trait::async_trait;
use thiserror::Error;

/// A command as the platform reports it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub name: String,
    pub remote_id: String,
}

#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("remote API request failed: {0}")]
    Request(String),

    #[error("remote id `{0}` is not valid")]
    InvalidId(String),
}

/// The platform's application-command endpoint.
///
/// Implementations do not retry; errors go straight back to the caller.
#[async_trait]
pub trait RemoteCommandApi: Send + Sync {
    /// Replace the remote command set with `commands`.
    async fn bulk_upsert(
        &self,
        commands: &[CommandDefinition],
    ) -> Result<Vec<RemoteCommand>, RemoteApiError>;

    async fn list(&self) -> Result<Vec<RemoteCommand>, RemoteApiError>;

    async fn delete(&self, remote_id: &str) -> Result<(), RemoteApiError>;
}
