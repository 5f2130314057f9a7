// Remote command API backed by serenity's HTTP client.
//
// Payloads are our own `CommandDefinition`s; their serde form already matches
// the application-command JSON, so they go over the wire unchanged.

use crate::core::commands::{CommandDefinition, RemoteApiError, RemoteCommand, RemoteCommandApi};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Where commands get registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandScope {
    Global,
    /// Guild commands update instantly, which is handy while developing.
    Guild(serenity::GuildId),
}

pub struct SerenityCommandApi {
    http: Arc<serenity::Http>,
    scope: CommandScope,
}

impl SerenityCommandApi {
    pub fn new(http: Arc<serenity::Http>, scope: CommandScope) -> Self {
        Self { http, scope }
    }
}

fn to_remote(command: serenity::Command) -> RemoteCommand {
    RemoteCommand {
        name: command.name,
        remote_id: command.id.get().to_string(),
    }
}

fn request_error(err: serenity::Error) -> RemoteApiError {
    RemoteApiError::Request(err.to_string())
}

fn parse_command_id(remote_id: &str) -> Result<serenity::CommandId, RemoteApiError> {
    remote_id
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(serenity::CommandId::new)
        .ok_or_else(|| RemoteApiError::InvalidId(remote_id.to_string()))
}

#[async_trait]
impl RemoteCommandApi for SerenityCommandApi {
    async fn bulk_upsert(
        &self,
        commands: &[CommandDefinition],
    ) -> Result<Vec<RemoteCommand>, RemoteApiError> {
        let registered = match self.scope {
            CommandScope::Global => self.http.create_global_commands(&commands).await,
            CommandScope::Guild(guild_id) => {
                self.http.create_guild_commands(guild_id, &commands).await
            }
        }
        .map_err(request_error)?;

        Ok(registered.into_iter().map(to_remote).collect())
    }

    async fn list(&self) -> Result<Vec<RemoteCommand>, RemoteApiError> {
        let commands = match self.scope {
            CommandScope::Global => self.http.get_global_commands().await,
            CommandScope::Guild(guild_id) => self.http.get_guild_commands(guild_id).await,
        }
        .map_err(request_error)?;

        Ok(commands.into_iter().map(to_remote).collect())
    }

    async fn delete(&self, remote_id: &str) -> Result<(), RemoteApiError> {
        let command_id = parse_command_id(remote_id)?;
        match self.scope {
            CommandScope::Global => self.http.delete_global_command(command_id).await,
            CommandScope::Guild(guild_id) => {
                self.http.delete_guild_command(guild_id, command_id).await
            }
        }
        .map_err(request_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_id() {
        assert_eq!(
            parse_command_id("1181234567890123456").unwrap().get(),
            1181234567890123456
        );
        assert!(matches!(
            parse_command_id("temp"),
            Err(RemoteApiError::InvalidId(_))
        ));
        assert!(parse_command_id("0").is_err());
    }

    #[test]
    fn test_payload_matches_wire_shape() {
        use crate::core::commands::{CommandOption, OptionKind};

        let def = CommandDefinition::new("stats", "View statistics").option(
            CommandOption::new(OptionKind::User, "user", "Whose stats").required(false),
        );
        let json = serde_json::to_value(vec![def]).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{
                "name": "stats",
                "description": "View statistics",
                "type": 1,
                "options": [{"type": 6, "name": "user", "description": "Whose stats"}]
            }])
        );
    }
}
