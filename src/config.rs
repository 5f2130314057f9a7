// Runtime configuration, read from the environment (and `.env` via dotenv).

use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_COMMANDS_DIR: &str = "commands";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0} environment variable! Create a .env file with your bot token.")]
    Missing(&'static str),

    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub token: String,
    /// Register commands in this guild only instead of globally.
    pub guild_id: Option<serenity::GuildId>,
    pub data_dir: PathBuf,
    pub commands_dir: PathBuf,
    /// Abort startup when the initial command sync fails.
    pub strict_sync: bool,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let token = var("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let guild_id = var("DISCORD_GUILD_ID")
            .map(|raw| {
                raw.parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)
                    .map(serenity::GuildId::new)
                    .ok_or(ConfigError::Invalid {
                        name: "DISCORD_GUILD_ID",
                        value: raw,
                    })
            })
            .transpose()?;

        let strict_sync = match var("COMMAND_SYNC_STRICT") {
            None => false,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "COMMAND_SYNC_STRICT",
                        value: raw,
                    })
                }
            },
        };

        Ok(Self {
            token,
            guild_id,
            data_dir: var("BOT_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            commands_dir: var("BOT_COMMANDS_DIR")
                .unwrap_or_else(|| DEFAULT_COMMANDS_DIR.to_string())
                .into(),
            strict_sync,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("bot.db")
    }
}
