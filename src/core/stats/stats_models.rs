use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "!";

/// What kind of activity bumped a user's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Command,
    Message,
}

impl ActivityKind {
    /// Column that tracks this activity.
    pub fn column(&self) -> &'static str {
        match self {
            ActivityKind::Command => "commands_used",
            ActivityKind::Message => "messages_sent",
        }
    }
}

/// Per-user counters within one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: u64,
    pub guild_id: u64,
    pub commands_used: u64,
    pub messages_sent: u64,
    pub last_active: Option<DateTime<Utc>>,
}

impl UserStats {
    pub fn empty(user_id: u64, guild_id: u64) -> Self {
        Self {
            user_id,
            guild_id,
            commands_used: 0,
            messages_sent: 0,
            last_active: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub guild_id: u64,
    pub prefix: String,
    pub welcome_channel_id: Option<u64>,
    pub log_channel_id: Option<u64>,
}

impl GuildSettings {
    pub fn defaults(guild_id: u64) -> Self {
        Self {
            guild_id,
            prefix: DEFAULT_PREFIX.to_string(),
            welcome_channel_id: None,
            log_channel_id: None,
        }
    }
}
