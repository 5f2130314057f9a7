use super::stats_models::{ActivityKind, GuildSettings, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum StatsStoreError {
    #[error("Database error: {0}")]
    Database(String),
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Bump the counter for `kind` and stamp `last_active`, creating the row if needed.
    async fn record_activity(
        &self,
        user_id: u64,
        guild_id: u64,
        kind: ActivityKind,
        at: DateTime<Utc>,
    ) -> Result<(), StatsStoreError>;
    async fn get_user_stats(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<UserStats>, StatsStoreError>;
    async fn get_guild_settings(
        &self,
        guild_id: u64,
    ) -> Result<Option<GuildSettings>, StatsStoreError>;
    async fn save_guild_settings(&self, settings: GuildSettings) -> Result<(), StatsStoreError>;
}
