// Per-guild and per-user statistics.
//
// No Discord types here: the Discord layer passes raw ids in and formats the
// results on the way out.

use super::stats_models::{ActivityKind, GuildSettings, UserStats};
use super::stats_store::{StatsStore, StatsStoreError};
use chrono::Utc;
use dashmap::DashMap;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Store error: {0}")]
    Store(#[from] StatsStoreError),
}

pub struct StatsService<S: StatsStore> {
    store: S,
    /// Guilds whose settings row is known to exist. GuildCreate fires on
    /// every reconnect, so this saves a lookup per guild each time.
    settings: DashMap<u64, GuildSettings>,
}

impl<S: StatsStore> StatsService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            settings: DashMap::new(),
        }
    }

    pub async fn record_command(&self, user_id: u64, guild_id: u64) -> Result<(), StatsError> {
        self.record(user_id, guild_id, ActivityKind::Command).await
    }

    pub async fn record_message(&self, user_id: u64, guild_id: u64) -> Result<(), StatsError> {
        self.record(user_id, guild_id, ActivityKind::Message).await
    }

    async fn record(
        &self,
        user_id: u64,
        guild_id: u64,
        kind: ActivityKind,
    ) -> Result<(), StatsError> {
        self.store
            .record_activity(user_id, guild_id, kind, Utc::now())
            .await?;
        tracing::debug!(user_id, guild_id, column = kind.column(), "Recorded activity");
        Ok(())
    }

    /// Stats for a user, zeroed if they have never been seen in the guild.
    pub async fn user_stats(&self, user_id: u64, guild_id: u64) -> Result<UserStats, StatsError> {
        Ok(self
            .store
            .get_user_stats(user_id, guild_id)
            .await?
            .unwrap_or_else(|| UserStats::empty(user_id, guild_id)))
    }

    /// Returns the guild's settings, creating the defaults on first sight.
    pub async fn ensure_guild_settings(&self, guild_id: u64) -> Result<GuildSettings, StatsError> {
        if let Some(cached) = self.settings.get(&guild_id) {
            return Ok(cached.clone());
        }

        let settings = match self.store.get_guild_settings(guild_id).await? {
            Some(existing) => existing,
            None => {
                let settings = GuildSettings::defaults(guild_id);
                self.store.save_guild_settings(settings.clone()).await?;
                tracing::info!(guild_id, "Initialized guild settings");
                settings
            }
        };

        self.settings.insert(guild_id, settings.clone());
        Ok(settings)
    }
}

// ============================================================================
// TESTS
// ============================================================================
