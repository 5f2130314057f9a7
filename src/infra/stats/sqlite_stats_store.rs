use crate::core::stats::{ActivityKind, GuildSettings, StatsStore, StatsStoreError, UserStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteStatsStore {
    pool: Pool<Sqlite>,
}

fn db_error(e: sqlx::Error) -> StatsStoreError {
    StatsStoreError::Database(e.to_string())
}

impl SqliteStatsStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_stats (
                user_id INTEGER NOT NULL,
                guild_id INTEGER NOT NULL,
                commands_used INTEGER NOT NULL DEFAULT 0,
                messages_sent INTEGER NOT NULL DEFAULT 0,
                last_active TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, guild_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS guild_settings (
                guild_id INTEGER PRIMARY KEY,
                prefix TEXT NOT NULL DEFAULT '!',
                welcome_channel_id INTEGER,
                log_channel_id INTEGER,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    async fn record_activity(
        &self,
        user_id: u64,
        guild_id: u64,
        kind: ActivityKind,
        at: DateTime<Utc>,
    ) -> Result<(), StatsStoreError> {
        // Column names come from a closed enum, never from user input.
        let column = kind.column();
        let sql = format!(
            r#"
            INSERT INTO user_stats (user_id, guild_id, {column}, last_active)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(user_id, guild_id) DO UPDATE SET
                {column} = user_stats.{column} + 1,
                last_active = excluded.last_active,
                updated_at = CURRENT_TIMESTAMP
            "#
        );

        sqlx::query(&sql)
            .bind(user_id as i64)
            .bind(guild_id as i64)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn get_user_stats(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Option<UserStats>, StatsStoreError> {
        let row = sqlx::query(
            "SELECT commands_used, messages_sent, last_active FROM user_stats WHERE user_id = ? AND guild_id = ?",
        )
        .bind(user_id as i64)
        .bind(guild_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|row| UserStats {
            user_id,
            guild_id,
            commands_used: row.get::<i64, _>("commands_used") as u64,
            messages_sent: row.get::<i64, _>("messages_sent") as u64,
            last_active: row.get::<Option<DateTime<Utc>>, _>("last_active"),
        }))
    }

    async fn get_guild_settings(
        &self,
        guild_id: u64,
    ) -> Result<Option<GuildSettings>, StatsStoreError> {
        let row = sqlx::query("SELECT * FROM guild_settings WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|row| GuildSettings {
            guild_id,
            prefix: row.get("prefix"),
            welcome_channel_id: row
                .get::<Option<i64>, _>("welcome_channel_id")
                .map(|id| id as u64),
            log_channel_id: row
                .get::<Option<i64>, _>("log_channel_id")
                .map(|id| id as u64),
        }))
    }

    async fn save_guild_settings(&self, settings: GuildSettings) -> Result<(), StatsStoreError> {
        sqlx::query(
            r#"
            INSERT INTO guild_settings (guild_id, prefix, welcome_channel_id, log_channel_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                prefix = excluded.prefix,
                welcome_channel_id = excluded.welcome_channel_id,
                log_channel_id = excluded.log_channel_id,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(settings.guild_id as i64)
        .bind(settings.prefix)
        .bind(settings.welcome_channel_id.map(|id| id as i64))
        .bind(settings.log_channel_id.map(|id| id as i64))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteStatsStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteStatsStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_activity_counters_accumulate() {
        let store = store().await;
        let now = Utc::now();

        store
            .record_activity(1, 10, ActivityKind::Command, now)
            .await
            .unwrap();
        store
            .record_activity(1, 10, ActivityKind::Command, now)
            .await
            .unwrap();
        store
            .record_activity(1, 10, ActivityKind::Message, now)
            .await
            .unwrap();

        let stats = store.get_user_stats(1, 10).await.unwrap().unwrap();
        assert_eq!(stats.commands_used, 2);
        assert_eq!(stats.messages_sent, 1);
        assert!(stats.last_active.is_some());

        assert!(store.get_user_stats(2, 10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guild_settings_roundtrip() {
        let store = store().await;
        assert!(store.get_guild_settings(7).await.unwrap().is_none());

        let settings = GuildSettings {
            welcome_channel_id: Some(99),
            ..GuildSettings::defaults(7)
        };
        store.save_guild_settings(settings.clone()).await.unwrap();

        assert_eq!(store.get_guild_settings(7).await.unwrap(), Some(settings));
    }
}
