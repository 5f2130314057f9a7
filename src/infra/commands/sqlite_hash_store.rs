// SQLite implementation of the CommandHashStore trait

use crate::core::commands::{CommandHashStore, CommandRecord, StorageError};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::collections::BTreeSet;
use tokio::sync::OnceCell;

pub struct SqliteCommandStore {
    pool: SqlitePool,
    schema: OnceCell<()>,
}

impl SqliteCommandStore {
    /// Wrap an existing pool. The table is created on first use.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            schema: OnceCell::new(),
        }
    }

    async fn ready(&self) -> Result<(), StorageError> {
        self.schema
            .get_or_try_init(|| self.migrate())
            .await
            .map(|_| ())
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS slash_commands (
                name TEXT PRIMARY KEY,
                hash TEXT NOT NULL,
                command_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        tracing::debug!("slash_commands table ready");
        Ok(())
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO slash_commands (name, hash, command_id, updated_at)
    VALUES (?, ?, ?, CURRENT_TIMESTAMP)
    ON CONFLICT(name) DO UPDATE SET
        hash = excluded.hash,
        command_id = excluded.command_id,
        updated_at = CURRENT_TIMESTAMP
"#;

#[async_trait]
impl CommandHashStore for SqliteCommandStore {
    async fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        self.ready().await?;
        let row = sqlx::query("SELECT hash FROM slash_commands WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::for_command(name, e))?;

        Ok(row.map(|row| row.get::<String, _>("hash")))
    }

    async fn get_record(&self, name: &str) -> Result<Option<CommandRecord>, StorageError> {
        self.ready().await?;
        let row = sqlx::query("SELECT name, hash, command_id FROM slash_commands WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::for_command(name, e))?;

        Ok(row.map(|row| CommandRecord {
            name: row.get("name"),
            content_hash: row.get("hash"),
            remote_id: row.get("command_id"),
        }))
    }

    async fn upsert(&self, record: &CommandRecord) -> Result<(), StorageError> {
        self.ready().await?;
        sqlx::query(UPSERT_SQL)
            .bind(&record.name)
            .bind(&record.content_hash)
            .bind(&record.remote_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::for_command(&record.name, e))?;

        tracing::debug!(name = %record.name, "Stored command hash");
        Ok(())
    }

    async fn upsert_all(&self, records: &[CommandRecord]) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }
        self.ready().await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        for record in records {
            sqlx::query(UPSERT_SQL)
                .bind(&record.name)
                .bind(&record.content_hash)
                .bind(&record.remote_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::for_command(&record.name, e))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        tracing::debug!(count = records.len(), "Stored command hashes");
        Ok(())
    }

    async fn list_names(&self) -> Result<BTreeSet<String>, StorageError> {
        self.ready().await?;
        let rows = sqlx::query("SELECT name FROM slash_commands")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.ready().await?;
        sqlx::query("DELETE FROM slash_commands WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::for_command(name, e))?;

        tracing::debug!(name, "Deleted command hash");
        Ok(())
    }
}
