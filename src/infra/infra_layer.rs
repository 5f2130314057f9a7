// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

#[path = "commands/mod.rs"]
pub mod commands;

#[path = "stats/mod.rs"]
pub mod stats;

/// Open (creating if needed) the bot's SQLite database file.
pub async fn open_database(database_path: &str) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("sqlite://{}?mode=rwc", database_path))
        .await?;
    Ok(pool)
}
