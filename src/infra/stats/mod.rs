pub mod sqlite_stats_store;

pub use sqlite_stats_store::SqliteStatsStore;
