pub mod stats_models;
pub mod stats_service;
pub mod stats_store;

pub use stats_models::{ActivityKind, GuildSettings, UserStats};
pub use stats_service::{StatsError, StatsService};
pub use stats_store::{StatsStore, StatsStoreError};
