// Discord commands module.
// Each command gets its own file exposing a `definition()` and a handler.
//
// Commands are not poise commands: their definitions feed the registry, and
// the registry (not poise) decides what gets registered and dispatched.

pub mod custom;
pub mod info;
pub mod ping;
pub mod resync;
pub mod stats;

use crate::core::commands::{
    CommandRegistry, CommandSource, CommandSynchronizer, DeclaredCommand, LoadError,
};
use crate::core::stats::StatsService;
use crate::infra::commands::{SerenityCommandApi, SqliteCommandStore};
use crate::infra::stats::SqliteStatsStore;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A slash command handler. Handlers own their reply to the interaction.
#[async_trait]
pub trait SlashCommand: Send + Sync {
    async fn run(
        &self,
        ctx: &serenity::Context,
        interaction: &serenity::CommandInteraction,
        data: &Data,
    ) -> Result<(), Error>;
}

pub type CommandHandler = Arc<dyn SlashCommand>;
pub type BotRegistry = CommandRegistry<CommandHandler>;
pub type BotSynchronizer = CommandSynchronizer<SqliteCommandStore, SerenityCommandApi>;

/// Shared state handed to every event and command.
pub struct Data {
    pub registry: Arc<RwLock<BotRegistry>>,
    pub synchronizer: BotSynchronizer,
    pub stats: Arc<StatsService<SqliteStatsStore>>,
    pub commands_dir: PathBuf,
    pub started_at: Instant,
}

// ============================================================================
// DEFINITION SOURCES
// ============================================================================

/// Commands compiled into the bot.
pub struct BuiltinCommands;

impl CommandSource<CommandHandler> for BuiltinCommands {
    fn discover(&self) -> Vec<Result<DeclaredCommand<CommandHandler>, LoadError>> {
        let builtin = |origin: &str, definition, handler: CommandHandler| {
            Ok(DeclaredCommand {
                origin: format!("builtin:{origin}"),
                definition,
                handler,
            })
        };

        vec![
            builtin("ping", ping::definition(), Arc::new(ping::Ping)),
            builtin("info", info::definition(), Arc::new(info::Info)),
            builtin("stats", stats::definition(), Arc::new(stats::Stats)),
            builtin("resync", resync::definition(), Arc::new(resync::Resync)),
        ]
    }
}

/// Built-ins first, then the custom command directory.
pub fn command_sources(
    commands_dir: PathBuf,
) -> Vec<Box<dyn CommandSource<CommandHandler> + Send + Sync>> {
    vec![
        Box::new(BuiltinCommands),
        Box::new(custom::CustomCommands::new(commands_dir)),
    ]
}

// ============================================================================
// REPLY HELPERS
// ============================================================================

pub async fn reply(
    ctx: &serenity::Context,
    interaction: &serenity::CommandInteraction,
    content: impl Into<String>,
    ephemeral: bool,
) -> Result<(), Error> {
    let message = serenity::CreateInteractionResponseMessage::new()
        .content(content)
        .ephemeral(ephemeral);
    interaction
        .create_response(&ctx.http, serenity::CreateInteractionResponse::Message(message))
        .await?;
    Ok(())
}

/// Human-readable duration like `3h 12m`.
pub fn format_uptime(elapsed: std::time::Duration) -> String {
    let minutes = elapsed.as_secs() / 60;
    let (days, hours, minutes) = (minutes / 1440, (minutes / 60) % 24, minutes % 60);
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else {
        format!("{hours}h {minutes}m")
    }
}
