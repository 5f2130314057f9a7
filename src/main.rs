// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (command sync, stats), platform-agnostic
// - `infra/` = Implementations of core traits (SQLite, Discord HTTP, JSON files)
// - `discord/` = Discord-specific adapters (commands, dispatch, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Sync slash commands before anything is dispatched
// 4. Run the gateway until shutdown

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::commands::CommandSynchronizer;
use crate::core::stats::StatsService;
use crate::discord::command_sync::initial_sync;
use crate::discord::{dispatcher, presence};
use crate::discord::{BotSynchronizer, Data, Error};
use crate::infra::commands::{CommandScope, SerenityCommandApi, SqliteCommandStore};
use crate::infra::stats::SqliteStatsStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

/// Event handler for non-command Discord events.
/// Slash commands arrive here too: poise has no commands of its own, so every
/// interaction goes through our dispatcher.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::InteractionCreate {
            interaction: serenity::Interaction::Command(command),
        } => {
            dispatcher::on_command_invoked(ctx, command, data).await;
        }
        serenity::FullEvent::Message { new_message } => {
            // Ignore bot messages (including our own)
            if new_message.author.bot {
                return Ok(());
            }

            // Only count guild messages (not DMs)
            if let Some(guild_id) = new_message.guild_id {
                if let Err(e) = data
                    .stats
                    .record_message(new_message.author.id.get(), guild_id.get())
                    .await
                {
                    tracing::error!("Failed to record message: {}", e);
                }
            }
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            if *is_new == Some(true) {
                tracing::info!(guild_id = guild.id.get(), name = %guild.name, "Joined new guild");
            }
            if let Err(e) = data.stats.ensure_guild_settings(guild.id.get()).await {
                tracing::error!(guild_id = guild.id.get(), "Failed to initialize guild settings: {}", e);
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            // Settings and stats are kept in case the bot is invited back.
            tracing::info!(guild_id = incomplete.id.get(), "Removed from guild");
        }
        _ => {}
    }

    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Setup {
            error, framework, ..
        } => {
            tracing::error!("Startup failed: {}", error);
            framework.shard_manager().shutdown_all().await;
        }
        // Interactions are routed by our own dispatcher.
        poise::FrameworkError::UnknownInteraction { .. } => {}
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Initialize logging so we can see what's happening; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BotConfig::from_env()?;

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir.display()
        )
    })?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let pool = infra::open_database(&config.database_path().to_string_lossy())
        .await
        .context("Failed to open bot database")?;

    let stats_store = SqliteStatsStore::new(pool.clone());
    stats_store
        .migrate()
        .await
        .context("Failed to migrate stats tables")?;
    let stats_service = Arc::new(StatsService::new(stats_store));

    // The sync runs against its own HTTP client so it can be built (and
    // waited on at shutdown) outside the gateway client.
    let http = Arc::new(serenity::Http::new(&config.token));
    let application = http
        .get_current_application_info()
        .await
        .context("Failed to fetch application info, is DISCORD_TOKEN valid?")?;
    http.set_application_id(application.id);

    let scope = match config.guild_id {
        Some(guild_id) => {
            tracing::info!(guild_id = guild_id.get(), "Registering commands in a single guild");
            CommandScope::Guild(guild_id)
        }
        None => CommandScope::Global,
    };

    let synchronizer: BotSynchronizer = CommandSynchronizer::new(
        Arc::new(SqliteCommandStore::new(pool)),
        Arc::new(SerenityCommandApi::new(Arc::clone(&http), scope)),
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MESSAGES;

    let setup_synchronizer = synchronizer.clone();
    let commands_dir = config.commands_dir.clone();
    let strict_sync = config.strict_sync;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Commands live in our registry, not in poise.
            commands: vec![],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, _framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Bot is starting up");

                // Nothing is dispatched until this returns, so handlers only
                // ever see a registry that has been synced once.
                let registry =
                    initial_sync(&setup_synchronizer, &commands_dir, strict_sync).await?;
                tracing::info!(commands = registry.len(), "Bot is ready");
                presence::on_ready(ctx);

                Ok(Data {
                    registry: Arc::new(RwLock::new(registry)),
                    synchronizer: setup_synchronizer,
                    stats: stats_service,
                    commands_dir,
                    started_at: Instant::now(),
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.context("Error running bot")?;

    // Let a cycle that is still writing the hash store finish first.
    synchronizer.wait_idle().await;
    tracing::info!("Bot stopped");
    Ok(())
}
