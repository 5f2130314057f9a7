// Glue between the Discord layer and the command synchronizer.
//
// Loading a registry and reconciling it always go together: the live registry
// is only replaced once its cycle has finished, so dispatch never sees a
// command set that the platform has not been told about.

use crate::core::commands::{
    CommandHashStore, CommandRegistry, CommandSynchronizer, LoadError, RemoteCommandApi,
    SyncError, SyncReport,
};
use crate::discord::commands::{command_sources, BotRegistry, Data};
use std::path::Path;
use tokio::sync::RwLock;

/// What a reload did: the entries that were skipped and the sync report.
#[derive(Debug)]
pub struct ReloadOutcome {
    pub load_errors: Vec<LoadError>,
    pub report: SyncReport,
}

/// Builds a fresh registry from the built-ins and the custom command directory.
pub fn load_registry(commands_dir: &Path) -> (BotRegistry, Vec<LoadError>) {
    BotRegistry::from_source(&command_sources(commands_dir.to_path_buf()))
}

/// Startup reconciliation. Runs before any interaction is dispatched.
///
/// With `strict` unset a failed cycle is logged and the freshly loaded
/// registry is still returned, so the bot keeps serving whatever the platform
/// already has registered.
pub async fn initial_sync<S, R>(
    synchronizer: &CommandSynchronizer<S, R>,
    commands_dir: &Path,
    strict: bool,
) -> Result<BotRegistry, SyncError>
where
    S: CommandHashStore + 'static,
    R: RemoteCommandApi + 'static,
{
    let (registry, load_errors) = load_registry(commands_dir);
    if !load_errors.is_empty() {
        tracing::warn!(
            rejected = load_errors.len(),
            "Some commands were skipped while loading"
        );
    }

    match synchronizer.reconcile(&registry).await {
        Ok(report) => {
            log_report(&report);
            Ok(registry)
        }
        Err(err) if strict => Err(err),
        Err(err) => {
            tracing::error!("Initial command sync failed, continuing: {}", err);
            Ok(registry)
        }
    }
}

/// Reloads every definition source and reconciles, as `/resync` does.
pub async fn reload_and_sync(data: &Data) -> Result<ReloadOutcome, SyncError> {
    sync_and_swap(
        &data.registry,
        &data.synchronizer,
        load_registry(&data.commands_dir),
    )
    .await
}

/// Reconciles `loaded` and, only if the cycle succeeds, installs it as the
/// live registry. On failure the previous registry stays in place.
pub async fn sync_and_swap<H, S, R>(
    live: &RwLock<CommandRegistry<H>>,
    synchronizer: &CommandSynchronizer<S, R>,
    loaded: (CommandRegistry<H>, Vec<LoadError>),
) -> Result<ReloadOutcome, SyncError>
where
    H: Send + Sync,
    S: CommandHashStore + 'static,
    R: RemoteCommandApi + 'static,
{
    let (registry, load_errors) = loaded;
    let report = synchronizer.reconcile(&registry).await?;
    log_report(&report);

    *live.write().await = registry;
    Ok(ReloadOutcome {
        load_errors,
        report,
    })
}

fn log_report(report: &SyncReport) {
    if report.is_clean() {
        tracing::info!(
            unchanged = report.unchanged.len(),
            upserted = report.upserted.len(),
            deleted = report.deleted.len(),
            remote_calls = report.remote_calls,
            "Command sync complete"
        );
    } else {
        tracing::warn!(
            unconfirmed = ?report.unconfirmed,
            failed_deletions = report.failed_deletions.len(),
            "Command sync finished with leftovers"
        );
    }
}
