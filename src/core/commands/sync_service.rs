// Command synchronization - reconciles the declared command set with the
// remote platform, using the hash store to skip work that is already done.
//
// One cycle runs four phases in order:
//   1. Load    - snapshot the registry, list persisted names
//   2. Diff    - hash compare -> unchanged / to_upsert / to_delete
//   3. Upsert  - one full-snapshot bulk call, persist the response atomically
//   4. Delete  - one remote list, then per-name delete + record removal
//
// Phases 3 and 4 run in a detached task that owns the cycle lock, so a caller
// that goes away mid-cycle cannot leave the hash store half written.

use super::command_models::CommandDefinition;
use super::command_registry::CommandRegistry;
use super::command_store::{CommandHashStore, CommandRecord, StorageError};
use super::remote_api::{RemoteApiError, RemoteCommandApi};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("bulk upsert failed for [{}]: {source}", .names.join(", "))]
    Remote {
        names: Vec<String>,
        source: RemoteApiError,
    },

    #[error("sync cycle did not complete: {0}")]
    Aborted(String),
}

// ============================================================================
// PLAN & REPORT
// ============================================================================

/// Result of the diff phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub unchanged: BTreeSet<String>,
    /// Name -> freshly computed hash.
    pub to_upsert: BTreeMap<String, String>,
    pub to_delete: BTreeSet<String>,
}

impl SyncPlan {
    /// Pure diff of declared `(name, hash)` pairs against stored hashes.
    ///
    /// `stored` holds the hash lookup for each declared name; `persisted` is
    /// every name the store knows about.
    pub fn compute<'a>(
        declared: impl IntoIterator<Item = (&'a str, &'a str)>,
        stored: &HashMap<String, Option<String>>,
        persisted: &BTreeSet<String>,
    ) -> Self {
        let mut plan = SyncPlan::default();
        let mut declared_names = HashSet::new();

        for (name, hash) in declared {
            declared_names.insert(name);
            match stored.get(name) {
                Some(Some(existing)) if existing == hash => {
                    plan.unchanged.insert(name.to_string());
                }
                _ => {
                    plan.to_upsert.insert(name.to_string(), hash.to_string());
                }
            }
        }

        plan.to_delete = persisted
            .iter()
            .filter(|name| !declared_names.contains(name.as_str()))
            .cloned()
            .collect();

        plan
    }

    pub fn is_noop(&self) -> bool {
        self.to_upsert.is_empty() && self.to_delete.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDeletion {
    pub name: String,
    pub reason: String,
}

/// What one cycle actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub unchanged: Vec<String>,
    pub upserted: Vec<String>,
    /// Changed commands the remote did not echo back; not persisted.
    pub unconfirmed: Vec<String>,
    pub deleted: Vec<String>,
    pub failed_deletions: Vec<FailedDeletion>,
    pub remote_calls: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.unconfirmed.is_empty() && self.failed_deletions.is_empty()
    }
}

// ============================================================================
// SYNCHRONIZER
// ============================================================================

/// A declared command frozen for one cycle.
#[derive(Debug, Clone)]
struct Snapshot {
    definition: CommandDefinition,
    content_hash: String,
}

pub struct CommandSynchronizer<S, R> {
    store: Arc<S>,
    remote: Arc<R>,
    cycle: Arc<Mutex<()>>,
}

impl<S, R> Clone for CommandSynchronizer<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            remote: Arc::clone(&self.remote),
            cycle: Arc::clone(&self.cycle),
        }
    }
}

impl<S, R> CommandSynchronizer<S, R>
where
    S: CommandHashStore + 'static,
    R: RemoteCommandApi + 'static,
{
    pub fn new(store: Arc<S>, remote: Arc<R>) -> Self {
        Self {
            store,
            remote,
            cycle: Arc::new(Mutex::new(())),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// True while a cycle holds the lock.
    pub fn is_running(&self) -> bool {
        self.cycle.try_lock().is_err()
    }

    /// Resolves once no cycle is in flight.
    pub async fn wait_idle(&self) {
        let _guard = self.cycle.lock().await;
    }

    /// Runs one reconciliation cycle for the commands in `registry`.
    ///
    /// Triggers that arrive while a cycle is running wait for it and then run
    /// against the state it left behind.
    pub async fn reconcile<H>(
        &self,
        registry: &CommandRegistry<H>,
    ) -> Result<SyncReport, SyncError> {
        let declared: Vec<Snapshot> = registry
            .commands()
            .map(|c| Snapshot {
                definition: c.definition.clone(),
                content_hash: c.content_hash.clone(),
            })
            .collect();

        let guard = Arc::clone(&self.cycle).lock_owned().await;

        // Phase 1 + 2: read-only, safe to abandon.
        let plan = self.plan(&declared).await?;
        tracing::debug!(
            unchanged = plan.unchanged.len(),
            to_upsert = plan.to_upsert.len(),
            to_delete = plan.to_delete.len(),
            "Computed command sync plan"
        );

        if plan.is_noop() {
            tracing::info!(
                commands = declared.len(),
                "No command changes detected, skipping registration"
            );
            return Ok(SyncReport {
                unchanged: plan.unchanged.into_iter().collect(),
                ..Default::default()
            });
        }

        let store = Arc::clone(&self.store);
        let remote = Arc::clone(&self.remote);
        let apply = tokio::spawn(async move {
            let _guard = guard;
            apply_plan(store.as_ref(), remote.as_ref(), &declared, plan).await
        });

        apply
            .await
            .map_err(|e| SyncError::Aborted(e.to_string()))?
    }

    async fn plan(&self, declared: &[Snapshot]) -> Result<SyncPlan, SyncError> {
        let persisted = self.store.list_names().await?;

        let mut stored = HashMap::with_capacity(declared.len());
        for entry in declared {
            let name = &entry.definition.name;
            stored.insert(name.clone(), self.store.get(name).await?);
        }

        Ok(SyncPlan::compute(
            declared
                .iter()
                .map(|e| (e.definition.name.as_str(), e.content_hash.as_str())),
            &stored,
            &persisted,
        ))
    }
}

async fn apply_plan<S, R>(
    store: &S,
    remote: &R,
    declared: &[Snapshot],
    plan: SyncPlan,
) -> Result<SyncReport, SyncError>
where
    S: CommandHashStore + ?Sized,
    R: RemoteCommandApi + ?Sized,
{
    let mut report = SyncReport {
        unchanged: plan.unchanged.iter().cloned().collect(),
        ..Default::default()
    };

    // Phase 3: the endpoint replaces the whole remote set, so the payload is
    // every declared command, not just the changed ones.
    if !plan.to_upsert.is_empty() {
        let payload: Vec<CommandDefinition> =
            declared.iter().map(|e| e.definition.clone()).collect();
        tracing::info!(
            changed = plan.to_upsert.len(),
            total = payload.len(),
            "Registering commands"
        );

        report.remote_calls += 1;
        let confirmed = remote
            .bulk_upsert(&payload)
            .await
            .map_err(|source| SyncError::Remote {
                names: plan.to_upsert.keys().cloned().collect(),
                source,
            })?;

        let hashes: HashMap<&str, &str> = declared
            .iter()
            .map(|e| (e.definition.name.as_str(), e.content_hash.as_str()))
            .collect();

        let mut records = Vec::with_capacity(confirmed.len());
        for item in confirmed {
            match hashes.get(item.name.as_str()) {
                Some(hash) => records.push(CommandRecord::new(item.name, *hash, item.remote_id)),
                None => tracing::warn!(
                    name = %item.name,
                    "Remote returned a command that is not declared locally"
                ),
            }
        }

        store.upsert_all(&records).await?;

        let written: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
        for name in plan.to_upsert.keys() {
            if written.contains(name.as_str()) {
                tracing::info!(name = %name, "Updated command");
                report.upserted.push(name.clone());
            } else {
                tracing::warn!(name = %name, "Command missing from bulk upsert response");
                report.unconfirmed.push(name.clone());
            }
        }
    }

    // Phase 4: each deletion stands alone; a failure is logged and the record
    // is kept for the next cycle.
    if !plan.to_delete.is_empty() {
        report.remote_calls += 1;
        match remote.list().await {
            Ok(remote_commands) => {
                for name in &plan.to_delete {
                    if let Some(found) = remote_commands.iter().find(|c| &c.name == name) {
                        report.remote_calls += 1;
                        if let Err(err) = remote.delete(&found.remote_id).await {
                            tracing::warn!(name = %name, "Failed to remove command remotely: {}", err);
                            report.failed_deletions.push(FailedDeletion {
                                name: name.clone(),
                                reason: err.to_string(),
                            });
                            continue;
                        }
                        tracing::info!(name = %name, "Removed command from remote API");
                    } else {
                        tracing::debug!(name = %name, "Command already absent remotely");
                    }

                    store.delete(name).await?;
                    tracing::info!(name = %name, "Removed command from hash store");
                    report.deleted.push(name.clone());
                }
            }
            Err(err) => {
                tracing::warn!("Failed to list remote commands, deletions deferred: {}", err);
                report
                    .failed_deletions
                    .extend(plan.to_delete.iter().map(|name| FailedDeletion {
                        name: name.clone(),
                        reason: err.to_string(),
                    }));
            }
        }
    }

    tracing::info!(
        unchanged = report.unchanged.len(),
        upserted = report.upserted.len(),
        deleted = report.deleted.len(),
        failed = report.failed_deletions.len(),
        "Command sync finished"
    );
    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commands::command_models::content_hash;
    use crate::core::commands::command_registry::{CommandSource, DeclaredCommand, LoadError};
    use crate::core::commands::remote_api::RemoteCommand;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    // Simple in-memory store for testing
    #[derive(Default)]
    struct MockStore {
        records: StdMutex<BTreeMap<String, CommandRecord>>,
        fail_listing: bool,
    }

    impl MockStore {
        fn with(records: &[CommandRecord]) -> Self {
            let store = Self::default();
            {
                let mut map = store.records.lock().unwrap();
                for r in records {
                    map.insert(r.name.clone(), r.clone());
                }
            }
            store
        }

        fn snapshot(&self) -> BTreeMap<String, CommandRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandHashStore for MockStore {
        async fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(name)
                .map(|r| r.content_hash.clone()))
        }

        async fn get_record(&self, name: &str) -> Result<Option<CommandRecord>, StorageError> {
            Ok(self.records.lock().unwrap().get(name).cloned())
        }

        async fn upsert(&self, record: &CommandRecord) -> Result<(), StorageError> {
            self.records
                .lock()
                .unwrap()
                .insert(record.name.clone(), record.clone());
            Ok(())
        }

        async fn upsert_all(&self, records: &[CommandRecord]) -> Result<(), StorageError> {
            let mut map = self.records.lock().unwrap();
            for r in records {
                map.insert(r.name.clone(), r.clone());
            }
            Ok(())
        }

        async fn list_names(&self) -> Result<BTreeSet<String>, StorageError> {
            if self.fail_listing {
                return Err(StorageError::Backend("disk on fire".to_string()));
            }
            Ok(self.records.lock().unwrap().keys().cloned().collect())
        }

        async fn delete(&self, name: &str) -> Result<(), StorageError> {
            self.records.lock().unwrap().remove(name);
            Ok(())
        }
    }

    /// Holds the bulk upsert until the test releases it.
    #[derive(Default)]
    struct Gate {
        started: Notify,
        release: Notify,
    }

    #[derive(Default)]
    struct MockRemote {
        commands: StdMutex<Vec<RemoteCommand>>,
        payloads: StdMutex<Vec<Vec<String>>>,
        upserts: AtomicUsize,
        lists: AtomicUsize,
        deletes: StdMutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        next_id: AtomicUsize,
        fail_upsert: bool,
        fail_list: bool,
        fail_delete_for: Option<String>,
        drop_from_response: Option<String>,
        gate: Option<Gate>,
    }

    impl MockRemote {
        fn with_commands(names: &[(&str, &str)]) -> Self {
            let remote = Self::default();
            *remote.commands.lock().unwrap() = names
                .iter()
                .map(|(name, id)| RemoteCommand {
                    name: name.to_string(),
                    remote_id: id.to_string(),
                })
                .collect();
            remote
        }

        fn total_calls(&self) -> usize {
            self.upserts.load(Ordering::SeqCst)
                + self.lists.load(Ordering::SeqCst)
                + self.deletes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RemoteCommandApi for MockRemote {
        async fn bulk_upsert(
            &self,
            commands: &[CommandDefinition],
        ) -> Result<Vec<RemoteCommand>, RemoteApiError> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                gate.started.notify_one();
                gate.release.notified().await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.payloads
                .lock()
                .unwrap()
                .push(commands.iter().map(|c| c.name.clone()).collect());

            if self.fail_upsert {
                return Err(RemoteApiError::Request("connection reset".to_string()));
            }

            let registered: Vec<RemoteCommand> = commands
                .iter()
                .map(|c| RemoteCommand {
                    name: c.name.clone(),
                    remote_id: format!("id-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
                })
                .collect();
            *self.commands.lock().unwrap() = registered.clone();

            Ok(registered
                .into_iter()
                .filter(|c| Some(&c.name) != self.drop_from_response.as_ref())
                .collect())
        }

        async fn list(&self) -> Result<Vec<RemoteCommand>, RemoteApiError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            if self.fail_list {
                return Err(RemoteApiError::Request("502 Bad Gateway".to_string()));
            }
            Ok(self.commands.lock().unwrap().clone())
        }

        async fn delete(&self, remote_id: &str) -> Result<(), RemoteApiError> {
            self.deletes.lock().unwrap().push(remote_id.to_string());
            let mut commands = self.commands.lock().unwrap();
            let name = commands
                .iter()
                .find(|c| c.remote_id == remote_id)
                .map(|c| c.name.clone());
            if name.is_some() && name == self.fail_delete_for {
                return Err(RemoteApiError::Request("missing access".to_string()));
            }
            commands.retain(|c| c.remote_id != remote_id);
            Ok(())
        }
    }

    struct Defs(Vec<CommandDefinition>);

    impl CommandSource<()> for Defs {
        fn discover(&self) -> Vec<Result<DeclaredCommand<()>, LoadError>> {
            self.0
                .iter()
                .map(|d| {
                    Ok(DeclaredCommand {
                        origin: format!("{}.rs", d.name),
                        definition: d.clone(),
                        handler: (),
                    })
                })
                .collect()
        }
    }

    fn ping() -> CommandDefinition {
        CommandDefinition::new("ping", "Check the bot's latency")
    }

    fn info() -> CommandDefinition {
        CommandDefinition::new("info", "Get information about the bot or server")
    }

    fn registry(defs: Vec<CommandDefinition>) -> CommandRegistry<()> {
        let (registry, errors) = CommandRegistry::from_source(&Defs(defs));
        assert!(errors.is_empty());
        registry
    }

    fn record(def: &CommandDefinition, id: &str) -> CommandRecord {
        CommandRecord::new(def.name.clone(), content_hash(def).unwrap(), id)
    }

    fn synchronizer(
        store: MockStore,
        remote: MockRemote,
    ) -> (
        CommandSynchronizer<MockStore, MockRemote>,
        Arc<MockStore>,
        Arc<MockRemote>,
    ) {
        let store = Arc::new(store);
        let remote = Arc::new(remote);
        (
            CommandSynchronizer::new(Arc::clone(&store), Arc::clone(&remote)),
            store,
            remote,
        )
    }

    #[test]
    fn test_plan_partitions_names() {
        let stored: HashMap<String, Option<String>> = [
            ("ping".to_string(), Some("h1".to_string())),
            ("info".to_string(), Some("old".to_string())),
            ("help".to_string(), None),
        ]
        .into_iter()
        .collect();
        let persisted: BTreeSet<String> = ["ping", "info", "stats", "legacy"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let plan = SyncPlan::compute(
            vec![("ping", "h1"), ("info", "h2"), ("help", "h3")],
            &stored,
            &persisted,
        );

        assert_eq!(plan.unchanged, BTreeSet::from(["ping".to_string()]));
        assert_eq!(
            plan.to_upsert.keys().cloned().collect::<Vec<_>>(),
            vec!["help".to_string(), "info".to_string()]
        );
        assert_eq!(plan.to_upsert["info"], "h2");
        assert_eq!(
            plan.to_delete,
            BTreeSet::from(["legacy".to_string(), "stats".to_string()])
        );

        // unchanged and to_upsert cover the declared set exactly once.
        let mut covered: Vec<&String> = plan.unchanged.iter().chain(plan.to_upsert.keys()).collect();
        covered.sort();
        assert_eq!(covered, vec!["help", "info", "ping"]);
    }

    #[test]
    fn test_plan_empty_inputs_is_noop() {
        let plan = SyncPlan::compute(Vec::<(&str, &str)>::new(), &HashMap::new(), &BTreeSet::new());
        assert!(plan.is_noop());
    }

    #[tokio::test]
    async fn test_first_sync_registers_everything_in_one_call() {
        let (sync, store, remote) = synchronizer(MockStore::default(), MockRemote::default());

        let report = sync.reconcile(&registry(vec![ping(), info()])).await.unwrap();

        assert_eq!(remote.upserts.load(Ordering::SeqCst), 1);
        assert_eq!(remote.lists.load(Ordering::SeqCst), 0);
        assert!(remote.deletes.lock().unwrap().is_empty());
        assert_eq!(report.upserted, vec!["info".to_string(), "ping".to_string()]);

        let records = store.snapshot();
        assert_eq!(records.len(), 2);
        assert_eq!(records["ping"].content_hash, content_hash(&ping()).unwrap());
        assert!(records["ping"].remote_id.starts_with("id-"));
    }

    #[tokio::test]
    async fn test_unchanged_commands_make_no_calls() {
        let store = MockStore::with(&[record(&ping(), "1"), record(&info(), "2")]);
        let (sync, store, remote) = synchronizer(store, MockRemote::default());
        let before = store.snapshot();

        let report = sync.reconcile(&registry(vec![ping(), info()])).await.unwrap();

        assert_eq!(remote.total_calls(), 0);
        assert_eq!(report.remote_calls, 0);
        assert_eq!(report.unchanged.len(), 2);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let (sync, store, remote) = synchronizer(MockStore::default(), MockRemote::default());
        let reg = registry(vec![ping(), info()]);

        sync.reconcile(&reg).await.unwrap();
        let after_first = store.snapshot();
        let calls_after_first = remote.total_calls();

        let report = sync.reconcile(&reg).await.unwrap();

        assert_eq!(remote.total_calls(), calls_after_first);
        assert_eq!(report.remote_calls, 0);
        assert_eq!(store.snapshot(), after_first);
    }

    #[tokio::test]
    async fn test_changed_command_sends_full_snapshot() {
        let store = MockStore::with(&[record(&ping(), "1"), record(&info(), "2")]);
        let (sync, store, remote) = synchronizer(store, MockRemote::default());

        let new_info = CommandDefinition::new("info", "Information about the bot");
        let report = sync
            .reconcile(&registry(vec![ping(), new_info.clone()]))
            .await
            .unwrap();

        // Only info changed, but the replace-all endpoint gets both.
        assert_eq!(report.upserted, vec!["info".to_string()]);
        assert_eq!(report.unchanged, vec!["ping".to_string()]);
        assert_eq!(
            remote.payloads.lock().unwrap()[0],
            vec!["ping".to_string(), "info".to_string()]
        );
        assert_eq!(
            store.snapshot()["info"].content_hash,
            content_hash(&new_info).unwrap()
        );
    }

    #[tokio::test]
    async fn test_removed_command_is_deleted_remotely_and_locally() {
        let stats = CommandDefinition::new("stats", "View statistics");
        let store = MockStore::with(&[record(&ping(), "1"), record(&stats, "3")]);
        let remote = MockRemote::with_commands(&[("ping", "1"), ("stats", "3")]);
        let (sync, store, remote) = synchronizer(store, remote);

        let report = sync.reconcile(&registry(vec![ping()])).await.unwrap();

        assert_eq!(remote.upserts.load(Ordering::SeqCst), 0);
        assert_eq!(remote.lists.load(Ordering::SeqCst), 1);
        assert_eq!(*remote.deletes.lock().unwrap(), vec!["3".to_string()]);
        assert_eq!(report.deleted, vec!["stats".to_string()]);
        assert!(!store.snapshot().contains_key("stats"));
    }

    #[tokio::test]
    async fn test_removed_command_already_gone_remotely() {
        let stats = CommandDefinition::new("stats", "View statistics");
        let store = MockStore::with(&[record(&ping(), "1"), record(&stats, "3")]);
        let remote = MockRemote::with_commands(&[("ping", "1")]);
        let (sync, store, remote) = synchronizer(store, remote);

        let report = sync.reconcile(&registry(vec![ping()])).await.unwrap();

        assert!(remote.deletes.lock().unwrap().is_empty());
        assert_eq!(report.deleted, vec!["stats".to_string()]);
        assert!(report.is_clean());
        assert_eq!(store.snapshot().keys().collect::<Vec<_>>(), vec!["ping"]);
    }

    #[tokio::test]
    async fn test_failed_bulk_upsert_leaves_store_untouched() {
        let store = MockStore::with(&[record(&ping(), "1")]);
        let remote = MockRemote {
            fail_upsert: true,
            ..Default::default()
        };
        let (sync, store, _remote) = synchronizer(store, remote);
        let before = store.snapshot();

        let err = sync
            .reconcile(&registry(vec![ping(), info()]))
            .await
            .unwrap_err();

        match err {
            SyncError::Remote { names, .. } => assert_eq!(names, vec!["info".to_string()]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_failed_deletion_does_not_block_others() {
        let stats = CommandDefinition::new("stats", "View statistics");
        let help = CommandDefinition::new("help", "Help");
        let store = MockStore::with(&[
            record(&ping(), "1"),
            record(&stats, "3"),
            record(&help, "4"),
        ]);
        let remote = MockRemote {
            fail_delete_for: Some("help".to_string()),
            ..MockRemote::with_commands(&[("ping", "1"), ("stats", "3"), ("help", "4")])
        };
        let (sync, store, _remote) = synchronizer(store, remote);

        let report = sync.reconcile(&registry(vec![ping()])).await.unwrap();

        assert_eq!(report.deleted, vec!["stats".to_string()]);
        assert_eq!(report.failed_deletions.len(), 1);
        assert_eq!(report.failed_deletions[0].name, "help");
        // Kept so the next cycle retries it.
        assert!(store.snapshot().contains_key("help"));
        assert!(!store.snapshot().contains_key("stats"));
    }

    #[tokio::test]
    async fn test_failed_listing_defers_every_deletion() {
        let stats = CommandDefinition::new("stats", "View statistics");
        let store = MockStore::with(&[record(&ping(), "1"), record(&stats, "3")]);
        let remote = MockRemote {
            fail_list: true,
            ..MockRemote::with_commands(&[("ping", "1"), ("stats", "3")])
        };
        let (sync, store, remote) = synchronizer(store, remote);

        let report = sync.reconcile(&registry(vec![ping()])).await.unwrap();

        assert_eq!(report.remote_calls, 1);
        assert!(remote.deletes.lock().unwrap().is_empty());
        assert!(report.deleted.is_empty());
        let failed: Vec<_> = report.failed_deletions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(failed, vec!["stats"]);
        assert_eq!(
            store.snapshot().keys().collect::<Vec<_>>(),
            vec!["ping", "stats"]
        );
    }

    #[tokio::test]
    async fn test_unconfirmed_items_are_not_persisted() {
        let remote = MockRemote {
            drop_from_response: Some("info".to_string()),
            ..Default::default()
        };
        let (sync, store, _remote) = synchronizer(MockStore::default(), remote);

        let report = sync.reconcile(&registry(vec![ping(), info()])).await.unwrap();

        assert_eq!(report.unconfirmed, vec!["info".to_string()]);
        assert!(!report.is_clean());
        assert_eq!(store.snapshot().keys().collect::<Vec<_>>(), vec!["ping"]);
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_before_any_call() {
        let store = MockStore {
            fail_listing: true,
            ..Default::default()
        };
        let (sync, _store, remote) = synchronizer(store, MockRemote::default());

        let err = sync.reconcile(&registry(vec![ping()])).await.unwrap_err();

        assert!(matches!(err, SyncError::Storage(_)));
        assert_eq!(remote.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_caller_still_finishes_apply() {
        let remote = MockRemote {
            gate: Some(Gate::default()),
            ..Default::default()
        };
        let (sync, store, remote) = synchronizer(MockStore::default(), remote);

        let caller = {
            let sync = sync.clone();
            let reg = registry(vec![ping(), info()]);
            tokio::spawn(async move { sync.reconcile(&reg).await })
        };

        let gate = remote.gate.as_ref().unwrap();
        gate.started.notified().await;
        caller.abort();
        let _ = caller.await;
        gate.release.notify_one();

        sync.wait_idle().await;
        assert_eq!(store.snapshot().len(), 2);
        assert!(!sync.is_running());
    }

    #[tokio::test]
    async fn test_concurrent_triggers_do_not_overlap() {
        let remote = MockRemote {
            gate: Some(Gate::default()),
            ..Default::default()
        };
        let (sync, _store, remote) = synchronizer(MockStore::default(), remote);
        let reg = registry(vec![ping(), info()]);

        let release = async {
            let gate = remote.gate.as_ref().unwrap();
            gate.started.notified().await;
            gate.release.notify_one();
        };

        let (first, second, _) = tokio::join!(sync.reconcile(&reg), sync.reconcile(&reg), release);

        let mut reports = vec![first.unwrap(), second.unwrap()];
        reports.sort_by_key(|r| r.remote_calls);
        assert_eq!(reports[0].remote_calls, 0);
        assert_eq!(reports[1].remote_calls, 1);
        assert_eq!(remote.upserts.load(Ordering::SeqCst), 1);
        assert_eq!(remote.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
