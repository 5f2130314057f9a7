// In-memory implementation of CommandHashStore.
//
// Nothing survives a restart, so every boot looks like a first sync. Used by
// tests that exercise the synchronizer end to end without SQLite.

use crate::core::commands::{CommandHashStore, CommandRecord, StorageError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;

/// Maps command name -> last synced record.
#[derive(Default)]
pub struct InMemoryCommandStore {
    records: DashMap<String, CommandRecord>,
}

impl InMemoryCommandStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommandHashStore for InMemoryCommandStore {
    async fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .records
            .get(name)
            .map(|entry| entry.content_hash.clone()))
    }

    async fn get_record(&self, name: &str) -> Result<Option<CommandRecord>, StorageError> {
        Ok(self.records.get(name).map(|entry| entry.clone()))
    }

    async fn upsert(&self, record: &CommandRecord) -> Result<(), StorageError> {
        self.records.insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn upsert_all(&self, records: &[CommandRecord]) -> Result<(), StorageError> {
        // Inserts cannot fail here, so the batch is trivially all-or-nothing.
        for record in records {
            self.records.insert(record.name.clone(), record.clone());
        }
        Ok(())
    }

    async fn list_names(&self) -> Result<BTreeSet<String>, StorageError> {
        Ok(self.records.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.records.remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_overwrites_and_delete_is_idempotent() {
        let store = InMemoryCommandStore::new();
        assert_eq!(store.get("ping").await.unwrap(), None);

        store
            .upsert(&CommandRecord::new("ping", "aaa", "1"))
            .await
            .unwrap();
        store
            .upsert(&CommandRecord::new("ping", "bbb", "2"))
            .await
            .unwrap();
        assert_eq!(store.get("ping").await.unwrap().as_deref(), Some("bbb"));
        assert_eq!(
            store.get_record("ping").await.unwrap(),
            Some(CommandRecord::new("ping", "bbb", "2"))
        );

        store.delete("ping").await.unwrap();
        store.delete("ping").await.unwrap();
        assert!(store.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_names_is_sorted() {
        let store = InMemoryCommandStore::new();
        store
            .upsert_all(&[
                CommandRecord::new("stats", "h1", "3"),
                CommandRecord::new("info", "h2", "2"),
                CommandRecord::new("ping", "h3", "1"),
            ])
            .await
            .unwrap();

        let names: Vec<String> = store.list_names().await.unwrap().into_iter().collect();
        assert_eq!(names, vec!["info", "ping", "stats"]);
    }
}
