//! In-memory storage backend.
//!
//! Same semantics as [`LocalStore`](crate::storage::LocalStore) without the
//! filesystem; used by orchestrator tests and throwaway runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{ProjectRecord, RepositoryRecord};
use crate::storage::Store;

#[derive(Default)]
struct Inner {
    repositories: HashMap<String, RepositoryRecord>,
    projects: HashMap<String, Vec<ProjectRecord>>,
}

/// In-memory store backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_repository(&self, mut record: RepositoryRecord) -> Result<RepositoryRecord> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner.repositories.get(&record.full_name) {
            record.created_at = existing.created_at;
            record.last_synced_at = existing.last_synced_at;
            record.last_sync_error = existing.last_sync_error.clone();
        }
        record.updated_at = Utc::now();

        inner
            .repositories
            .insert(record.full_name.clone(), record.clone());
        Ok(record)
    }

    async fn mark_sync_result(&self, full_name: &str, error: Option<String>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .repositories
            .get_mut(full_name)
            .ok_or_else(|| AppError::storage(format!("unknown repository {full_name}")))?;

        record.last_synced_at = Some(Utc::now());
        record.last_sync_error = error;
        Ok(())
    }

    async fn replace_projects(
        &self,
        repository_id: &str,
        projects: Vec<ProjectRecord>,
    ) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        let count = projects.len();
        inner.projects.insert(repository_id.to_string(), projects);
        Ok(count)
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        let inner = self.inner.lock().await;
        let mut repositories: Vec<_> = inner.repositories.values().cloned().collect();
        repositories.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(repositories)
    }

    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.repositories.get(full_name).cloned())
    }

    async fn projects_for(&self, repository_id: &str) -> Result<Vec<ProjectRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.projects.get(repository_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_list() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let record = RepositoryRecord {
            name: "x".into(),
            full_name: "a/x".into(),
            description: None,
            html_url: "https://github.com/a/x".into(),
            stars: None,
            language: None,
            topics: vec![],
            last_synced_at: None,
            last_sync_error: None,
            created_at: now,
            updated_at: now,
        };

        store.upsert_repository(record).await.unwrap();
        assert_eq!(store.list_repositories().await.unwrap().len(), 1);
        assert!(store.get_repository("a/x").await.unwrap().is_some());
    }
}
