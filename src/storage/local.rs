//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml               # Application configuration
//! ├── repositories.json         # All repository records
//! └── projects/
//!     └── {owner}__{name}.json  # Project set per repository
//! ```
//!
//! Each project file is rewritten whole via temp-file-then-rename, so the
//! replace-all-projects reconciliation unit is a single atomic swap. One
//! store-wide lock serializes the read-modify-write paths.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{ProjectRecord, RepositoryRecord};
use crate::storage::Store;

/// Local filesystem storage backend.
pub struct LocalStore {
    root_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn project_key(repository_id: &str) -> String {
        format!("projects/{}.json", repository_id.replace('/', "__"))
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn read_repositories(&self) -> Result<HashMap<String, RepositoryRecord>> {
        Ok(self
            .read_json("repositories.json")
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn upsert_repository(&self, mut record: RepositoryRecord) -> Result<RepositoryRecord> {
        let _guard = self.write_lock.lock().await;

        let mut repositories = self.read_repositories().await?;
        if let Some(existing) = repositories.get(&record.full_name) {
            record.created_at = existing.created_at;
            record.last_synced_at = existing.last_synced_at;
            record.last_sync_error = existing.last_sync_error.clone();
        }
        record.updated_at = Utc::now();

        repositories.insert(record.full_name.clone(), record.clone());
        self.write_json("repositories.json", &repositories).await?;
        Ok(record)
    }

    async fn mark_sync_result(&self, full_name: &str, error: Option<String>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut repositories = self.read_repositories().await?;
        let record = repositories
            .get_mut(full_name)
            .ok_or_else(|| AppError::storage(format!("unknown repository {full_name}")))?;

        record.last_synced_at = Some(Utc::now());
        record.last_sync_error = error;
        self.write_json("repositories.json", &repositories).await
    }

    async fn replace_projects(
        &self,
        repository_id: &str,
        projects: Vec<ProjectRecord>,
    ) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let count = projects.len();
        self.write_json(&Self::project_key(repository_id), &projects)
            .await?;
        Ok(count)
    }

    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        let mut repositories: Vec<_> = self.read_repositories().await?.into_values().collect();
        repositories.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(repositories)
    }

    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryRecord>> {
        Ok(self.read_repositories().await?.remove(full_name))
    }

    async fn projects_for(&self, repository_id: &str) -> Result<Vec<ProjectRecord>> {
        Ok(self
            .read_json(&Self::project_key(repository_id))
            .await?
            .unwrap_or_default())
    }
}
