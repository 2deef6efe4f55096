//! Repository record data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A synchronized awesome-list repository.
///
/// Identity is `full_name` (`owner/name`, globally unique). Created on first
/// successful discovery and fetch; metadata fields are overwritten on every
/// subsequent sync. Never hard-deleted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryRecord {
    /// Repository name, e.g. "awesome-rust"
    pub name: String,

    /// Unique `owner/name` identifier, e.g. "rust-unofficial/awesome-rust"
    pub full_name: String,

    /// Repository description
    pub description: Option<String>,

    /// Canonical GitHub URL
    pub html_url: String,

    /// Star count at last sync
    pub stars: Option<u64>,

    /// Primary language reported by GitHub
    pub language: Option<String>,

    /// Repository topics
    #[serde(default)]
    pub topics: Vec<String>,

    /// Timestamp of the last sync attempt that reached the store
    pub last_synced_at: Option<DateTime<Utc>>,

    /// Error marker from the last sync, cleared on full success
    pub last_sync_error: Option<String>,

    /// First-seen timestamp, preserved across upserts
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last metadata overwrite
    pub updated_at: DateTime<Utc>,
}

impl RepositoryRecord {
    /// Build a fresh record from GitHub metadata. Sync-tracking fields start
    /// unset; the store preserves them for existing repositories.
    pub fn from_metadata(meta: &crate::services::RepoMetadata) -> Self {
        let now = Utc::now();
        Self {
            name: meta.name.clone(),
            full_name: meta.full_name.clone(),
            description: meta.description.clone(),
            html_url: meta.html_url.clone(),
            stars: Some(meta.stargazers_count),
            language: meta.language.clone(),
            topics: meta.topics.clone(),
            last_synced_at: None,
            last_sync_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Owner segment of the full name.
    pub fn owner(&self) -> &str {
        self.full_name.split('/').next().unwrap_or(&self.full_name)
    }
}
