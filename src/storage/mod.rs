//! Storage abstractions for repository and project persistence.
//!
//! The pipeline requires only create/overwrite/replace/list semantics:
//! repository metadata is upserted, a repository's project set is replaced
//! as one atomic unit, and records are never hard-deleted.

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ProjectRecord, RepositoryRecord};

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Trait for durable store backends.
///
/// Implementations must serialize writes at least per repository so a
/// concurrent reader never observes a partially replaced project set.
#[async_trait]
pub trait Store: Send + Sync {
    /// Create the repository or overwrite its mutable metadata fields.
    ///
    /// `created_at` and the sync-tracking fields (`last_synced_at`,
    /// `last_sync_error`) of an existing record are preserved; callers
    /// record sync results through [`Store::mark_sync_result`].
    async fn upsert_repository(&self, record: RepositoryRecord) -> Result<RepositoryRecord>;

    /// Record the outcome of a sync attempt: refreshes `last_synced_at`
    /// and sets or clears `last_sync_error`.
    async fn mark_sync_result(&self, full_name: &str, error: Option<String>) -> Result<()>;

    /// Atomically replace the full project set for a repository.
    /// Returns the number of projects stored.
    async fn replace_projects(
        &self,
        repository_id: &str,
        projects: Vec<ProjectRecord>,
    ) -> Result<usize>;

    /// List all repositories, ordered by full name.
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>>;

    /// Look up a single repository.
    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryRecord>>;

    /// All projects currently stored for a repository.
    async fn projects_for(&self, repository_id: &str) -> Result<Vec<ProjectRecord>>;
}
