//! Search index abstractions.
//!
//! The pipeline emits one flattened document per persisted project and
//! treats indexing as best-effort: reconciliation never blocks on, or
//! rolls back for, an index failure.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProjectDocument;

// Re-export for convenience
pub use local::LocalIndex;

/// Trait for search index backends.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Index a batch of documents. Documents replace any previously indexed
    /// documents of the same repositories.
    async fn index_documents(&self, documents: &[ProjectDocument]) -> Result<()>;

    /// Drop the whole index.
    async fn clear(&self) -> Result<()>;
}
