//! Pipeline entry points for sync operations.
//!
//! - `run_seed`: Discover candidates from the seed list and sync them
//! - `run_refresh`: Re-sync every stored repository

pub mod seed;
pub mod sync;

pub use seed::{run_refresh, run_search, run_seed};
pub use sync::SyncOrchestrator;
