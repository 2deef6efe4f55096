// src/pipeline/seed.rs

//! Discovery and refresh pipeline entry points.

use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::BatchResult;
use crate::services::Discoverer;

use super::sync::SyncOrchestrator;

/// Discover candidates from the configured seed list and sync them.
pub async fn run_seed(
    orchestrator: &SyncOrchestrator,
    limit: Option<usize>,
    cancel: &CancellationToken,
) -> Result<BatchResult> {
    let seed = orchestrator.config().discovery.seed_repository.clone();
    log::info!("Fetching seed list {seed}...");

    let Some(readme) = orchestrator.client().get_readme_content(&seed).await else {
        return Err(AppError::discovery(format!(
            "could not fetch seed readme for {seed}"
        )));
    };

    let discoverer = Discoverer::new(orchestrator.config().discovery.clone());
    let mut candidates = discoverer.discover(&readme);
    log::info!("Discovered {} candidate repositories", candidates.len());

    if let Some(limit) = limit {
        candidates.truncate(limit);
    }

    let result = orchestrator.sync_batch(&candidates, cancel).await;
    log_batch_summary(&result);
    Ok(result)
}

/// Discover candidates through the search API and sync them.
///
/// Search results are filtered with the same heuristics as list-based
/// discovery: the repository name must carry the topical marker, or its
/// description must read like a curated list.
pub async fn run_search(
    orchestrator: &SyncOrchestrator,
    query: &str,
    limit: usize,
    cancel: &CancellationToken,
) -> Result<BatchResult> {
    log::info!("Searching repositories: {query}");
    let items = orchestrator.client().search_repositories(query, limit).await;

    let marker = orchestrator.config().discovery.marker.to_lowercase();
    let candidates: Vec<String> = items
        .iter()
        .filter(|item| {
            let name = item["name"].as_str().unwrap_or("").to_lowercase();
            let description = item["description"].as_str().unwrap_or("").to_lowercase();
            name.starts_with(&format!("{marker}-"))
                || (description.contains(&marker)
                    && (description.contains("list") || description.contains("collection")))
        })
        .filter_map(|item| item["full_name"].as_str().map(str::to_string))
        .collect();

    log::info!(
        "Search returned {} items, {} candidates after filtering",
        items.len(),
        candidates.len()
    );

    let result = orchestrator.sync_batch(&candidates, cancel).await;
    log_batch_summary(&result);
    Ok(result)
}

/// Re-sync every repository already present in the store.
pub async fn run_refresh(
    orchestrator: &SyncOrchestrator,
    cancel: &CancellationToken,
) -> Result<BatchResult> {
    let repositories = orchestrator.store().list_repositories().await?;
    let candidates: Vec<String> = repositories.into_iter().map(|r| r.full_name).collect();
    log::info!("Refreshing {} repositories", candidates.len());

    let result = orchestrator.sync_batch(&candidates, cancel).await;
    log_batch_summary(&result);
    Ok(result)
}

fn log_batch_summary(result: &BatchResult) {
    log::info!(
        "Batch complete: {} synced, {} soft-failed, {} hard-failed, {} skipped ({} projects)",
        result.synced,
        result.soft_failed,
        result.hard_failed,
        result.skipped,
        result.project_count()
    );
}
