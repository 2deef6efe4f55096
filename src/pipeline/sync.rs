// src/pipeline/sync.rs

//! Sync orchestrator.
//!
//! Drives the end-to-end flow per repository: fetch metadata, fetch and
//! parse the readme, reconcile the project set into the store, enrich, and
//! emit index documents. Batches run repositories concurrently under a
//! fixed limit; a single repository's failure never aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::index::SearchIndex;
use crate::models::{
    BatchResult, Config, ProjectDocument, ProjectRecord, RepositoryRecord, SyncOutcome, SyncStatus,
};
use crate::services::{GithubClient, MarkdownExtractor};
use crate::storage::Store;
use crate::utils::url::full_name_from_url;

/// Error marker written to a repository on readme-fetch failure.
const README_FETCH_ERROR: &str = "could not fetch readme content";

/// Orchestrates repository synchronization against the store and index.
pub struct SyncOrchestrator {
    config: Arc<Config>,
    client: Arc<GithubClient>,
    store: Arc<dyn Store>,
    index: Arc<dyn SearchIndex>,
    extractor: MarkdownExtractor,
}

impl SyncOrchestrator {
    pub fn new(
        config: Arc<Config>,
        client: Arc<GithubClient>,
        store: Arc<dyn Store>,
        index: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            config,
            client,
            store,
            index,
            extractor: MarkdownExtractor::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &GithubClient {
        &self.client
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Sync a single repository.
    ///
    /// Metadata fetch failure is a hard failure: nothing is persisted.
    /// Readme fetch failure is a soft failure: the repository record is
    /// marked but previously stored projects stay untouched.
    pub async fn sync_repository(&self, full_name: &str) -> SyncOutcome {
        let Some(meta) = self.client.get_repository(full_name).await else {
            return SyncOutcome::hard_failed(full_name, "could not fetch repository metadata");
        };

        let record = match self
            .store
            .upsert_repository(RepositoryRecord::from_metadata(&meta))
            .await
        {
            Ok(record) => record,
            Err(e) => return SyncOutcome::hard_failed(full_name, format!("store error: {e}")),
        };

        let Some(readme) = self.client.get_readme_content(full_name).await else {
            if let Err(e) = self
                .store
                .mark_sync_result(full_name, Some(README_FETCH_ERROR.to_string()))
                .await
            {
                log::warn!("Failed to mark sync error for {full_name}: {e}");
            }
            return SyncOutcome::soft_failed(full_name, README_FETCH_ERROR);
        };

        let parsed = self.extractor.extract(&readme);
        let mut projects: Vec<ProjectRecord> = parsed
            .iter()
            .map(|p| ProjectRecord::from_parsed(&record.full_name, p))
            .collect();

        self.enrich_projects(&mut projects).await;

        let count = match self
            .store
            .replace_projects(&record.full_name, projects.clone())
            .await
        {
            Ok(count) => count,
            Err(e) => {
                let marker = format!("store error: {e}");
                if let Err(e) = self
                    .store
                    .mark_sync_result(full_name, Some(marker.clone()))
                    .await
                {
                    log::warn!("Failed to mark sync error for {full_name}: {e}");
                }
                return SyncOutcome::soft_failed(full_name, marker);
            }
        };

        if let Err(e) = self.store.mark_sync_result(full_name, None).await {
            log::warn!("Failed to mark sync result for {full_name}: {e}");
        }

        let documents: Vec<ProjectDocument> = projects
            .iter()
            .map(|p| ProjectDocument::from_record(p, &record.name, &record.topics))
            .collect();

        let mut outcome = SyncOutcome::synced(full_name, count);
        if let Err(e) = self.index.index_documents(&documents).await {
            log::warn!("Failed to index {count} projects for {full_name}: {e}");
            outcome.index_error = Some(e.to_string());
        }

        outcome
    }

    /// Fill star/language/topic fields for projects whose URL is itself a
    /// GitHub repository reference. Enrichment failure leaves the project
    /// unenriched.
    async fn enrich_projects(&self, projects: &mut [ProjectRecord]) {
        let delay = Duration::from_millis(self.config.sync.enrich_delay_ms);

        for project in projects.iter_mut() {
            let Some(url) = project.url.clone() else {
                continue;
            };
            let Some(reference) = full_name_from_url(&url) else {
                continue;
            };

            project.github_url = Some(url);

            if !self.config.sync.enrich {
                continue;
            }

            match self.client.get_repository(&reference).await {
                Some(meta) => {
                    project.stars = Some(meta.stargazers_count);
                    project.language = meta.language;
                    project.topics = meta.topics;
                }
                None => {
                    log::debug!("Could not enrich {} ({reference})", project.name);
                }
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Sync many repositories with bounded concurrency.
    ///
    /// Cancellation is honored between units: in-flight repositories run to
    /// completion, units not yet started report `Skipped`. The batch always
    /// returns one outcome per candidate.
    pub async fn sync_batch(
        &self,
        candidates: &[String],
        cancel: &CancellationToken,
    ) -> BatchResult {
        let concurrency = self.config.sync.max_concurrent.max(1);
        let delay = Duration::from_millis(self.config.sync.request_delay_ms);

        let mut outcomes = stream::iter(candidates.to_vec())
            .map(|full_name| {
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return SyncOutcome::skipped(full_name);
                    }
                    self.sync_repository(&full_name).await
                }
            })
            .buffer_unordered(concurrency);

        let mut batch = BatchResult::default();
        while let Some(outcome) = outcomes.next().await {
            match outcome.status {
                SyncStatus::Synced => {
                    log::info!("Synced {} ({} projects)", outcome.full_name, outcome.projects);
                }
                SyncStatus::SoftFailed => {
                    log::warn!(
                        "Soft failure for {}: {}",
                        outcome.full_name,
                        outcome.error.as_deref().unwrap_or("unknown")
                    );
                }
                SyncStatus::HardFailed => {
                    log::warn!(
                        "Hard failure for {}: {}",
                        outcome.full_name,
                        outcome.error.as_deref().unwrap_or("unknown")
                    );
                }
                SyncStatus::Skipped => {
                    log::debug!("Skipped {} (batch cancelled)", outcome.full_name);
                }
            }
            batch.record(outcome);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AppError, Result};
    use crate::services::testing::{FakeTransport, ok, repo_json, status};
    use crate::services::RetryPolicy;
    use crate::storage::MemoryStore;

    /// Index double that records submitted documents.
    #[derive(Default)]
    struct RecordingIndex {
        documents: StdMutex<Vec<ProjectDocument>>,
    }

    #[async_trait]
    impl SearchIndex for RecordingIndex {
        async fn index_documents(&self, documents: &[ProjectDocument]) -> Result<()> {
            self.documents.lock().unwrap().extend(documents.iter().cloned());
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            self.documents.lock().unwrap().clear();
            Ok(())
        }
    }

    /// Index double that always fails.
    struct FailingIndex;

    #[async_trait]
    impl SearchIndex for FailingIndex {
        async fn index_documents(&self, _documents: &[ProjectDocument]) -> Result<()> {
            Err(AppError::index("index unavailable"))
        }

        async fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    struct Harness {
        transport: Arc<FakeTransport>,
        store: Arc<MemoryStore>,
        index: Arc<RecordingIndex>,
        orchestrator: SyncOrchestrator,
    }

    fn harness_with(config: Config) -> Harness {
        let transport = Arc::new(FakeTransport::new());
        let store = Arc::new(MemoryStore::new());
        let index = Arc::new(RecordingIndex::default());
        let client = Arc::new(GithubClient::with_transport(
            "https://api.test",
            Box::new(Arc::clone(&transport)),
            RetryPolicy {
                max_attempts: 2,
                retry_delay: Duration::from_millis(10),
            },
        ));
        let orchestrator = SyncOrchestrator::new(
            Arc::new(config),
            client,
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&index) as Arc<dyn SearchIndex>,
        );
        Harness {
            transport,
            store,
            index,
            orchestrator,
        }
    }

    fn harness() -> Harness {
        let mut config = Config::default();
        config.sync.enrich = false;
        config.sync.request_delay_ms = 0;
        config.sync.enrich_delay_ms = 0;
        harness_with(config)
    }

    fn script_readme(transport: &FakeTransport, full_name: &str, markdown: &str) {
        transport.push(
            &format!("repos/{full_name}/readme"),
            ok(&format!(
                r#"{{"download_url": "https://raw.test/{full_name}/README.md"}}"#
            )),
        );
        transport.push(&format!("raw.test/{full_name}"), ok(markdown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_failure_leaves_store_untouched() {
        let h = harness();
        h.transport.set_default("repos/a/x", status(404));

        let outcome = h.orchestrator.sync_repository("a/x").await;

        assert_eq!(outcome.status, SyncStatus::HardFailed);
        assert!(h.store.get_repository("a/x").await.unwrap().is_none());
        assert!(h.store.list_repositories().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_soft_failure_preserves_projects() {
        let h = harness();

        // First sync succeeds and stores one project.
        h.transport.set_default("repos/a/x", ok(&repo_json("a/x", 5)));
        script_readme(&h.transport, "a/x", "- [Tool](https://example.com/tool) - desc");
        let outcome = h.orchestrator.sync_repository("a/x").await;
        assert_eq!(outcome.status, SyncStatus::Synced);
        assert_eq!(outcome.projects, 1);

        // Second sync: readme endpoint now fails.
        h.transport
            .set_default("repos/a/x/readme", status(404));
        let outcome = h.orchestrator.sync_repository("a/x").await;

        assert_eq!(outcome.status, SyncStatus::SoftFailed);
        let record = h.store.get_repository("a/x").await.unwrap().unwrap();
        assert!(record.last_sync_error.is_some());
        assert!(record.last_synced_at.is_some());

        let projects = h.store.projects_for("a/x").await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Tool");
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_sync_clears_error_marker() {
        let h = harness();
        h.transport.set_default("repos/a/x", ok(&repo_json("a/x", 5)));
        h.transport.push("repos/a/x/readme", status(404));
        h.transport.push("repos/a/x/readme", status(404));

        let outcome = h.orchestrator.sync_repository("a/x").await;
        assert_eq!(outcome.status, SyncStatus::SoftFailed);

        script_readme(&h.transport, "a/x", "- [Tool](https://example.com/tool)");
        let outcome = h.orchestrator.sync_repository("a/x").await;
        assert_eq!(outcome.status, SyncStatus::Synced);

        let record = h.store.get_repository("a/x").await.unwrap().unwrap();
        assert!(record.last_sync_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_replaces_project_set() {
        let h = harness();
        h.transport.set_default("repos/a/x", ok(&repo_json("a/x", 5)));

        script_readme(
            &h.transport,
            "a/x",
            "- [One](https://example.com/one)\n- [Two](https://example.com/two)",
        );
        h.orchestrator.sync_repository("a/x").await;

        script_readme(
            &h.transport,
            "a/x",
            "- [Two](https://example.com/two)\n- [Three](https://example.com/three)",
        );
        h.orchestrator.sync_repository("a/x").await;

        let names: Vec<_> = h
            .store
            .projects_for("a/x")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Two", "Three"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrichment_fills_github_fields() {
        let mut config = Config::default();
        config.sync.enrich = true;
        config.sync.request_delay_ms = 0;
        config.sync.enrich_delay_ms = 0;
        let h = harness_with(config);

        h.transport.set_default("repos/a/x", ok(&repo_json("a/x", 5)));
        script_readme(
            &h.transport,
            "a/x",
            "- [Lib](https://github.com/o/lib) - a lib\n- [Site](https://example.com/site) - a site",
        );
        h.transport.set_default("repos/o/lib", ok(&repo_json("o/lib", 77)));

        let outcome = h.orchestrator.sync_repository("a/x").await;
        assert_eq!(outcome.status, SyncStatus::Synced);

        let projects = h.store.projects_for("a/x").await.unwrap();
        let lib = projects.iter().find(|p| p.name == "Lib").unwrap();
        assert_eq!(lib.stars, Some(77));
        assert_eq!(lib.language.as_deref(), Some("Rust"));
        assert_eq!(lib.github_url.as_deref(), Some("https://github.com/o/lib"));

        let site = projects.iter().find(|p| p.name == "Site").unwrap();
        assert!(site.stars.is_none());
        assert!(site.github_url.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrichment_failure_keeps_project() {
        let mut config = Config::default();
        config.sync.enrich = true;
        config.sync.request_delay_ms = 0;
        config.sync.enrich_delay_ms = 0;
        let h = harness_with(config);

        h.transport.set_default("repos/a/x", ok(&repo_json("a/x", 5)));
        script_readme(&h.transport, "a/x", "- [Gone](https://github.com/o/gone)");
        h.transport.set_default("repos/o/gone", status(404));

        let outcome = h.orchestrator.sync_repository("a/x").await;
        assert_eq!(outcome.status, SyncStatus::Synced);

        let projects = h.store.projects_for("a/x").await.unwrap();
        assert_eq!(projects.len(), 1);
        assert!(projects[0].stars.is_none());
        assert_eq!(
            projects[0].github_url.as_deref(),
            Some("https://github.com/o/gone")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_documents_join_repository_fields() {
        let h = harness();
        h.transport.set_default("repos/a/x", ok(&repo_json("a/x", 5)));
        script_readme(&h.transport, "a/x", "- [Tool](https://example.com/tool)");

        h.orchestrator.sync_repository("a/x").await;

        let documents = h.index.documents.lock().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].repository_id, "a/x");
        assert_eq!(documents[0].repository_name, "x");
        assert_eq!(
            documents[0].repository_topics,
            vec!["awesome".to_string(), "list".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_failure_does_not_fail_sync() {
        let transport = Arc::new(FakeTransport::new());
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(GithubClient::with_transport(
            "https://api.test",
            Box::new(Arc::clone(&transport)),
            RetryPolicy::default(),
        ));
        let mut config = Config::default();
        config.sync.enrich = false;
        config.sync.request_delay_ms = 0;
        let orchestrator = SyncOrchestrator::new(
            Arc::new(config),
            client,
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::new(FailingIndex) as Arc<dyn SearchIndex>,
        );

        transport.set_default("repos/a/x", ok(&repo_json("a/x", 5)));
        script_readme(&transport, "a/x", "- [Tool](https://example.com/tool)");

        let outcome = orchestrator.sync_repository("a/x").await;

        assert_eq!(outcome.status, SyncStatus::Synced);
        assert!(outcome.index_error.is_some());
        assert_eq!(store.projects_for("a/x").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_reports_every_candidate() {
        let h = harness();
        for name in ["a/one", "c/three"] {
            h.transport
                .set_default(&format!("repos/{name}"), ok(&repo_json(name, 1)));
            script_readme(&h.transport, name, "- [T](https://example.com/t)");
        }
        h.transport.set_default("repos/b/bad", status(404));

        let candidates: Vec<String> = ["a/one", "b/bad", "c/three"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let batch = h
            .orchestrator
            .sync_batch(&candidates, &CancellationToken::new())
            .await;

        assert_eq!(batch.total(), 3);
        assert_eq!(batch.synced, 2);
        assert_eq!(batch.hard_failed, 1);
        let failed = batch
            .outcomes
            .iter()
            .find(|o| o.status == SyncStatus::HardFailed)
            .unwrap();
        assert_eq!(failed.full_name, "b/bad");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_batch_skips_units() {
        let h = harness();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let candidates: Vec<String> = ["a/one", "b/two"].iter().map(|s| s.to_string()).collect();
        let batch = h.orchestrator.sync_batch(&candidates, &cancel).await;

        assert_eq!(batch.total(), 2);
        assert_eq!(batch.skipped, 2);
        assert_eq!(h.transport.call_count(), 0);
    }
}
