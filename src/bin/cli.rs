//! awesome-sync CLI
//!
//! Local execution entry point for discovery, sync, and maintenance runs.

use std::path::PathBuf;
use std::sync::Arc;

use awesome_sync::{
    error::Result,
    index::{LocalIndex, SearchIndex},
    models::Config,
    pipeline::{self, SyncOrchestrator},
    services::{GithubClient, RetryPolicy},
    storage::{LocalStore, Store},
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

/// awesome-sync - Awesome List Synchronizer
#[derive(Parser, Debug)]
#[command(
    name = "awesome-sync",
    version,
    about = "Synchronizes awesome-list repositories into a local project index"
)]
struct Cli {
    /// Path to storage directory containing config and data files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover candidates from the seed list and sync them
    Seed {
        /// Sync at most this many discovered candidates
        #[arg(long)]
        limit: Option<usize>,

        /// Discover through the search API instead of the seed readme
        #[arg(long)]
        query: Option<String>,
    },

    /// Sync a single repository by full name (owner/name)
    Sync {
        /// Repository full name, e.g. rust-unofficial/awesome-rust
        repository: String,
    },

    /// Re-sync every repository already in the store
    Refresh,

    /// Validate configuration files
    Validate,

    /// Show store and quota status
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Cancellation token that fires on Ctrl-C. In-flight repository units run
/// to completion; unstarted units are skipped.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after in-flight repositories...");
            handle.cancel();
        }
    });
    token
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("awesome-sync starting...");

    // Load configuration
    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    if config.github.token.is_none() {
        config.github.token = std::env::var("GITHUB_TOKEN").ok();
    }

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let config = Arc::new(config);
    let client = Arc::new(GithubClient::new(
        &config.github,
        RetryPolicy::from_config(&config.sync),
    )?);
    let store: Arc<dyn Store> = Arc::new(LocalStore::new(&cli.storage_dir));
    let index: Arc<dyn SearchIndex> = Arc::new(LocalIndex::new(&cli.storage_dir));
    let orchestrator = SyncOrchestrator::new(
        Arc::clone(&config),
        Arc::clone(&client),
        Arc::clone(&store),
        index,
    );

    match cli.command {
        Command::Seed { limit, query } => {
            let cancel = cancel_on_ctrl_c();
            let result = match query {
                Some(query) => {
                    pipeline::run_search(&orchestrator, &query, limit.unwrap_or(100), &cancel)
                        .await?
                }
                None => pipeline::run_seed(&orchestrator, limit, &cancel).await?,
            };
            log::info!(
                "Seed complete: {}/{} repositories synced",
                result.synced,
                result.total()
            );
        }

        Command::Sync { repository } => {
            if repository.split('/').count() != 2 {
                return Err(awesome_sync::error::AppError::config(
                    "repository must be owner/name",
                ));
            }

            let outcome = orchestrator.sync_repository(&repository).await;
            log::info!(
                "Sync of {}: {:?} ({} projects)",
                outcome.full_name,
                outcome.status,
                outcome.projects
            );
            if let Some(error) = outcome.error {
                log::warn!("  error: {error}");
            }
            if let Some(error) = outcome.index_error {
                log::warn!("  index error: {error}");
            }
        }

        Command::Refresh => {
            let cancel = cancel_on_ctrl_c();
            let result = pipeline::run_refresh(&orchestrator, &cancel).await?;
            log::info!(
                "Refresh complete: {}/{} repositories synced",
                result.synced,
                result.total()
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {e}");
                return Err(e);
            }
            log::info!("✓ Config OK (github, sync, and discovery sections)");

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());

            let repositories = store.list_repositories().await?;
            log::info!("Repositories: {}", repositories.len());

            let mut project_total = 0;
            let mut soft_failed = 0;
            for repository in &repositories {
                project_total += store.projects_for(&repository.full_name).await?.len();
                if repository.last_sync_error.is_some() {
                    soft_failed += 1;
                }
            }
            log::info!("Projects: {project_total}");
            log::info!("Repositories with sync errors: {soft_failed}");

            if let Some(last) = repositories.iter().filter_map(|r| r.last_synced_at).max() {
                log::info!("Most recent sync: {last}");
            } else {
                log::info!("No repository synced yet.");
            }

            let quota = client.rate_limit_state().await;
            match (quota.remaining, quota.reset_at) {
                (Some(remaining), _) => log::info!("API quota remaining: {remaining}"),
                _ => log::info!("API quota: not yet observed"),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
