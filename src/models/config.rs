//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// GitHub API access settings
    #[serde(default)]
    pub github: GithubConfig,

    /// Synchronization behavior settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Candidate discovery rules
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.github.api_url.trim().is_empty() {
            return Err(AppError::validation("github.api_url is empty"));
        }
        if self.github.user_agent.trim().is_empty() {
            return Err(AppError::validation("github.user_agent is empty"));
        }
        if self.github.timeout_secs == 0 {
            return Err(AppError::validation("github.timeout_secs must be > 0"));
        }
        if self.sync.max_concurrent == 0 {
            return Err(AppError::validation("sync.max_concurrent must be > 0"));
        }
        if self.sync.max_retries == 0 {
            return Err(AppError::validation("sync.max_retries must be > 0"));
        }
        if self.discovery.seed_repository.split('/').count() != 2 {
            return Err(AppError::validation(
                "discovery.seed_repository must be owner/name",
            ));
        }
        if self.discovery.marker.trim().is_empty() {
            return Err(AppError::validation("discovery.marker is empty"));
        }
        Ok(())
    }
}

/// GitHub API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Base URL for the GitHub REST API
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Personal access token, sent as an Authorization header when set
    #[serde(default)]
    pub token: Option<String>,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            token: None,
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Synchronization behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum concurrent repository sync units
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Delay between finished sync units in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Retry attempts per logical API call
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Enrich projects that link to GitHub repositories with stars/language/topics
    #[serde(default = "defaults::enrich")]
    pub enrich: bool,

    /// Delay between enrichment lookups in milliseconds
    #[serde(default = "defaults::enrich_delay")]
    pub enrich_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            request_delay_ms: defaults::request_delay(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
            enrich: defaults::enrich(),
            enrich_delay_ms: defaults::enrich_delay(),
        }
    }
}

/// Candidate discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Seed list whose readme is scanned for candidates
    #[serde(default = "defaults::seed_repository")]
    pub seed_repository: String,

    /// Topical marker a candidate URL or link text must contain
    #[serde(default = "defaults::marker")]
    pub marker: String,

    /// URL path shapes excluded from discovery
    #[serde(default = "defaults::denylist_patterns")]
    pub denylist_patterns: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            seed_repository: defaults::seed_repository(),
            marker: defaults::marker(),
            denylist_patterns: defaults::denylist_patterns(),
        }
    }
}

mod defaults {
    // GitHub defaults
    pub fn api_url() -> String {
        "https://api.github.com".into()
    }
    pub fn user_agent() -> String {
        "awesome-sync/0.1".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Sync defaults
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        500
    }
    pub fn enrich() -> bool {
        true
    }
    pub fn enrich_delay() -> u64 {
        200
    }

    // Discovery defaults
    pub fn seed_repository() -> String {
        "sindresorhus/awesome".into()
    }
    pub fn marker() -> String {
        "awesome".into()
    }
    pub fn denylist_patterns() -> Vec<String> {
        vec![
            "/issues".into(),
            "/wiki".into(),
            "/blob/".into(),
            "/tree/".into(),
            "/pulls".into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.sync.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_seed() {
        let mut config = Config::default();
        config.discovery.seed_repository = "not-a-full-name".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sync]
            max_concurrent = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.sync.max_concurrent, 2);
        assert_eq!(config.sync.max_retries, 3);
        assert_eq!(config.github.api_url, "https://api.github.com");
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.discovery.seed_repository, "sindresorhus/awesome");
    }
}
