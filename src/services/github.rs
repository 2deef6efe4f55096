// src/services/github.rs

//! GitHub API client service.
//!
//! All outbound calls to the hosting API go through this client. It owns
//! retry, backoff, and rate-limit-window waiting; callers receive `None`
//! for anything that could not be fetched and never see transport errors.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::GithubConfig;
use crate::utils::http::create_async_client;

/// Response headers and body relevant to the pipeline.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// `x-ratelimit-remaining`, when present
    pub remaining: Option<u64>,
    /// `x-ratelimit-reset` as epoch seconds, when present
    pub reset_at: Option<u64>,
    pub body: String,
}

impl ApiResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Quota-exhausted signal: forbidden status with a drained quota header.
    fn is_rate_limited(&self) -> bool {
        self.status == 403 && self.remaining == Some(0)
    }
}

/// Transport seam for the GitHub API. The production implementation wraps
/// `reqwest`; tests substitute a scripted fake.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<ApiResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        (**self).get(url, query).await
    }
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<ApiResponse> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github.v3+json")
            .query(query);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request.send().await?;
        let header_u64 = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        let status = response.status().as_u16();
        let remaining = header_u64("x-ratelimit-remaining");
        let reset_at = header_u64("x-ratelimit-reset");
        let body = response.text().await?;

        Ok(ApiResponse {
            status,
            remaining,
            reset_at,
            body,
        })
    }
}

/// Last observed API quota, shared by all concurrent sync units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining: Option<u64>,
    /// Epoch seconds at which the quota window resets
    pub reset_at: Option<u64>,
}

/// Retry bounds for one logical API call. Rate-limit waits are accounted
/// separately and do not consume attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(sync: &crate::models::SyncConfig) -> Self {
        Self {
            max_attempts: sync.max_retries,
            retry_delay: Duration::from_millis(sync.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Repository metadata payload consumed by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoMetadata {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Rate-limited GitHub API client.
pub struct GithubClient {
    base_url: String,
    transport: Box<dyn Transport>,
    retry: RetryPolicy,
    rate_limit: Mutex<RateLimitState>,
}

impl GithubClient {
    /// Create a client over a real HTTP transport.
    pub fn new(config: &GithubConfig, retry: RetryPolicy) -> Result<Self> {
        Ok(Self::with_transport(
            &config.api_url,
            Box::new(HttpTransport::new(config)?),
            retry,
        ))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(base_url: &str, transport: Box<dyn Transport>, retry: RetryPolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            retry,
            rate_limit: Mutex::new(RateLimitState::default()),
        }
    }

    /// Snapshot of the last observed quota.
    pub async fn rate_limit_state(&self) -> RateLimitState {
        *self.rate_limit.lock().await
    }

    /// Get repository metadata. `None` means the repository could not be
    /// fetched after retries.
    pub async fn get_repository(&self, full_name: &str) -> Option<RepoMetadata> {
        let value = self.get_json(&format!("repos/{full_name}"), &[]).await?;
        match serde_json::from_value(value) {
            Ok(meta) => Some(meta),
            Err(e) => {
                log::warn!("Unexpected repository payload for {full_name}: {e}");
                None
            }
        }
    }

    /// Get the raw readme text for a repository. The readme endpoint yields
    /// metadata with a `download_url`; the raw text is fetched from there
    /// in a second call under the same retry policy.
    pub async fn get_readme_content(&self, full_name: &str) -> Option<String> {
        let url = self.api_url(&format!("repos/{full_name}/readme"));
        let response = self.get_with_retry(&url, &[]).await?;
        let metadata: Value = match serde_json::from_str(&response.body) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Unexpected readme payload for {full_name}: {e}");
                return None;
            }
        };

        let download_url = metadata.get("download_url")?.as_str()?.to_string();
        let raw = self.get_with_retry(&download_url, &[]).await?;
        Some(raw.body)
    }

    /// Search repositories, most-starred first. Returns the raw item
    /// payloads; an empty vec means the search could not be performed.
    pub async fn search_repositories(&self, query: &str, limit: usize) -> Vec<Value> {
        let params = [
            ("q".to_string(), query.to_string()),
            ("sort".to_string(), "stars".to_string()),
            ("order".to_string(), "desc".to_string()),
            ("per_page".to_string(), limit.min(100).to_string()),
        ];

        let Some(value) = self.get_json("search/repositories", &params).await else {
            return Vec::new();
        };

        value
            .get("items")
            .and_then(|items| items.as_array())
            .cloned()
            .unwrap_or_default()
    }

    /// Fetch an API path and parse the body as JSON.
    pub async fn get_json(&self, path: &str, query: &[(String, String)]) -> Option<Value> {
        let url = self.api_url(path);
        let response = self.get_with_retry(&url, query).await?;
        match serde_json::from_str(&response.body) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Invalid JSON from {url}: {e}");
                None
            }
        }
    }

    fn api_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Perform one logical call: retry transport/HTTP failures up to the
    /// policy bound, wait out rate-limit windows without consuming
    /// attempts. A window that never advances stops after `max_attempts`
    /// waits.
    async fn get_with_retry(&self, url: &str, query: &[(String, String)]) -> Option<ApiResponse> {
        let mut attempts = 0;
        let mut waits = 0;

        while attempts < self.retry.max_attempts {
            match self.transport.get(url, query).await {
                Ok(response) => {
                    self.observe(&response).await;

                    if response.is_rate_limited() && waits < self.retry.max_attempts {
                        waits += 1;
                        if let Some(wait) = rate_limit_wait(&response) {
                            log::warn!(
                                "Rate limit exhausted, waiting {}s before retrying {url}",
                                wait.as_secs()
                            );
                            tokio::time::sleep(wait).await;
                        }
                        continue;
                    }

                    if response.is_success() {
                        return Some(response);
                    }

                    log::debug!("HTTP {} from {url}", response.status);
                }
                Err(e) => {
                    log::debug!("Transport error for {url}: {e}");
                }
            }

            attempts += 1;
            if attempts < self.retry.max_attempts {
                tokio::time::sleep(self.retry.retry_delay).await;
            }
        }

        log::warn!("Giving up on {url} after {attempts} attempts");
        None
    }

    /// Update the shared quota state from response headers.
    async fn observe(&self, response: &ApiResponse) {
        if response.remaining.is_none() && response.reset_at.is_none() {
            return;
        }
        let mut state = self.rate_limit.lock().await;
        state.remaining = response.remaining.or(state.remaining);
        state.reset_at = response.reset_at.or(state.reset_at);
    }
}

/// Seconds until the quota window resets, plus one for clock skew.
fn rate_limit_wait(response: &ApiResponse) -> Option<Duration> {
    let reset_at = response.reset_at?;
    let now = chrono::Utc::now().timestamp();
    let wait = reset_at as i64 - now + 1;
    if wait > 0 {
        Some(Duration::from_secs(wait as u64))
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for client and orchestrator tests.

    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::error::AppError;

    struct Rule {
        pattern: String,
        queued: VecDeque<ApiResponse>,
        fallback: Option<ApiResponse>,
    }

    /// Matches requests by URL substring, longest matching pattern wins.
    /// Queued responses are consumed one per call; the fallback repeats
    /// indefinitely. An unmatched or exhausted request is a transport error.
    #[derive(Default)]
    pub struct FakeTransport {
        rules: StdMutex<Vec<Rule>>,
        calls: StdMutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, pattern: &str, response: ApiResponse) {
            let mut rules = self.rules.lock().unwrap();
            if let Some(rule) = rules.iter_mut().find(|r| r.pattern == pattern) {
                rule.queued.push_back(response);
            } else {
                rules.push(Rule {
                    pattern: pattern.to_string(),
                    queued: VecDeque::from([response]),
                    fallback: None,
                });
            }
        }

        pub fn set_default(&self, pattern: &str, response: ApiResponse) {
            let mut rules = self.rules.lock().unwrap();
            if let Some(rule) = rules.iter_mut().find(|r| r.pattern == pattern) {
                rule.fallback = Some(response);
            } else {
                rules.push(Rule {
                    pattern: pattern.to_string(),
                    queued: VecDeque::new(),
                    fallback: Some(response),
                });
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, url: &str, _query: &[(String, String)]) -> Result<ApiResponse> {
            self.calls.lock().unwrap().push(url.to_string());

            let mut rules = self.rules.lock().unwrap();
            let best = rules
                .iter()
                .enumerate()
                .filter(|(_, r)| url.contains(&r.pattern))
                .max_by_key(|(_, r)| r.pattern.len())
                .map(|(i, _)| i);

            if let Some(i) = best {
                let rule = &mut rules[i];
                if let Some(response) = rule.queued.pop_front() {
                    return Ok(response);
                }
                if let Some(response) = &rule.fallback {
                    return Ok(response.clone());
                }
            }

            Err(AppError::sync("fake transport", format!("no response for {url}")))
        }
    }

    /// A 200 response carrying the given body and quota headers.
    pub fn ok(body: &str) -> ApiResponse {
        ApiResponse {
            status: 200,
            remaining: Some(50),
            reset_at: None,
            body: body.to_string(),
        }
    }

    pub fn status(code: u16) -> ApiResponse {
        ApiResponse {
            status: code,
            remaining: Some(50),
            reset_at: None,
            body: String::new(),
        }
    }

    pub fn repo_json(full_name: &str, stars: u64) -> String {
        let name = full_name.split('/').nth(1).unwrap_or(full_name);
        serde_json::json!({
            "name": name,
            "full_name": full_name,
            "description": "A curated list",
            "html_url": format!("https://github.com/{full_name}"),
            "stargazers_count": stars,
            "language": "Rust",
            "topics": ["awesome", "list"],
        })
        .to_string()
    }
}
