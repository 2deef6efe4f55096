// src/services/discovery.rs

//! Candidate repository discovery.
//!
//! Scans an already-fetched seed document for awesome-list candidates.
//! Discovery produces identifiers only and performs no I/O; fetching and
//! verification belong to the sync orchestrator.

use regex::Regex;

use crate::models::DiscoveryConfig;
use crate::utils::url::full_name_from_url;

/// Scanner for candidate `owner/name` identifiers in a seed document.
pub struct Discoverer {
    config: DiscoveryConfig,
    link: Regex,
}

impl Discoverer {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            link: Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern must compile"),
        }
    }

    /// Find candidate repositories in the seed text.
    ///
    /// A link qualifies when its target resolves to a GitHub `owner/name`,
    /// the URL or link text contains the topical marker, the path matches
    /// no denylisted shape, and it is not the seed list itself. Candidates
    /// are deduplicated by identifier in first-seen order.
    pub fn discover(&self, seed_text: &str) -> Vec<String> {
        let marker = self.config.marker.to_lowercase();
        let seed_identity = self.config.seed_repository.to_lowercase();
        let mut seen = std::collections::HashSet::new();
        let mut candidates = Vec::new();

        for caps in self.link.captures_iter(seed_text) {
            let text = caps[1].to_lowercase();
            let url = caps[2].trim().to_string();
            let url_lower = url.to_lowercase();

            if !url_lower.contains(&marker) && !text.contains(&marker) {
                continue;
            }

            if self
                .config
                .denylist_patterns
                .iter()
                .any(|p| url_lower.contains(p.as_str()))
            {
                continue;
            }

            let Some(full_name) = full_name_from_url(&url) else {
                continue;
            };

            if full_name.to_lowercase() == seed_identity {
                continue;
            }

            if seen.insert(full_name.to_lowercase()) {
                candidates.push(full_name);
            }
        }

        candidates
    }
}

impl Default for Discoverer {
    fn default() -> Self {
        Self::new(DiscoveryConfig::default())
    }
}
