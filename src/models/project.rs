//! Project data structures.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A project entry recovered from one markdown list line.
///
/// Transient output of extraction, not owned by any store. When `url` is
/// present it parsed as an absolute reference with a host component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedProject {
    /// Link text of the entry
    pub name: String,

    /// Trailing description, if the entry had one
    pub description: Option<String>,

    /// Link target, validated to have a network authority
    pub url: Option<String>,

    /// Cleaned text of the nearest preceding section heading
    pub category: Option<String>,

    /// Original source line, preserved for diagnostics
    pub raw_markdown: String,
}

/// A durable project entry, child of exactly one repository.
///
/// The full set for a `repository_id` is replaced atomically on each sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRecord {
    /// Stable identifier derived from repository, name, and url
    pub id: String,

    /// Owning repository's full name
    pub repository_id: String,

    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,

    /// Set when `url` points at a GitHub repository
    pub github_url: Option<String>,

    pub category: Option<String>,

    /// Original markdown line
    pub raw_markdown: String,

    // Enrichment fields, filled by a secondary metadata lookup
    pub stars: Option<u64>,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl ProjectRecord {
    /// Build a record from a parsed entry for the given repository.
    pub fn from_parsed(repository_id: &str, parsed: &ParsedProject) -> Self {
        let id = Self::stable_id(repository_id, &parsed.name, parsed.url.as_deref());
        Self {
            id,
            repository_id: repository_id.to_string(),
            name: parsed.name.clone(),
            description: parsed.description.clone(),
            url: parsed.url.clone(),
            github_url: None,
            category: parsed.category.clone(),
            raw_markdown: parsed.raw_markdown.clone(),
            stars: None,
            language: None,
            topics: Vec::new(),
        }
    }

    /// Content-stable identifier: same entry in the same list always hashes
    /// to the same id across re-syncs.
    fn stable_id(repository_id: &str, name: &str, url: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(repository_id.as_bytes());
        hasher.update(b"#");
        hasher.update(name.as_bytes());
        hasher.update(b"#");
        hasher.update(url.unwrap_or("").as_bytes());
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

/// Flattened join of a project with its owning repository, submitted to the
/// search index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectDocument {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub github_url: Option<String>,
    pub category: Option<String>,
    pub stars: Option<u64>,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub repository_id: String,
    pub repository_name: String,
    #[serde(default)]
    pub repository_topics: Vec<String>,
}

impl ProjectDocument {
    /// Join a project record with its owning repository's name and topics.
    pub fn from_record(
        record: &ProjectRecord,
        repository_name: &str,
        repository_topics: &[String],
    ) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            description: record.description.clone(),
            url: record.url.clone(),
            github_url: record.github_url.clone(),
            category: record.category.clone(),
            stars: record.stars,
            language: record.language.clone(),
            topics: record.topics.clone(),
            repository_id: record.repository_id.clone(),
            repository_name: repository_name.to_string(),
            repository_topics: repository_topics.to_vec(),
        }
    }
}
