//! Local file-backed search index.
//!
//! Writes two JSON files under the index directory:
//!
//! ```text
//! {root}/index/
//! ├── documents.json   # All indexed project documents
//! └── tokens.json      # Inverted index: token -> sorted document ids
//! ```
//!
//! The token file enables client-side search without a search engine.
//! Submitting documents replaces the submitting repositories' previous
//! documents and rebuilds the token map.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AppError, Result};
use crate::index::SearchIndex;
use crate::models::ProjectDocument;

/// Minimum token length kept in the token map.
const MIN_TOKEN_LENGTH: usize = 2;

/// Inverted index written to `tokens.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenIndex {
    /// Version for cache busting
    pub version: u32,
    pub document_count: usize,
    pub token_count: usize,
    /// token -> sorted document ids
    pub index: BTreeMap<String, Vec<String>>,
}

/// Local filesystem index backend.
pub struct LocalIndex {
    root_dir: PathBuf,
}

impl LocalIndex {
    /// Create a new LocalIndex rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn documents_path(&self) -> PathBuf {
        self.root_dir.join("index").join("documents.json")
    }

    fn tokens_path(&self) -> PathBuf {
        self.root_dir.join("index").join("tokens.json")
    }

    async fn write_json<T: Serialize>(&self, path: &PathBuf, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_documents(&self) -> Result<Vec<ProjectDocument>> {
        match tokio::fs::read(self.documents_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Currently indexed documents.
    pub async fn documents(&self) -> Result<Vec<ProjectDocument>> {
        self.read_documents().await
    }

    /// Currently written token index.
    pub async fn tokens(&self) -> Result<TokenIndex> {
        match tokio::fs::read(self.tokens_path()).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TokenIndex::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn build_token_index(documents: &[ProjectDocument]) -> TokenIndex {
        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for document in documents {
            let mut tokens = Vec::new();
            tokens.extend(tokenize(&document.name));
            if let Some(description) = &document.description {
                tokens.extend(tokenize(description));
            }
            if let Some(category) = &document.category {
                tokens.extend(tokenize(category));
            }
            if let Some(language) = &document.language {
                tokens.extend(tokenize(language));
            }
            tokens.extend(tokenize(&document.repository_name));
            for topic in document.topics.iter().chain(&document.repository_topics) {
                tokens.extend(tokenize(topic));
            }

            for token in tokens {
                index.entry(token).or_default().insert(document.id.clone());
            }
        }

        let token_count = index.len();
        TokenIndex {
            version: 1,
            document_count: documents.len(),
            token_count,
            index: index
                .into_iter()
                .map(|(token, ids)| (token, ids.into_iter().collect()))
                .collect(),
        }
    }
}

#[async_trait]
impl SearchIndex for LocalIndex {
    async fn index_documents(&self, documents: &[ProjectDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let incoming: HashSet<&str> = documents
            .iter()
            .map(|d| d.repository_id.as_str())
            .collect();

        let mut merged: Vec<ProjectDocument> = self
            .read_documents()
            .await?
            .into_iter()
            .filter(|d| !incoming.contains(d.repository_id.as_str()))
            .collect();
        merged.extend(documents.iter().cloned());

        self.write_json(&self.documents_path(), &merged).await?;
        self.write_json(&self.tokens_path(), &Self::build_token_index(&merged))
            .await
    }

    async fn clear(&self) -> Result<()> {
        for path in [self.documents_path(), self.tokens_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(AppError::Io(e)),
            }
        }
        Ok(())
    }
}

/// Tokenize a string into normalized keywords.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .unicode_words()
        .filter(|word| word.len() >= MIN_TOKEN_LENGTH)
        .filter(|word| !is_stopword(word))
        .map(String::from)
        .collect()
}

/// Check if a word is a common stopword.
fn is_stopword(word: &str) -> bool {
    const STOPWORDS: &[&str] = &[
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "have", "has", "had", "do",
        "does", "did", "will", "would", "could", "should", "can", "of", "to", "in", "for", "on",
        "with", "at", "by", "from", "as", "or", "and", "but", "if", "then", "so", "than",
        // Common URL artifacts
        "http", "https", "www", "com", "io", "html",
    ];
    STOPWORDS.contains(&word)
}
