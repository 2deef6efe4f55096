// src/services/extractor.rs

//! Markdown project extractor.
//!
//! Recovers structured project entries from awesome-list markdown. The
//! extractor is line-oriented: it does not track code-fence state, so a
//! link line inside a fenced block is extracted like any other (known
//! limitation of the format, which has no schema to validate against).

use regex::Regex;

use crate::models::ParsedProject;
use crate::utils::url::{full_name_from_url, is_valid_project_url};

/// The list-entry conventions recognized by the extractor, in priority
/// order. The first matching pattern wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPattern {
    /// `- [Name](url) - Description` (also en/em dash separators)
    Dashed,
    /// `- [Name](url): Description`
    Colon,
    /// `- [Name](url) Description` with no separator
    Plain,
    /// `- [Name](url)` with no description
    Bare,
}

impl EntryPattern {
    /// All patterns, most specific first.
    const PRIORITY: [EntryPattern; 4] = [
        EntryPattern::Dashed,
        EntryPattern::Colon,
        EntryPattern::Plain,
        EntryPattern::Bare,
    ];

    fn regex(self) -> Regex {
        let source = match self {
            EntryPattern::Dashed => r"^\s*[-*]\s*\[([^\]]+)\]\(([^)]+)\)\s*[-–—]\s*(.+)$",
            EntryPattern::Colon => r"^\s*[-*]\s*\[([^\]]+)\]\(([^)]+)\):\s*(.+)$",
            EntryPattern::Plain => r"^\s*[-*]\s*\[([^\]]+)\]\(([^)]+)\)\s+([^-–—:].+)$",
            EntryPattern::Bare => r"^\s*[-*]\s*\[([^\]]+)\]\(([^)]+)\)\s*$",
        };
        Regex::new(source).expect("entry pattern must compile")
    }
}

/// Extractor for project entries in awesome-list markdown.
///
/// Pure and deterministic: extraction never fails, unparsable lines are
/// skipped.
pub struct MarkdownExtractor {
    patterns: Vec<(EntryPattern, Regex)>,
    heading: Regex,
    emoji_code: Regex,
}

impl MarkdownExtractor {
    pub fn new() -> Self {
        Self {
            patterns: EntryPattern::PRIORITY
                .iter()
                .map(|p| (*p, p.regex()))
                .collect(),
            heading: Regex::new(r"^#+\s*(.+)$").expect("heading pattern must compile"),
            emoji_code: Regex::new(r":\w+:").expect("emoji pattern must compile"),
        }
    }

    /// Extract all project entries from a markdown document, in document
    /// order. Each entry's category is the cleaned text of the nearest
    /// preceding section heading.
    pub fn extract(&self, content: &str) -> Vec<ParsedProject> {
        let mut projects = Vec::new();
        let mut current_category: Option<String> = None;

        for line in content.lines() {
            // A heading updates the category and never yields an entry,
            // even when it contains a link.
            if let Some(caps) = self.heading.captures(line) {
                current_category = Some(self.clean_category(&caps[1]));
                continue;
            }

            if let Some(project) = self.parse_line(line, current_category.as_deref()) {
                projects.push(project);
            }
        }

        projects
    }

    /// Parse a single line against the pattern list. Returns `None` when no
    /// pattern matches or the captured URL is invalid.
    fn parse_line(&self, line: &str, category: Option<&str>) -> Option<ParsedProject> {
        for (_, regex) in &self.patterns {
            let Some(caps) = regex.captures(line) else {
                continue;
            };

            let name = caps[1].trim().to_string();
            let url = caps[2].trim().to_string();
            let description = caps
                .get(3)
                .map(|m| m.as_str().trim().to_string())
                .filter(|d| !d.is_empty());

            if !is_valid_project_url(&url) {
                return None;
            }

            return Some(ParsedProject {
                name,
                description,
                url: Some(url),
                category: category.map(str::to_string),
                raw_markdown: line.trim().to_string(),
            });
        }

        None
    }

    /// Clean a heading for use as a category: strip markup characters and
    /// `:emoji:` shortcodes, collapse whitespace, trim.
    fn clean_category(&self, heading: &str) -> String {
        let without_markup: String = heading
            .chars()
            .filter(|c| !matches!(c, '#' | '*' | '_' | '`' | '~'))
            .collect();
        let without_emoji = self.emoji_code.replace_all(&without_markup, "");
        without_emoji
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Extract an `owner/name` pair from a GitHub repository URL.
    pub fn extract_full_name(&self, url: &str) -> Option<String> {
        full_name_from_url(url)
    }
}

impl Default for MarkdownExtractor {
    fn default() -> Self {
        Self::new()
    }
}
