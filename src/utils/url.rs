// src/utils/url.rs

//! URL validation and GitHub URL helpers.

use url::Url;

/// Check whether a link target is usable as a project URL.
///
/// Rejects empty strings, anchor-only targets, and relative fragments;
/// accepts only absolute references with a host component.
///
/// # Examples
/// ```
/// use awesome_sync::utils::url::is_valid_project_url;
///
/// assert!(is_valid_project_url("https://example.com/tool"));
/// assert!(!is_valid_project_url("#contents"));
/// assert!(!is_valid_project_url(""));
/// ```
pub fn is_valid_project_url(url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return false;
    }

    if trimmed.starts_with('#') {
        return false;
    }

    // Relative fragments like "docs/page#section"
    if trimmed.contains('#') && !trimmed.starts_with("http") {
        return false;
    }

    match Url::parse(trimmed) {
        Ok(parsed) => parsed.has_host(),
        Err(_) => false,
    }
}

/// Check whether a URL points at github.com.
pub fn is_github_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|h| h == "github.com" || h == "www.github.com")
        .unwrap_or(false)
}

/// Extract an `owner/name` pair from a GitHub repository URL.
///
/// Returns `None` for non-GitHub hosts and for URLs with fewer than two
/// path segments.
///
/// # Examples
/// ```
/// use awesome_sync::utils::url::full_name_from_url;
///
/// assert_eq!(
///     full_name_from_url("https://github.com/rust-lang/rust"),
///     Some("rust-lang/rust".to_string())
/// );
/// assert_eq!(full_name_from_url("https://github.com/rust-lang"), None);
/// assert_eq!(full_name_from_url("https://example.com/a/b"), None);
/// ```
pub fn full_name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if host != "github.com" && host != "www.github.com" {
        return None;
    }

    let mut segments = parsed
        .path_segments()?
        .filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let name = segments.next()?;
    Some(format!("{owner}/{name}"))
}
