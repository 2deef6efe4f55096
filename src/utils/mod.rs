//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use url::{full_name_from_url, is_github_host, is_valid_project_url};
