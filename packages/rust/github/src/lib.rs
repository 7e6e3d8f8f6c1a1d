//! GitHub content source: wiki pages and README retrieval.
//!
//! [`ContentSource`] is the capability set the export pipeline consumes;
//! [`GithubContentSource`] implements it against api.github.com,
//! raw.githubusercontent.com, and the github.com web host. Apart from URL
//! parsing, every operation degrades instead of failing: an unreachable
//! wiki check reads as "no wiki", a failed page fetch becomes an inline
//! placeholder, and only the README fetch reports repository-level errors
//! to the caller.

mod source;

use async_trait::async_trait;

use wikiport_shared::{AppConfig, Result};

pub use source::GithubContentSource;

// ---------------------------------------------------------------------------
// Repository reference
// ---------------------------------------------------------------------------

/// An `owner/name` pair parsed from a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name, without a `.git` suffix.
    pub name: String,
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One wiki page as listed by the content source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    /// Display name (e.g. "Getting Started").
    pub name: String,
    /// Path component used to fetch the page (e.g. "Getting-Started").
    pub path: String,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Capability set for retrieving repository content.
///
/// Implemented by [`GithubContentSource`] in production and by in-memory
/// fakes in the core crate's pipeline tests.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Parse a repository reference out of a URL.
    ///
    /// This is the only hard failure in content acquisition: a URL that is
    /// not a recognizable repository reference aborts the export.
    fn extract_repo(&self, url: &str) -> Result<RepoRef>;

    /// Whether the repository exposes a wiki. Best-effort: the answer is a
    /// hint, and query failures degrade to `false`.
    async fn has_wiki(&self, repo: &RepoRef) -> bool;

    /// Ordered list of wiki pages. All listing failures degrade to an
    /// empty list, which callers treat as "no wiki pages".
    async fn list_wiki_pages(&self, repo: &RepoRef) -> Vec<WikiPage>;

    /// Content of a single wiki page. Never fails: if every retrieval
    /// strategy is exhausted, the returned text is an inline placeholder
    /// describing the failure.
    async fn wiki_page_content(&self, repo: &RepoRef, path: &str) -> String;

    /// README text. `Ok(None)` when the repository has no README; `Err`
    /// when the repository itself cannot be queried.
    async fn readme(&self, repo: &RepoRef) -> Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`GithubContentSource`].
///
/// The base URLs are overridable so tests can point the source at a mock
/// server; production code uses [`GithubSourceConfig::default`] plus the
/// token and timeout from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct GithubSourceConfig {
    /// API token sent as `Authorization: token …`, if available.
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// REST API base (default `https://api.github.com`).
    pub api_base: String,
    /// Raw content base (default `https://raw.githubusercontent.com`).
    pub raw_base: String,
    /// Web host base (default `https://github.com`).
    pub web_base: String,
}

impl Default for GithubSourceConfig {
    fn default() -> Self {
        Self {
            token: None,
            timeout_secs: 30,
            api_base: "https://api.github.com".into(),
            raw_base: "https://raw.githubusercontent.com".into(),
            web_base: "https://github.com".into(),
        }
    }
}

impl GithubSourceConfig {
    /// Build connection settings from the loaded application config.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            token: config.github_token(),
            timeout_secs: config.github.timeout_secs,
            ..Self::default()
        }
    }
}
