//! [`GithubContentSource`] — the production [`ContentSource`] implementation.
//!
//! GitHub has no official wiki content API, so retrieval is layered:
//! a structured query against the REST API where one exists, then the
//! raw-content host, then the web host with markup extraction.

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use wikiport_shared::{Result, WikiportError};

use crate::{ContentSource, GithubSourceConfig, RepoRef, WikiPage};

/// User-Agent string for all requests.
const USER_AGENT: &str = concat!("wikiport/", env!("CARGO_PKG_VERSION"));

/// Maximum redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Conventionally-named wiki pages probed when listing strategies fail.
/// `Home` is checked first; every GitHub wiki has one.
const CONVENTIONAL_PAGES: &[&str] = &[
    "Getting-Started",
    "Installation",
    "Usage",
    "Configuration",
    "FAQ",
    "Troubleshooting",
    "Documentation",
];

/// Content source backed by the GitHub API and content hosts.
pub struct GithubContentSource {
    config: GithubSourceConfig,
    client: Client,
}

impl GithubContentSource {
    /// Create a source with the given connection settings.
    pub fn new(config: GithubSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WikiportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// GET a URL with the configured auth token, if any.
    async fn get(&self, url: &str) -> reqwest::Result<reqwest::Response> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.config.token {
            request = request.header("Authorization", format!("token {token}"));
        }
        request.send().await
    }

    /// Read the `has_wiki` flag from the repository metadata endpoint.
    async fn metadata_has_wiki(&self, repo: &RepoRef) -> Result<bool> {
        let url = format!("{}/repos/{}/{}", self.config.api_base, repo.owner, repo.name);
        let response = self
            .get(&url)
            .await
            .map_err(|e| WikiportError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WikiportError::Network(format!("{url}: HTTP {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WikiportError::Network(format!("{url}: invalid JSON: {e}")))?;

        Ok(body.get("has_wiki").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    /// Directly probe the wiki pages endpoint. The `has_wiki` metadata flag
    /// is known to be stale for some repositories.
    async fn probe_wiki_pages(&self, repo: &RepoRef) -> bool {
        let url = format!(
            "{}/repos/{}/{}/wiki/pages",
            self.config.api_base, repo.owner, repo.name
        );
        match self.get(&url).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(repo = %repo, error = %e, "wiki probe failed");
                false
            }
        }
    }

    /// Listing strategy 1: the structured wiki pages endpoint.
    async fn list_pages_via_api(&self, repo: &RepoRef) -> Option<Vec<WikiPage>> {
        let url = format!(
            "{}/repos/{}/{}/wiki/pages",
            self.config.api_base, repo.owner, repo.name
        );
        let response = match self.get(&url).await {
            Ok(r) => r,
            Err(e) => {
                debug!(repo = %repo, error = %e, "wiki pages API unreachable");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(repo = %repo, status = %response.status(), "wiki pages API rejected");
            return None;
        }

        let body: serde_json::Value = response.json().await.ok()?;
        let pages: Vec<WikiPage> = body
            .as_array()?
            .iter()
            .filter_map(|page| {
                let name = page.get("title").and_then(|v| v.as_str())?;
                let path = page.get("path").and_then(|v| v.as_str())?;
                Some(WikiPage {
                    name: name.to_string(),
                    path: path.to_string(),
                })
            })
            .collect();

        if pages.is_empty() { None } else { Some(pages) }
    }

    /// Listing strategy 2: scrape the wiki sidebar on the web host.
    async fn list_pages_via_scrape(&self, repo: &RepoRef) -> Option<Vec<WikiPage>> {
        let url = format!("{}/{}/{}/wiki", self.config.web_base, repo.owner, repo.name);
        let response = match self.get(&url).await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(repo = %repo, status = %r.status(), "wiki web page rejected");
                return None;
            }
            Err(e) => {
                debug!(repo = %repo, error = %e, "wiki web page unreachable");
                return None;
            }
        };

        let body = response.text().await.ok()?;
        let pages = scrape_wiki_links(&body, repo);
        if pages.is_empty() {
            None
        } else {
            info!(repo = %repo, pages = pages.len(), "wiki pages found by scraping sidebar");
            Some(pages)
        }
    }

    /// Listing strategy 3: probe a fixed set of conventionally-named pages.
    async fn list_pages_via_probe(&self, repo: &RepoRef) -> Option<Vec<WikiPage>> {
        let mut pages = Vec::new();

        for path in std::iter::once("Home").chain(CONVENTIONAL_PAGES.iter().copied()) {
            let url = format!(
                "{}/wiki/{}/{}/{}.md",
                self.config.raw_base, repo.owner, repo.name, path
            );
            match self.get(&url).await {
                Ok(response) if response.status().is_success() => {
                    pages.push(WikiPage {
                        name: path.replace('-', " "),
                        path: path.to_string(),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(repo = %repo, page = path, error = %e, "conventional page probe failed");
                }
            }
        }

        if pages.is_empty() {
            None
        } else {
            info!(repo = %repo, pages = pages.len(), "wiki pages found by probing");
            Some(pages)
        }
    }
}

#[async_trait::async_trait]
impl ContentSource for GithubContentSource {
    fn extract_repo(&self, url: &str) -> Result<RepoRef> {
        let parsed = Url::parse(url)
            .map_err(|e| WikiportError::invalid_repository(format!("{url}: {e}")))?;

        let host = parsed.host_str().unwrap_or("");
        if host != "github.com" && !host.ends_with(".github.com") {
            return Err(WikiportError::invalid_repository(format!(
                "not a GitHub URL: {url}"
            )));
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(WikiportError::invalid_repository(format!(
                "missing owner/repo path: {url}"
            )));
        }

        Ok(RepoRef {
            owner: segments[0].to_string(),
            name: segments[1].trim_end_matches(".git").to_string(),
        })
    }

    async fn has_wiki(&self, repo: &RepoRef) -> bool {
        match self.metadata_has_wiki(repo).await {
            Ok(true) => true,
            // The flag is a hint only: confirm absence with a direct probe.
            Ok(false) => self.probe_wiki_pages(repo).await,
            Err(e) => {
                warn!(repo = %repo, error = %e, "wiki check failed, probing directly");
                self.probe_wiki_pages(repo).await
            }
        }
    }

    async fn list_wiki_pages(&self, repo: &RepoRef) -> Vec<WikiPage> {
        if let Some(pages) = self.list_pages_via_api(repo).await {
            return pages;
        }
        if let Some(pages) = self.list_pages_via_scrape(repo).await {
            return pages;
        }
        if let Some(pages) = self.list_pages_via_probe(repo).await {
            return pages;
        }

        debug!(repo = %repo, "no wiki pages found by any listing strategy");
        Vec::new()
    }

    async fn wiki_page_content(&self, repo: &RepoRef, path: &str) -> String {
        // Don't double-encode paths that already carry percent escapes.
        let encoded = if path.contains('%') {
            path.to_string()
        } else {
            encode_wiki_path(path)
        };

        let raw = &self.config.raw_base;
        let mut candidates = vec![
            format!("{raw}/wiki/{}/{}/{encoded}.md", repo.owner, repo.name),
            format!("{raw}/wiki/{}/{}/{encoded}", repo.owner, repo.name),
        ];
        if encoded != path {
            candidates.push(format!("{raw}/wiki/{}/{}/{path}.md", repo.owner, repo.name));
            candidates.push(format!("{raw}/wiki/{}/{}/{path}", repo.owner, repo.name));
        }

        let mut last_error: Option<String> = None;
        for url in &candidates {
            match self.get(url).await {
                Ok(response) if response.status().is_success() => {
                    match response.text().await {
                        Ok(text) => {
                            debug!(%url, "fetched wiki page content");
                            return text;
                        }
                        Err(e) => last_error = Some(e.to_string()),
                    }
                }
                Ok(_) => {}
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        // Last resort: the rendered web page, converted back to markdown.
        let web_url = format!(
            "{}/{}/{}/wiki/{encoded}",
            self.config.web_base, repo.owner, repo.name
        );
        match self.get(&web_url).await {
            Ok(response) if response.status().is_success() => {
                if let Ok(body) = response.text().await {
                    if let Some(markdown) = extract_rendered_markup(&body) {
                        debug!(url = %web_url, "extracted wiki page from web markup");
                        return markdown;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => last_error = Some(e.to_string()),
        }

        warn!(repo = %repo, page = path, "all attempts to fetch wiki page failed");
        match last_error {
            Some(err) => format!("*Error fetching content for {path}: {err}*"),
            None => format!("*Could not fetch content for {path}*"),
        }
    }

    async fn readme(&self, repo: &RepoRef) -> Result<Option<String>> {
        let url = format!(
            "{}/repos/{}/{}/readme",
            self.config.api_base, repo.owner, repo.name
        );
        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.raw+json");
        if let Some(token) = &self.config.token {
            request = request.header("Authorization", format!("token {token}"));
        }
        let response = request
            .send()
            .await
            .map_err(|e| WikiportError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(WikiportError::Network(format!("{url}: HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| WikiportError::Network(format!("{url}: body read failed: {e}")))?;
        Ok(Some(text))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Percent-encode a wiki page path, with spaces normalized to hyphens first
/// (the wiki's own filename convention).
fn encode_wiki_path(path: &str) -> String {
    let normalized = path.replace(' ', "-");
    let mut out = String::with_capacity(normalized.len());
    for byte in normalized.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Pull wiki page links out of the wiki web page's sidebar markup.
fn scrape_wiki_links(html: &str, repo: &RepoRef) -> Vec<WikiPage> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("static selector");
    let prefix = format!("/{}/{}/wiki/", repo.owner, repo.name);

    let mut pages: Vec<WikiPage> = Vec::new();
    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(path) = href.strip_prefix(prefix.as_str()) else {
            continue;
        };
        // Skip layout pages (_Sidebar, _Footer) and non-page routes.
        if path.is_empty() || path.starts_with('_') || path.contains('/') {
            continue;
        }

        let name = el.text().collect::<String>().trim().to_string();
        if name.is_empty() {
            continue;
        }
        if pages.iter().any(|p| p.path == path) {
            continue;
        }
        pages.push(WikiPage {
            name,
            path: path.to_string(),
        });
    }
    pages
}

/// Extract the rendered wiki body from web-host HTML and convert it back
/// to markdown.
fn extract_rendered_markup(html: &str) -> Option<String> {
    let body_html = {
        let doc = Html::parse_document(html);
        let body_sel = Selector::parse(".markdown-body").expect("static selector");
        doc.select(&body_sel).next().map(|el| el.inner_html())?
    };

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .build();

    match converter.convert(&body_html) {
        Ok(markdown) if !markdown.trim().is_empty() => Some(markdown),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "markup extraction failed");
            None
        }
    }
}
