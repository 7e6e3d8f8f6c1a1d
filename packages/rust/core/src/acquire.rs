//! Content acquisition: assemble one markdown blob for a repository.
//!
//! The fallback ladder is modeled as explicit ordered attempts over a
//! tagged [`Fetched`] result — wiki pages first, then the README, then a
//! synthesized placeholder — rather than error propagation. Past URL
//! parsing (handled by the pipeline before calling in here), nothing in
//! this module fails the job: every miss degrades toward the best
//! available content.

use tracing::{info, warn};

use wikiport_github::RepoRef;
use wikiport_shared::{Job, Result};

use crate::pipeline::ExportPipeline;

/// Outcome of a single acquisition attempt.
enum Fetched {
    /// The attempt produced usable content.
    Available(String),
    /// The attempt found nothing; try the next rung.
    Unavailable,
    /// The repository itself could not be queried.
    Failed(String),
}

impl ExportPipeline {
    /// Produce the content blob for `repo`, reporting progress on `job`
    /// along the way.
    pub(crate) async fn acquire_content(&self, job: &mut Job, repo: &RepoRef) -> Result<String> {
        self.update_progress(job, 10, format!("Checking repository {repo}"))
            .await?;

        if self.source.has_wiki(repo).await {
            self.update_progress(job, 20, "Repository has wiki enabled. Fetching wiki pages...")
                .await?;

            match self.assemble_wiki(job, repo).await? {
                Fetched::Available(content) => return Ok(content),
                Fetched::Unavailable => {
                    self.update_progress(
                        job,
                        25,
                        "No wiki pages found despite wiki being enabled. Falling back to README.",
                    )
                    .await?;
                }
                // assemble_wiki never reports repository failure itself
                Fetched::Failed(_) => unreachable!("wiki assembly does not fail"),
            }
        } else {
            self.update_progress(job, 20, "No wiki found for repository, fetching README")
                .await?;
        }

        match self.fetch_readme(repo).await {
            Fetched::Available(content) => {
                self.update_progress(job, 30, "Retrieved README content successfully")
                    .await?;
                Ok(content)
            }
            Fetched::Unavailable => {
                self.update_progress(job, 30, "No wiki or README found").await?;
                Ok(format!(
                    "# {}\n\nNo wiki or README found for this repository.",
                    repo.name
                ))
            }
            Fetched::Failed(err) => {
                warn!(repo = %repo, error = %err, "repository unreachable, synthesizing error blob");
                self.update_progress(job, 30, format!("Error accessing repository: {err}"))
                    .await?;
                Ok(format!(
                    "# {}\n\nError accessing repository: {err}",
                    repo.name
                ))
            }
        }
    }

    /// Attempt the wiki rung: list pages and concatenate their content.
    ///
    /// A single page fetch never aborts the run — the content source embeds
    /// an inline placeholder for pages it cannot retrieve.
    async fn assemble_wiki(&self, job: &mut Job, repo: &RepoRef) -> Result<Fetched> {
        let pages = self.source.list_wiki_pages(repo).await;
        if pages.is_empty() {
            return Ok(Fetched::Unavailable);
        }

        info!(repo = %repo, pages = pages.len(), "assembling wiki pages");
        self.update_progress(job, 25, format!("Found {} wiki pages", pages.len()))
            .await?;

        let total = pages.len();
        let mut content = String::new();
        for (i, page) in pages.iter().enumerate() {
            // Interpolate page progress linearly across the 25–60% band.
            let percentage = 25 + ((i * 35) / total) as u8;
            self.update_progress(
                job,
                percentage,
                format!("Processing page {}/{}: {}", i + 1, total, page.name),
            )
            .await?;

            let page_content = self.source.wiki_page_content(repo, &page.path).await;
            content.push_str(&format!("# {}\n\n{}\n\n---\n\n", page.name, page_content));
        }

        Ok(Fetched::Available(content))
    }

    /// Attempt the README rung, mapping the source's result to a tagged
    /// outcome.
    async fn fetch_readme(&self, repo: &RepoRef) -> Fetched {
        match self.source.readme(repo).await {
            Ok(Some(content)) => Fetched::Available(content),
            Ok(None) => Fetched::Unavailable,
            Err(e) => Fetched::Failed(e.to_string()),
        }
    }
}
