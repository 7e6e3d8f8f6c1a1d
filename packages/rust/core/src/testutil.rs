//! In-memory collaborator fakes for command and pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use wikiport_github::{ContentSource, RepoRef, WikiPage};
use wikiport_shared::{
    Event, EventKind, ExportFile, FileId, Job, JobId, Result, WikiportError,
};

use crate::ports::{BlobStorage, EventPublisher, FileRepository, JobRepository, StoredBlob};

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// In-memory job repository; deleting a job cascades its file records,
/// matching the database behavior.
pub(crate) struct MemoryJobs {
    jobs: Mutex<Vec<Job>>,
    files: std::sync::Arc<MemoryFiles>,
}

impl MemoryJobs {
    pub(crate) fn new(files: std::sync::Arc<MemoryFiles>) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            files,
        }
    }
}

#[async_trait]
impl JobRepository for MemoryJobs {
    async fn add(&self, job: &Job) -> Result<()> {
        self.jobs.lock().expect("lock").push(job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self
            .jobs
            .lock()
            .expect("lock")
            .iter()
            .find(|j| j.id == id)
            .cloned())
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.lock().expect("lock");
        match jobs.iter_mut().find(|j| j.id == job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(WikiportError::JobNotFound(job.id)),
        }
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Job>> {
        let jobs = self.jobs.lock().expect("lock");
        Ok(jobs
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: JobId) -> Result<()> {
        self.jobs.lock().expect("lock").retain(|j| j.id != id);
        self.files
            .files
            .lock()
            .expect("lock")
            .retain(|f| f.job_id != id);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory file repository.
#[derive(Default)]
pub(crate) struct MemoryFiles {
    files: Mutex<Vec<ExportFile>>,
}

#[async_trait]
impl FileRepository for MemoryFiles {
    async fn add(&self, file: &ExportFile) -> Result<()> {
        self.files.lock().expect("lock").push(file.clone());
        Ok(())
    }

    async fn get(&self, id: FileId) -> Result<Option<ExportFile>> {
        Ok(self
            .files
            .lock()
            .expect("lock")
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }

    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<ExportFile>> {
        Ok(self
            .files
            .lock()
            .expect("lock")
            .iter()
            .filter(|f| f.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: FileId) -> Result<()> {
        self.files.lock().expect("lock").retain(|f| f.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob storage
// ---------------------------------------------------------------------------

/// In-memory blob store with injectable delete failures.
#[derive(Default)]
pub(crate) struct MemoryBlobs {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    failing_deletes: Mutex<HashSet<String>>,
    delete_attempts: Mutex<u32>,
}

impl MemoryBlobs {
    /// Seed a blob directly and return its location.
    pub(crate) fn put_for_test(&self, job_id: JobId, filename: &str, bytes: &[u8]) -> String {
        let location = format!("{job_id}/{filename}");
        self.blobs
            .lock()
            .expect("lock")
            .insert(location.clone(), bytes.to_vec());
        location
    }

    /// Make future deletes of `location` error.
    pub(crate) fn fail_delete_of(&self, location: &str) {
        self.failing_deletes
            .lock()
            .expect("lock")
            .insert(location.to_string());
    }

    pub(crate) fn delete_attempts(&self) -> u32 {
        *self.delete_attempts.lock().expect("lock")
    }

    pub(crate) fn stored_count(&self) -> usize {
        self.blobs.lock().expect("lock").len()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobs {
    async fn store(&self, bytes: &[u8], filename: &str, job_id: JobId) -> Result<StoredBlob> {
        let location = format!("{job_id}/{filename}");
        self.blobs
            .lock()
            .expect("lock")
            .insert(location.clone(), bytes.to_vec());
        Ok(StoredBlob {
            location,
            size_bytes: bytes.len() as u64,
        })
    }

    async fn fetch(&self, location: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().expect("lock").get(location).cloned())
    }

    async fn delete(&self, location: &str) -> Result<bool> {
        *self.delete_attempts.lock().expect("lock") += 1;
        if self.failing_deletes.lock().expect("lock").contains(location) {
            return Err(WikiportError::Storage(format!(
                "injected delete failure for {location}"
            )));
        }
        Ok(self.blobs.lock().expect("lock").remove(location).is_some())
    }

    async fn retrieval_url(&self, location: &str, _expires_in: Duration) -> Result<String> {
        Ok(format!("memory://{location}"))
    }
}

// ---------------------------------------------------------------------------
// Event publisher
// ---------------------------------------------------------------------------

/// Publisher that records events for ordering assertions.
#[derive(Default)]
pub(crate) struct RecordingPublisher {
    events: Mutex<Vec<Event>>,
}

impl RecordingPublisher {
    /// Variant tags of all published events, in publish order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("lock")
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Percentages of the published progress events, in order.
    pub(crate) fn progress_percentages(&self) -> Vec<u8> {
        self.events
            .lock()
            .expect("lock")
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::JobProgressUpdated { percentage, .. } => Some(*percentage),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: Event) {
        self.events.lock().expect("lock").push(event);
    }
}

// ---------------------------------------------------------------------------
// Content source
// ---------------------------------------------------------------------------

/// Scriptable content source for pipeline tests.
///
/// Defaults to a repository with no wiki and no README.
#[derive(Default)]
pub(crate) struct FakeSource {
    wiki: Option<Vec<(String, String)>>,
    unfetchable: HashSet<String>,
    readme: Option<String>,
    readme_errors: bool,
}

impl FakeSource {
    /// Enable the wiki with `(name, content)` pages; pass an empty slice for
    /// "wiki flag set but listing empty".
    pub(crate) fn with_wiki(mut self, pages: &[(&str, &str)]) -> Self {
        self.wiki = Some(
            pages
                .iter()
                .map(|(n, c)| (n.to_string(), c.to_string()))
                .collect(),
        );
        self
    }

    pub(crate) fn with_readme(mut self, content: &str) -> Self {
        self.readme = Some(content.to_string());
        self
    }

    pub(crate) fn with_readme_error(mut self) -> Self {
        self.readme_errors = true;
        self
    }

    /// Make one page's content unavailable, exercising the inline
    /// placeholder contract.
    pub(crate) fn with_unfetchable_page(mut self, name: &str) -> Self {
        self.unfetchable.insert(name.to_string());
        self
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    fn extract_repo(&self, url: &str) -> Result<RepoRef> {
        let rest = url
            .strip_prefix("https://github.com/")
            .ok_or_else(|| WikiportError::invalid_repository(format!("not a GitHub URL: {url}")))?;
        let mut parts = rest.split('/').filter(|s| !s.is_empty());
        match (parts.next(), parts.next()) {
            (Some(owner), Some(name)) => Ok(RepoRef {
                owner: owner.to_string(),
                name: name.trim_end_matches(".git").to_string(),
            }),
            _ => Err(WikiportError::invalid_repository(format!(
                "missing owner/repo path: {url}"
            ))),
        }
    }

    async fn has_wiki(&self, _repo: &RepoRef) -> bool {
        self.wiki.is_some()
    }

    async fn list_wiki_pages(&self, _repo: &RepoRef) -> Vec<WikiPage> {
        self.wiki
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|(name, _)| WikiPage {
                name: name.clone(),
                path: name.replace(' ', "-"),
            })
            .collect()
    }

    async fn wiki_page_content(&self, _repo: &RepoRef, path: &str) -> String {
        if self.unfetchable.contains(path) {
            return format!("*Error fetching content for {path}: connection reset*");
        }
        self.wiki
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|(name, _)| name.replace(' ', "-") == path)
            .map(|(_, content)| content.clone())
            .unwrap_or_else(|| format!("*Could not fetch content for {path}*"))
    }

    async fn readme(&self, repo: &RepoRef) -> Result<Option<String>> {
        if self.readme_errors {
            return Err(WikiportError::Network(format!(
                "api.github.com/repos/{repo}: HTTP 500"
            )));
        }
        Ok(self.readme.clone())
    }
}
