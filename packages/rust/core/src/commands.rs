//! Command handlers for export job operations.
//!
//! Each command is a read-modify-write-publish sequence against the
//! repositories. `NotFound` and invalid transitions surface to the caller;
//! blob deletion failures during the delete flows are logged and swallowed.

use std::sync::Arc;

use tracing::{info, warn};

use wikiport_shared::{Event, EventKind, ExportFile, FileId, Job, JobId, Result, WikiportError};

use crate::ports::{BlobStorage, EventPublisher, FileRepository, JobRepository};

/// Handlers for the job/file commands the core exposes to its callers.
pub struct JobCommands {
    jobs: Arc<dyn JobRepository>,
    files: Arc<dyn FileRepository>,
    blobs: Arc<dyn BlobStorage>,
    events: Arc<dyn EventPublisher>,
}

impl JobCommands {
    /// Wire up the command handlers against concrete collaborators.
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        files: Arc<dyn FileRepository>,
        blobs: Arc<dyn BlobStorage>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            jobs,
            files,
            blobs,
            events,
        }
    }

    /// Create a new job in `Pending` and announce it.
    ///
    /// The URL is accepted as-is; syntax validation happens when the
    /// pipeline parses it (or earlier, at an API boundary).
    pub async fn create(&self, repository_url: &str) -> Result<JobId> {
        let job = Job::create(repository_url);
        self.jobs.add(&job).await?;

        info!(job = %job.id, url = repository_url, "created export job");
        self.events
            .publish(Event::new(
                job.id,
                EventKind::JobCreated {
                    repository_url: job.repository_url.clone(),
                },
            ))
            .await;

        Ok(job.id)
    }

    /// Transition a job `Pending → Processing`.
    pub async fn start(&self, job_id: JobId) -> Result<()> {
        let mut job = self.get_job(job_id).await?;
        job.start()?;
        self.jobs.update(&job).await?;

        self.events
            .publish(Event::new(job.id, EventKind::JobStarted))
            .await;
        Ok(())
    }

    /// Record job progress.
    ///
    /// The entity accepts any in-range percentage; keeping updates
    /// non-decreasing is the caller's responsibility.
    pub async fn update_progress(
        &self,
        job_id: JobId,
        percentage: u8,
        message: &str,
    ) -> Result<()> {
        let mut job = self.get_job(job_id).await?;
        job.update_progress(percentage, message);
        self.jobs.update(&job).await?;

        self.events
            .publish(Event::new(
                job.id,
                EventKind::JobProgressUpdated {
                    percentage: job.progress_percentage,
                    message: message.to_string(),
                },
            ))
            .await;
        Ok(())
    }

    /// Transition a job `Processing → Failed`, recording the error.
    pub async fn fail(&self, job_id: JobId, error_message: &str) -> Result<()> {
        let mut job = self.get_job(job_id).await?;
        job.fail(error_message)?;
        self.jobs.update(&job).await?;

        self.events
            .publish(Event::new(
                job.id,
                EventKind::JobFailed {
                    error_message: error_message.to_string(),
                },
            ))
            .await;
        Ok(())
    }

    /// Delete a job, its file records, and (best-effort) their stored bytes.
    ///
    /// Blob deletion errors never block the job deletion; the job record
    /// delete cascades the file records.
    pub async fn delete(&self, job_id: JobId) -> Result<()> {
        let job = self.get_job(job_id).await?;

        let files = self.files.list_by_job(job.id).await?;
        for file in &files {
            match self.blobs.delete(&file.storage_location).await {
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        job = %job.id,
                        location = %file.storage_location,
                        error = %e,
                        "failed to delete stored blob, continuing"
                    );
                }
            }
        }

        self.jobs.delete(job.id).await?;
        info!(job = %job.id, files = files.len(), "deleted export job");

        self.events
            .publish(Event::new(job.id, EventKind::JobDeleted))
            .await;
        Ok(())
    }

    /// Delete a single export file record and (best-effort) its stored bytes.
    pub async fn delete_file(&self, file_id: FileId) -> Result<()> {
        let file = self
            .files
            .get(file_id)
            .await?
            .ok_or(WikiportError::FileNotFound(file_id))?;

        if let Err(e) = self.blobs.delete(&file.storage_location).await {
            warn!(
                file = %file.id,
                location = %file.storage_location,
                error = %e,
                "failed to delete stored blob, continuing"
            );
        }

        self.files.delete(file.id).await?;

        self.events
            .publish(Event::new(
                file.job_id,
                EventKind::FileDeleted {
                    file_id: file.id,
                    format: file.format,
                    filename: file.filename.clone(),
                },
            ))
            .await;
        Ok(())
    }

    async fn get_job(&self, job_id: JobId) -> Result<Job> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or(WikiportError::JobNotFound(job_id))
    }
}

/// Read-side queries over jobs and files.
pub struct JobQueries {
    jobs: Arc<dyn JobRepository>,
    files: Arc<dyn FileRepository>,
}

impl JobQueries {
    pub fn new(jobs: Arc<dyn JobRepository>, files: Arc<dyn FileRepository>) -> Self {
        Self { jobs, files }
    }

    /// Fetch a job by id.
    pub async fn job(&self, job_id: JobId) -> Result<Option<Job>> {
        self.jobs.get(job_id).await
    }

    /// List jobs, newest first.
    pub async fn jobs(&self, limit: u32, offset: u32) -> Result<Vec<Job>> {
        self.jobs.list(limit, offset).await
    }

    /// Fetch a file record by id.
    pub async fn file(&self, file_id: FileId) -> Result<Option<ExportFile>> {
        self.files.get(file_id).await
    }

    /// List a job's file records.
    pub async fn files(&self, job_id: JobId) -> Result<Vec<ExportFile>> {
        self.files.list_by_job(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MemoryBlobs, MemoryFiles, MemoryJobs, RecordingPublisher};
    use wikiport_shared::{FileFormat, JobStatus};

    struct Harness {
        commands: JobCommands,
        queries: JobQueries,
        jobs: Arc<MemoryJobs>,
        files: Arc<MemoryFiles>,
        blobs: Arc<MemoryBlobs>,
        published: Arc<RecordingPublisher>,
    }

    fn harness() -> Harness {
        let files = Arc::new(MemoryFiles::default());
        let jobs = Arc::new(MemoryJobs::new(files.clone()));
        let blobs = Arc::new(MemoryBlobs::default());
        let published = Arc::new(RecordingPublisher::default());
        Harness {
            commands: JobCommands::new(
                jobs.clone(),
                files.clone(),
                blobs.clone(),
                published.clone(),
            ),
            queries: JobQueries::new(jobs.clone(), files.clone()),
            jobs,
            files,
            blobs,
            published,
        }
    }

    #[tokio::test]
    async fn create_persists_and_announces() {
        let h = harness();
        let id = h
            .commands
            .create("https://github.com/acme/widgets")
            .await
            .expect("create");

        let job = h.queries.job(id).await.expect("query").expect("exists");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.repository_url, "https://github.com/acme/widgets");

        let names = h.published.names();
        assert_eq!(names, vec!["job_created"]);
    }

    #[tokio::test]
    async fn commands_on_unknown_job_are_not_found() {
        let h = harness();
        let missing = JobId::new();

        assert!(matches!(
            h.commands.start(missing).await,
            Err(WikiportError::JobNotFound(_))
        ));
        assert!(matches!(
            h.commands.update_progress(missing, 10, "x").await,
            Err(WikiportError::JobNotFound(_))
        ));
        assert!(matches!(
            h.commands.fail(missing, "boom").await,
            Err(WikiportError::JobNotFound(_))
        ));
        assert!(matches!(
            h.commands.delete(missing).await,
            Err(WikiportError::JobNotFound(_))
        ));
        assert!(h.published.names().is_empty());
    }

    #[tokio::test]
    async fn create_start_progress_fail_scenario() {
        let h = harness();
        let id = h
            .commands
            .create("https://github.com/acme/widgets")
            .await
            .expect("create");
        h.commands.start(id).await.expect("start");
        h.commands.update_progress(id, 10, "x").await.expect("progress");
        h.commands.fail(id, "boom").await.expect("fail");

        let job = h.queries.job(id).await.expect("query").expect("exists");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        // Fail leaves the progress where it was.
        assert_eq!(job.progress_percentage, 10);

        assert_eq!(
            h.published.names(),
            vec!["job_created", "job_started", "job_progress_updated", "job_failed"]
        );
    }

    #[tokio::test]
    async fn fail_on_terminal_job_is_rejected() {
        let h = harness();
        let id = h
            .commands
            .create("https://github.com/acme/widgets")
            .await
            .expect("create");
        h.commands.start(id).await.expect("start");
        h.commands.fail(id, "first").await.expect("fail");

        let result = h.commands.fail(id, "second").await;
        assert!(matches!(result, Err(WikiportError::InvalidTransition { .. })));

        let job = h.queries.job(id).await.expect("query").expect("exists");
        assert_eq!(job.error_message.as_deref(), Some("first"));
        // No second job_failed event.
        assert_eq!(
            h.published
                .names()
                .iter()
                .filter(|n| *n == "job_failed")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn delete_job_is_best_effort_about_blobs() {
        let h = harness();
        let id = h
            .commands
            .create("https://github.com/acme/widgets")
            .await
            .expect("create");

        // Two stored artifacts, one of which refuses to delete.
        let blob_a = h.blobs.put_for_test(id, "widgets_wiki.md", b"a");
        let blob_b = h.blobs.put_for_test(id, "widgets_wiki.pdf", b"b");
        h.blobs.fail_delete_of(&blob_b);

        let file_a = ExportFile::create(id, FileFormat::Markdown, "widgets_wiki.md", blob_a.as_str(), 1);
        let file_b = ExportFile::create(id, FileFormat::Pdf, "widgets_wiki.pdf", blob_b.as_str(), 1);
        h.files.add(&file_a).await.expect("add file");
        h.files.add(&file_b).await.expect("add file");

        h.commands.delete(id).await.expect("delete");

        assert!(h.queries.job(id).await.expect("query").is_none());
        // Both deletions were attempted; the cascade removed both records.
        assert_eq!(h.blobs.delete_attempts(), 2);
        assert!(h.queries.files(id).await.expect("query").is_empty());
        assert_eq!(h.published.names().last().map(String::as_str), Some("job_deleted"));
    }

    #[tokio::test]
    async fn delete_file_swallows_blob_errors() {
        let h = harness();
        let id = h
            .commands
            .create("https://github.com/acme/widgets")
            .await
            .expect("create");

        let blob = h.blobs.put_for_test(id, "widgets_wiki.epub", b"x");
        h.blobs.fail_delete_of(&blob);
        let file = ExportFile::create(id, FileFormat::Epub, "widgets_wiki.epub", blob.as_str(), 1);
        h.files.add(&file).await.expect("add file");

        h.commands.delete_file(file.id).await.expect("delete file");

        assert!(h.queries.file(file.id).await.expect("query").is_none());
        let names = h.published.names();
        assert_eq!(names.last().map(String::as_str), Some("file_deleted"));
    }

    #[tokio::test]
    async fn delete_unknown_file_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.commands.delete_file(FileId::new()).await,
            Err(WikiportError::FileNotFound(_))
        ));
        let _ = &h.jobs;
    }

    #[tokio::test]
    async fn list_jobs_is_newest_first() {
        let h = harness();
        let first = h
            .commands
            .create("https://github.com/acme/one")
            .await
            .expect("create");
        let second = h
            .commands
            .create("https://github.com/acme/two")
            .await
            .expect("create");

        let listed = h.queries.jobs(10, 0).await.expect("list");
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[1].id, first);

        let limited = h.queries.jobs(1, 1).await.expect("list");
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, first);
    }
}
