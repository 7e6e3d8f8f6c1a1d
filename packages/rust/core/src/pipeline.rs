//! Export pipeline orchestrator: the `Pending → Processing → {Completed,
//! Failed}` state machine for one job.
//!
//! A run is a single logical sequence of awaited steps: content acquisition,
//! then the Markdown, PDF, and EPUB renderers in fixed order, with progress
//! persisted at each checkpoint. Only two conditions abort a run — an
//! unknown job id and a malformed repository URL; everything else degrades
//! into best-available content. The terminal state is reached exactly once
//! per invocation.

use std::sync::Arc;

use tracing::{error, info, instrument};

use wikiport_github::ContentSource;
use wikiport_shared::{Event, EventKind, ExportFile, FileFormat, Job, JobId, Result, WikiportError};

use crate::ports::{BlobStorage, EventPublisher, FileRepository, JobRepository};

/// Drives the full export of one job.
pub struct ExportPipeline {
    pub(crate) jobs: Arc<dyn JobRepository>,
    pub(crate) files: Arc<dyn FileRepository>,
    pub(crate) blobs: Arc<dyn BlobStorage>,
    pub(crate) source: Arc<dyn ContentSource>,
    pub(crate) events: Arc<dyn EventPublisher>,
}

impl ExportPipeline {
    /// Wire up the pipeline against concrete collaborators.
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        files: Arc<dyn FileRepository>,
        blobs: Arc<dyn BlobStorage>,
        source: Arc<dyn ContentSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            jobs,
            files,
            blobs,
            source,
            events,
        }
    }

    /// Run the full export pipeline for `job_id`.
    ///
    /// An unknown job id fails with `JobNotFound` before any mutation. Any
    /// error past that point transitions the job to `Failed` (with the
    /// error's message recorded) and returns `Ok` — the job's terminal
    /// state, not the return value, is the outcome of the run.
    #[instrument(skip(self), fields(job = %job_id))]
    pub async fn run(&self, job_id: JobId) -> Result<()> {
        let Some(mut job) = self.jobs.get(job_id).await? else {
            return Err(WikiportError::JobNotFound(job_id));
        };

        job.start()?;
        self.jobs.update(&job).await?;
        self.events
            .publish(Event::new(job.id, EventKind::JobStarted))
            .await;
        info!(url = %job.repository_url, "export started");

        match self.execute(&mut job).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "export pipeline failed");
                self.mark_failed(&mut job, &e.to_string()).await
            }
        }
    }

    /// The fallible body of a run; errors here fail the job.
    async fn execute(&self, job: &mut Job) -> Result<()> {
        self.update_progress(
            job,
            5,
            format!(
                "Extracting repository information from URL: {}",
                job.repository_url
            ),
        )
        .await?;
        let repo = self.source.extract_repo(&job.repository_url)?;

        let content = self.acquire_content(job, &repo).await?;

        self.update_progress(job, 60, "Generating Markdown export").await?;
        self.generate_export(
            job,
            &repo.name,
            FileFormat::Markdown,
            wikiport_render::markdown(&content),
        )
        .await?;

        self.update_progress(job, 70, "Generating PDF export").await?;
        self.generate_export(
            job,
            &repo.name,
            FileFormat::Pdf,
            wikiport_render::pdf(&repo.name, &content),
        )
        .await?;

        self.update_progress(job, 80, "Generating EPUB export").await?;
        self.generate_export(
            job,
            &repo.name,
            FileFormat::Epub,
            wikiport_render::epub(&repo.name, job.id, &content),
        )
        .await?;

        self.update_progress(job, 100, "Export completed").await?;
        job.complete()?;
        self.jobs.update(job).await?;
        self.jobs.flush().await?;

        self.events
            .publish(Event::new(job.id, EventKind::JobCompleted))
            .await;
        info!("export completed");
        Ok(())
    }

    /// Store one rendered artifact, record it, and announce it.
    ///
    /// Renderers always deliver bytes (degraded content included), so a
    /// failure here is a storage failure and fails the job.
    async fn generate_export(
        &self,
        job: &Job,
        repo_name: &str,
        format: FileFormat,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let filename = wikiport_render::export_filename(repo_name, format);
        let stored = self.blobs.store(&bytes, &filename, job.id).await?;

        let file = ExportFile::create(
            job.id,
            format,
            filename.as_str(),
            stored.location.as_str(),
            stored.size_bytes,
        );
        self.files.add(&file).await?;

        info!(
            format = %format,
            filename = %file.filename,
            size_bytes = file.size_bytes,
            "stored export artifact"
        );
        self.events
            .publish(Event::new(
                job.id,
                EventKind::FileCreated {
                    file_id: file.id,
                    format: file.format,
                    filename: file.filename.clone(),
                    storage_location: file.storage_location.clone(),
                    size_bytes: file.size_bytes,
                },
            ))
            .await;
        Ok(())
    }

    /// Persist a progress checkpoint and announce it.
    ///
    /// Each update is an independent write followed by an explicit flush, so
    /// observers see progress while the run is still in flight.
    pub(crate) async fn update_progress(
        &self,
        job: &mut Job,
        percentage: u8,
        message: impl Into<String>,
    ) -> Result<()> {
        let message = message.into();
        job.update_progress(percentage, message.clone());
        self.jobs.update(job).await?;
        self.jobs.flush().await?;

        self.events
            .publish(Event::new(
                job.id,
                EventKind::JobProgressUpdated {
                    percentage: job.progress_percentage,
                    message,
                },
            ))
            .await;
        Ok(())
    }

    /// Transition the job to `Failed`, keeping whatever progress it reached.
    async fn mark_failed(&self, job: &mut Job, message: &str) -> Result<()> {
        job.fail(message)?;
        self.jobs.update(job).await?;
        self.jobs.flush().await?;

        self.events
            .publish(Event::new(
                job.id,
                EventKind::JobFailed {
                    error_message: message.to_string(),
                },
            ))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        FakeSource, MemoryBlobs, MemoryFiles, MemoryJobs, RecordingPublisher,
    };
    use wikiport_shared::JobStatus;

    struct Harness {
        pipeline: ExportPipeline,
        jobs: Arc<MemoryJobs>,
        files: Arc<MemoryFiles>,
        blobs: Arc<MemoryBlobs>,
        published: Arc<RecordingPublisher>,
    }

    fn harness(source: FakeSource) -> Harness {
        let files = Arc::new(MemoryFiles::default());
        let jobs = Arc::new(MemoryJobs::new(files.clone()));
        let blobs = Arc::new(MemoryBlobs::default());
        let published = Arc::new(RecordingPublisher::default());
        Harness {
            pipeline: ExportPipeline::new(
                jobs.clone(),
                files.clone(),
                blobs.clone(),
                Arc::new(source),
                published.clone(),
            ),
            jobs,
            files,
            blobs,
            published,
        }
    }

    async fn seed_job(h: &Harness) -> JobId {
        let job = Job::create("https://github.com/acme/widgets");
        let id = job.id;
        h.jobs.add(&job).await.expect("seed job");
        id
    }

    /// Fetch the markdown artifact's stored bytes for assertions on the blob.
    async fn stored_markdown(h: &Harness, job_id: JobId) -> String {
        let files = h.files.list_by_job(job_id).await.expect("files");
        let md = files
            .iter()
            .find(|f| f.format == FileFormat::Markdown)
            .expect("markdown artifact");
        let bytes = h
            .blobs
            .fetch(&md.storage_location)
            .await
            .expect("fetch")
            .expect("stored");
        String::from_utf8(bytes).expect("utf8")
    }

    #[tokio::test]
    async fn readme_fallback_produces_three_files_and_completes() {
        let h = harness(FakeSource::default().with_readme("# widgets\n\nA thing.\n"));
        let id = seed_job(&h).await;

        h.pipeline.run(id).await.expect("run");

        let job = h.jobs.get(id).await.expect("get").expect("exists");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percentage, 100);
        assert!(job.completed_at.is_some());

        let files = h.files.list_by_job(id).await.expect("files");
        assert_eq!(files.len(), 3);
        let formats: Vec<FileFormat> = files.iter().map(|f| f.format).collect();
        assert_eq!(
            formats,
            vec![FileFormat::Markdown, FileFormat::Pdf, FileFormat::Epub]
        );
        assert_eq!(files[0].filename, "widgets_wiki.md");
        assert_eq!(files[1].filename, "widgets_wiki.pdf");
        assert_eq!(files[2].filename, "widgets_wiki.epub");

        // README is used verbatim as the blob.
        assert_eq!(stored_markdown(&h, id).await, "# widgets\n\nA thing.\n");

        let names = h.published.names();
        assert_eq!(names.first().map(String::as_str), Some("job_started"));
        assert_eq!(names.last().map(String::as_str), Some("job_completed"));
        assert_eq!(names.iter().filter(|n| *n == "file_created").count(), 3);
    }

    #[tokio::test]
    async fn progress_is_nondecreasing_within_a_run() {
        let h = harness(FakeSource::default().with_readme("readme"));
        let id = seed_job(&h).await;
        h.pipeline.run(id).await.expect("run");

        let percentages = h.published.progress_percentages();
        assert!(!percentages.is_empty());
        assert!(
            percentages.windows(2).all(|w| w[0] <= w[1]),
            "progress regressed: {percentages:?}"
        );
        assert_eq!(percentages.last(), Some(&100));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found_without_mutation() {
        let h = harness(FakeSource::default());
        let result = h.pipeline.run(JobId::new()).await;

        assert!(matches!(result, Err(WikiportError::JobNotFound(_))));
        assert!(h.published.names().is_empty());
        assert_eq!(h.blobs.stored_count(), 0);
    }

    #[tokio::test]
    async fn invalid_repository_url_fails_the_job() {
        let h = harness(FakeSource::default());
        let job = Job::create("https://gitlab.com/acme/widgets");
        let id = job.id;
        h.jobs.add(&job).await.expect("seed");

        h.pipeline.run(id).await.expect("run marks failure");

        let job = h.jobs.get(id).await.expect("get").expect("exists");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(
            job.error_message
                .as_deref()
                .expect("error recorded")
                .contains("invalid repository URL")
        );
        // Failed before any renderer ran.
        assert!(h.files.list_by_job(id).await.expect("files").is_empty());
        assert_eq!(
            h.published.names().last().map(String::as_str),
            Some("job_failed")
        );
    }

    #[tokio::test]
    async fn wiki_pages_are_concatenated_in_listing_order() {
        let source = FakeSource::default()
            .with_wiki(&[("Home", "welcome"), ("Usage", "run it")]);
        let h = harness(source);
        let id = seed_job(&h).await;

        h.pipeline.run(id).await.expect("run");

        let blob = stored_markdown(&h, id).await;
        let home = blob.find("# Home").expect("home heading");
        let usage = blob.find("# Usage").expect("usage heading");
        assert!(home < usage);
        assert!(blob.contains("welcome"));
        assert!(blob.contains("run it"));
        assert!(blob.contains("\n---\n"));

        let job = h.jobs.get(id).await.expect("get").expect("exists");
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn empty_listing_despite_wiki_flag_equals_readme_fallback() {
        // has_wiki reports true but listing comes back empty.
        let empty_listing = FakeSource::default()
            .with_wiki(&[])
            .with_readme("# widgets readme");
        let h1 = harness(empty_listing);
        let id1 = seed_job(&h1).await;
        h1.pipeline.run(id1).await.expect("run");

        // Plain README repository with the same content.
        let no_wiki = FakeSource::default().with_readme("# widgets readme");
        let h2 = harness(no_wiki);
        let id2 = seed_job(&h2).await;
        h2.pipeline.run(id2).await.expect("run");

        assert_eq!(stored_markdown(&h1, id1).await, stored_markdown(&h2, id2).await);
    }

    #[tokio::test]
    async fn page_fetch_placeholder_does_not_fail_the_job() {
        let source = FakeSource::default()
            .with_wiki(&[("Home", "welcome"), ("Broken", "")])
            .with_unfetchable_page("Broken");
        let h = harness(source);
        let id = seed_job(&h).await;

        h.pipeline.run(id).await.expect("run");

        let job = h.jobs.get(id).await.expect("get").expect("exists");
        assert_eq!(job.status, JobStatus::Completed);

        let blob = stored_markdown(&h, id).await;
        assert!(blob.contains("# Broken"));
        assert!(blob.contains("*Error fetching content"));
    }

    #[tokio::test]
    async fn no_wiki_and_no_readme_synthesizes_placeholder() {
        let h = harness(FakeSource::default());
        let id = seed_job(&h).await;

        h.pipeline.run(id).await.expect("run");

        let blob = stored_markdown(&h, id).await;
        assert!(blob.contains("# widgets"));
        assert!(blob.contains("No wiki or README found"));
        let job = h.jobs.get(id).await.expect("get").expect("exists");
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn repository_error_degrades_to_error_blob() {
        let h = harness(FakeSource::default().with_readme_error());
        let id = seed_job(&h).await;

        h.pipeline.run(id).await.expect("run");

        // The run still completes: degraded content, not failure.
        let job = h.jobs.get(id).await.expect("get").expect("exists");
        assert_eq!(job.status, JobStatus::Completed);

        let blob = stored_markdown(&h, id).await;
        assert!(blob.contains("Error accessing repository"));
    }

    #[tokio::test]
    async fn rerun_of_terminal_job_is_rejected() {
        let h = harness(FakeSource::default().with_readme("readme"));
        let id = seed_job(&h).await;
        h.pipeline.run(id).await.expect("first run");

        let result = h.pipeline.run(id).await;
        assert!(matches!(result, Err(WikiportError::InvalidTransition { .. })));

        // Terminal state untouched, no duplicate artifacts.
        let job = h.jobs.get(id).await.expect("get").expect("exists");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(h.files.list_by_job(id).await.expect("files").len(), 3);
    }
}
