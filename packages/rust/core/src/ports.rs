//! Collaborator contracts consumed by the core.
//!
//! The pipeline and the command handlers only ever see these traits; the
//! `wikiport-storage` crate provides the persistent implementations and the
//! pipeline tests use in-memory fakes. All traits are object-safe and used
//! behind `Arc<dyn …>`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use wikiport_shared::{Event, EventKind, ExportFile, FileId, Job, JobId, Result};

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// Persistence boundary for [`Job`] records.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a new job.
    async fn add(&self, job: &Job) -> Result<()>;

    /// Fetch a job by id.
    async fn get(&self, id: JobId) -> Result<Option<Job>>;

    /// Overwrite an existing job. Fails with `JobNotFound` for unknown ids.
    async fn update(&self, job: &Job) -> Result<()>;

    /// List jobs, newest first.
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Job>>;

    /// Delete a job. Associated file records are cascade-deleted.
    async fn delete(&self, id: JobId) -> Result<()>;

    /// Durably commit pending writes.
    ///
    /// Always present on the contract so callers never have to probe for a
    /// commit capability; backends with per-operation durability implement
    /// this as a no-op.
    async fn flush(&self) -> Result<()>;
}

/// Persistence boundary for [`ExportFile`] records.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Insert a new file record.
    async fn add(&self, file: &ExportFile) -> Result<()>;

    /// Fetch a file record by id.
    async fn get(&self, id: FileId) -> Result<Option<ExportFile>>;

    /// List all file records for a job, in creation order.
    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<ExportFile>>;

    /// Delete a file record.
    async fn delete(&self, id: FileId) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Blob storage
// ---------------------------------------------------------------------------

/// Handle to bytes stored in the blob store.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Opaque location token; uniquely identifies the bytes.
    pub location: String,
    /// Stored size in bytes.
    pub size_bytes: u64,
}

/// Storage boundary for generated export artifacts.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store bytes under a job-scoped key and return its location and size.
    async fn store(&self, bytes: &[u8], filename: &str, job_id: JobId) -> Result<StoredBlob>;

    /// Fetch stored bytes; `None` if the location is unknown.
    async fn fetch(&self, location: &str) -> Result<Option<Vec<u8>>>;

    /// Delete stored bytes. `Ok(false)` if the location was already absent.
    async fn delete(&self, location: &str) -> Result<bool>;

    /// A time-limited retrieval reference for a stored blob.
    async fn retrieval_url(&self, location: &str, expires_in: Duration) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Event publishing
// ---------------------------------------------------------------------------

/// Publish boundary for domain events.
///
/// Fire-and-forget from the core's perspective: delivery guarantees belong
/// to the publisher implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: Event);
}

/// Default publisher: events become structured log records.
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: Event) {
        match &event.kind {
            EventKind::JobProgressUpdated { percentage, message } => {
                info!(
                    event = event.name(),
                    job = %event.job_id,
                    percentage = *percentage,
                    message = %message,
                    "event"
                );
            }
            EventKind::JobFailed { error_message } => {
                info!(
                    event = event.name(),
                    job = %event.job_id,
                    error = %error_message,
                    "event"
                );
            }
            EventKind::FileCreated {
                filename,
                size_bytes,
                ..
            } => {
                info!(
                    event = event.name(),
                    job = %event.job_id,
                    filename = %filename,
                    size_bytes = *size_bytes,
                    "event"
                );
            }
            _ => {
                info!(event = event.name(), job = %event.job_id, "event");
            }
        }
    }
}
