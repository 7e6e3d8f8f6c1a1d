//! Core domain types for wikiport export jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, WikiportError};

/// Progress message stored when a job reaches `Completed`.
pub const COMPLETED_MESSAGE: &str = "Export completed successfully";

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for export job identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new time-sortable job identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A UUID v7 wrapper for export file identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub Uuid);

impl FileId {
    /// Generate a new time-sortable file identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// JobStatus / FileFormat
// ---------------------------------------------------------------------------

/// Lifecycle status of an export job.
///
/// Transitions are monotonic along `Pending → Processing → {Completed, Failed}`;
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further transition out of this status is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Stable lowercase name, matching the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Output format of an export file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Markdown,
    Pdf,
    Epub,
}

impl FileFormat {
    /// Filename extension for this format (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Pdf => "pdf",
            Self::Epub => "epub",
        }
    }

    /// Stable lowercase name, matching the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Pdf => "pdf",
            Self::Epub => "epub",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(Self::Markdown),
            "pdf" => Ok(Self::Pdf),
            "epub" => Ok(Self::Epub),
            other => Err(format!("unknown file format: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// An export job: one repository's wiki export request and its lifecycle state.
///
/// Mutation goes through the lifecycle methods below, which enforce the
/// status transition graph. Progress is advisory: [`Job::update_progress`]
/// clamps to 0–100 but does not reject regressions — keeping updates
/// non-decreasing within a run is the orchestrator's calling discipline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier, assigned at creation.
    pub id: JobId,
    /// Source repository URL, as given by the caller.
    pub repository_url: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// Advanced on every mutation.
    pub updated_at: DateTime<Utc>,
    /// Set only when the job enters `Completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only when the job enters `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Progress percentage, 0–100.
    pub progress_percentage: u8,
    /// Free-text progress message.
    pub progress_message: String,
}

impl Job {
    /// Create a new job in `Pending` with zero progress.
    pub fn create(repository_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            repository_url: repository_url.into(),
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error_message: None,
            progress_percentage: 0,
            progress_message: String::new(),
        }
    }

    /// Transition `Pending → Processing`.
    pub fn start(&mut self) -> Result<()> {
        if self.status != JobStatus::Pending {
            return Err(WikiportError::invalid_transition(format!(
                "cannot start job {} from status {}",
                self.id, self.status
            )));
        }
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record new progress. Percentage is clamped to 0–100.
    pub fn update_progress(&mut self, percentage: u8, message: impl Into<String>) {
        self.progress_percentage = percentage.min(100);
        self.progress_message = message.into();
        self.updated_at = Utc::now();
    }

    /// Transition `Processing → Completed`, forcing progress to 100%.
    pub fn complete(&mut self) -> Result<()> {
        if self.status != JobStatus::Processing {
            return Err(WikiportError::invalid_transition(format!(
                "cannot complete job {} from status {}",
                self.id, self.status
            )));
        }
        self.status = JobStatus::Completed;
        self.progress_percentage = 100;
        self.progress_message = COMPLETED_MESSAGE.to_string();
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Transition `Processing → Failed`, recording the error message.
    ///
    /// Progress percentage and message are left as they were, so a failed
    /// job still shows how far it got.
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<()> {
        if self.status != JobStatus::Processing {
            return Err(WikiportError::invalid_transition(format!(
                "cannot fail job {} from status {}",
                self.id, self.status
            )));
        }
        self.status = JobStatus::Failed;
        self.error_message = Some(error_message.into());
        self.updated_at = Utc::now();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ExportFile
// ---------------------------------------------------------------------------

/// One rendered artifact (one format) belonging to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFile {
    /// Unique identifier.
    pub id: FileId,
    /// Owning job.
    pub job_id: JobId,
    /// Output format. Immutable after creation.
    pub format: FileFormat,
    /// User-facing filename (e.g. `widgets_wiki.pdf`).
    pub filename: String,
    /// Opaque location token from the blob store.
    pub storage_location: String,
    /// Size of the stored bytes.
    pub size_bytes: u64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl ExportFile {
    /// Create a new export file record for a stored artifact.
    pub fn create(
        job_id: JobId,
        format: FileFormat,
        filename: impl Into<String>,
        storage_location: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            id: FileId::new(),
            job_id,
            format,
            filename: filename.into(),
            storage_location: storage_location.into(),
            size_bytes,
            created_at: Utc::now(),
        }
    }
}
