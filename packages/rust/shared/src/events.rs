//! Domain events emitted on every job and file state transition.
//!
//! Events are append-only facts handed to a publish boundary
//! (`wikiport_core::ports::EventPublisher`) and not retained by the core.
//! The variant set is closed: publishers dispatch with an ordinary `match`,
//! resolved at compile time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{FileFormat, FileId, JobId};

/// A typed, timestamped, immutable fact keyed to a job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the fact occurred.
    pub timestamp: DateTime<Utc>,
    /// The job this event belongs to.
    pub job_id: JobId,
    /// What happened, with the data relevant to that fact.
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The closed set of event variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    JobCreated {
        repository_url: String,
    },
    JobStarted,
    JobProgressUpdated {
        percentage: u8,
        message: String,
    },
    JobCompleted,
    JobFailed {
        error_message: String,
    },
    JobDeleted,
    FileCreated {
        file_id: FileId,
        format: FileFormat,
        filename: String,
        storage_location: String,
        size_bytes: u64,
    },
    FileDeleted {
        file_id: FileId,
        format: FileFormat,
        filename: String,
    },
}

impl Event {
    /// Build an event for `job_id`, stamped with a fresh id and the current time.
    pub fn new(job_id: JobId, kind: EventKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            job_id,
            kind,
        }
    }

    /// Stable variant tag, used as the log/registration key.
    pub fn name(&self) -> &'static str {
        match self.kind {
            EventKind::JobCreated { .. } => "job_created",
            EventKind::JobStarted => "job_started",
            EventKind::JobProgressUpdated { .. } => "job_progress_updated",
            EventKind::JobCompleted => "job_completed",
            EventKind::JobFailed { .. } => "job_failed",
            EventKind::JobDeleted => "job_deleted",
            EventKind::FileCreated { .. } => "file_created",
            EventKind::FileDeleted { .. } => "file_deleted",
        }
    }
}
