//! libSQL persistence layer for export jobs and file records.
//!
//! [`Database`] wraps a local libSQL database and implements the core's
//! [`JobRepository`] and [`FileRepository`] contracts; hand out one
//! `Arc<Database>` per boundary. The blob side of storage lives in
//! [`FsBlobStore`].

mod blob;
mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Row, params};

use wikiport_core::ports::{FileRepository, JobRepository};
use wikiport_shared::{ExportFile, Job, JobId, Result, WikiportError};

pub use blob::FsBlobStore;

/// Job/file record store backed by a local libSQL database.
pub struct Database {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: Connection,
}

impl Database {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WikiportError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| WikiportError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| WikiportError::Storage(e.to_string()))?;

        // Cascade deletes rely on FK enforcement.
        conn.execute("PRAGMA foreign_keys = ON", params![])
            .await
            .map_err(|e| WikiportError::Storage(e.to_string()))?;

        let database = Self { db, conn };
        database.run_migrations().await?;
        Ok(database)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        WikiportError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn storage_err(e: impl std::fmt::Display) -> WikiportError {
    WikiportError::Storage(e.to_string())
}

fn get_text(row: &Row, idx: i32) -> Result<String> {
    row.get::<String>(idx).map_err(storage_err)
}

fn get_opt_text(row: &Row, idx: i32) -> Option<String> {
    row.get::<String>(idx).ok()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WikiportError::Storage(format!("bad timestamp {raw:?}: {e}")))
}

fn row_to_job(row: &Row) -> Result<Job> {
    let id = get_text(row, 0)?
        .parse()
        .map_err(|e| WikiportError::Storage(format!("bad job id: {e}")))?;
    let status = get_text(row, 2)?
        .parse()
        .map_err(WikiportError::Storage)?;

    Ok(Job {
        id,
        repository_url: get_text(row, 1)?,
        status,
        created_at: parse_timestamp(&get_text(row, 3)?)?,
        updated_at: parse_timestamp(&get_text(row, 4)?)?,
        completed_at: match get_opt_text(row, 5) {
            Some(raw) => Some(parse_timestamp(&raw)?),
            None => None,
        },
        error_message: get_opt_text(row, 6),
        progress_percentage: row.get::<u32>(7).map_err(storage_err)? as u8,
        progress_message: get_text(row, 8)?,
    })
}

fn row_to_file(row: &Row) -> Result<ExportFile> {
    let id = get_text(row, 0)?
        .parse()
        .map_err(|e| WikiportError::Storage(format!("bad file id: {e}")))?;
    let job_id = get_text(row, 1)?
        .parse()
        .map_err(|e| WikiportError::Storage(format!("bad job id: {e}")))?;
    let format = get_text(row, 2)?
        .parse()
        .map_err(WikiportError::Storage)?;

    Ok(ExportFile {
        id,
        job_id,
        format,
        filename: get_text(row, 3)?,
        storage_location: get_text(row, 4)?,
        size_bytes: row.get::<i64>(5).map_err(storage_err)? as u64,
        created_at: parse_timestamp(&get_text(row, 6)?)?,
    })
}

const JOB_COLUMNS: &str = "id, repository_url, status, created_at, updated_at, \
                           completed_at, error_message, progress_percentage, progress_message";

const FILE_COLUMNS: &str =
    "id, job_id, format, filename, storage_location, size_bytes, created_at";

// ---------------------------------------------------------------------------
// JobRepository
// ---------------------------------------------------------------------------

#[async_trait]
impl JobRepository for Database {
    async fn add(&self, job: &Job) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO jobs (id, repository_url, status, created_at, updated_at,
                                   completed_at, error_message, progress_percentage, progress_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    job.id.to_string(),
                    job.repository_url.as_str(),
                    job.status.as_str(),
                    job.created_at.to_rfc3339(),
                    job.updated_at.to_rfc3339(),
                    job.completed_at.map(|t| t.to_rfc3339()),
                    job.error_message.as_deref(),
                    job.progress_percentage as i64,
                    job.progress_message.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_job(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn update(&self, job: &Job) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE jobs SET repository_url = ?2, status = ?3, updated_at = ?4,
                                 completed_at = ?5, error_message = ?6,
                                 progress_percentage = ?7, progress_message = ?8
                 WHERE id = ?1",
                params![
                    job.id.to_string(),
                    job.repository_url.as_str(),
                    job.status.as_str(),
                    job.updated_at.to_rfc3339(),
                    job.completed_at.map(|t| t.to_rfc3339()),
                    job.error_message.as_deref(),
                    job.progress_percentage as i64,
                    job.progress_message.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;

        if affected == 0 {
            return Err(WikiportError::JobNotFound(job.id));
        }
        Ok(())
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Job>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {JOB_COLUMNS} FROM jobs
                     ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                ),
                params![limit as i64, offset as i64],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_job(&row)?);
        }
        Ok(results)
    }

    async fn delete(&self, id: JobId) -> Result<()> {
        self.conn
            .execute("DELETE FROM jobs WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        // Every statement commits on its own; the explicit durability point
        // in the contract is a no-op here.
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileRepository
// ---------------------------------------------------------------------------

#[async_trait]
impl FileRepository for Database {
    async fn add(&self, file: &ExportFile) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO export_files (id, job_id, format, filename,
                                           storage_location, size_bytes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    file.id.to_string(),
                    file.job_id.to_string(),
                    file.format.as_str(),
                    file.filename.as_str(),
                    file.storage_location.as_str(),
                    file.size_bytes as i64,
                    file.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, id: wikiport_shared::FileId) -> Result<Option<ExportFile>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {FILE_COLUMNS} FROM export_files WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_file(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn list_by_job(&self, job_id: JobId) -> Result<Vec<ExportFile>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {FILE_COLUMNS} FROM export_files
                     WHERE job_id = ?1 ORDER BY created_at, id"
                ),
                params![job_id.to_string()],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_file(&row)?);
        }
        Ok(results)
    }

    async fn delete(&self, id: wikiport_shared::FileId) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM export_files WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}
