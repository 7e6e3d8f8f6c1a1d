//! SQL migration definitions for the wikiport database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: jobs, export_files",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Export jobs
CREATE TABLE IF NOT EXISTS jobs (
    id                  TEXT PRIMARY KEY,
    repository_url      TEXT NOT NULL,
    status              TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    completed_at        TEXT,
    error_message       TEXT,
    progress_percentage INTEGER NOT NULL DEFAULT 0,
    progress_message    TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);

-- Rendered export artifacts; rows die with their job
CREATE TABLE IF NOT EXISTS export_files (
    id               TEXT PRIMARY KEY,
    job_id           TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    format           TEXT NOT NULL,
    filename         TEXT NOT NULL,
    storage_location TEXT NOT NULL,
    size_bytes       INTEGER NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_export_files_job_id ON export_files(job_id);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
