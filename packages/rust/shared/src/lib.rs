//! Shared types, error model, and configuration for wikiport.
//!
//! This crate is the foundation depended on by all other wikiport crates.
//! It provides:
//! - [`WikiportError`] — the unified error type
//! - Domain types ([`Job`], [`ExportFile`], [`JobId`], [`FileId`])
//! - Domain events ([`Event`], [`EventKind`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod events;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GithubConfig, StorageConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{Result, WikiportError};
pub use events::{Event, EventKind};
pub use types::{
    COMPLETED_MESSAGE, ExportFile, FileFormat, FileId, Job, JobId, JobStatus,
};
