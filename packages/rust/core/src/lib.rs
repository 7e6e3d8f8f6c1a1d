//! Core job lifecycle and export pipeline for wikiport.
//!
//! This crate ties the collaborator contracts ([`ports`]) together into the
//! job commands/queries ([`commands`]) and the end-to-end export pipeline
//! ([`pipeline`]): content acquisition followed by Markdown, PDF, and EPUB
//! rendering, with progress persisted at every checkpoint.

mod acquire;
pub mod commands;
pub mod pipeline;
pub mod ports;

#[cfg(test)]
pub(crate) mod testutil;

pub use commands::{JobCommands, JobQueries};
pub use pipeline::ExportPipeline;
pub use ports::{
    BlobStorage, EventPublisher, FileRepository, JobRepository, StoredBlob,
    TracingEventPublisher,
};
