//! Filesystem blob store for rendered export artifacts.
//!
//! Blobs are stored under `<root>/<job_id>/<8-hex-prefix>_<filename>`; the
//! relative key doubles as the opaque storage location recorded on the file
//! record. A remote object store would implement the same contract with
//! real pre-signed retrieval URLs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use wikiport_core::ports::{BlobStorage, StoredBlob};
use wikiport_shared::{JobId, Result, WikiportError};

/// Blob store rooted at a local directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| WikiportError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Resolve a location token to an absolute path, rejecting tokens that
    /// would escape the root.
    fn resolve(&self, location: &str) -> Result<PathBuf> {
        if location.split('/').any(|seg| seg == "..") || Path::new(location).is_absolute() {
            return Err(WikiportError::Storage(format!(
                "invalid storage location: {location}"
            )));
        }
        Ok(self.root.join(location))
    }
}

#[async_trait]
impl BlobStorage for FsBlobStore {
    async fn store(&self, bytes: &[u8], filename: &str, job_id: JobId) -> Result<StoredBlob> {
        // A short random prefix keeps repeated exports of the same filename
        // from colliding.
        let prefix = uuid::Uuid::now_v7().simple().to_string();
        let location = format!("{job_id}/{}_{filename}", &prefix[..8]);

        let path = self.resolve(&location)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WikiportError::io(parent, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| WikiportError::io(&path, e))?;

        debug!(location = %location, size = bytes.len(), "stored blob");
        Ok(StoredBlob {
            location,
            size_bytes: bytes.len() as u64,
        })
    }

    async fn fetch(&self, location: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(location)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WikiportError::io(&path, e)),
        }
    }

    async fn delete(&self, location: &str) -> Result<bool> {
        let path = self.resolve(location)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(WikiportError::io(&path, e)),
        }
    }

    async fn retrieval_url(&self, location: &str, _expires_in: Duration) -> Result<String> {
        // Local files don't expire; the reference is valid for as long as
        // the blob exists.
        let path = self.resolve(location)?;
        Ok(format!("file://{}", path.display()))
    }
}
