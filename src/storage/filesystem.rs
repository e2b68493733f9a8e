//! File system operations
//!
//! Staged uploads: bytes are written to a hidden temporary file next to the
//! destination and renamed into place once complete, so a partial upload is
//! never visible under its final name.

use log::{error, info, warn};
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage::validation::ResolvedPath;

/// Create `dir` (and parents) if it does not exist yet
pub async fn ensure_directory(dir: &ResolvedPath) -> Result<(), StorageError> {
    match fs::metadata(dir.as_path()).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(StorageError::NotADirectory(dir.client_path())),
        Err(_) => {
            fs::create_dir_all(dir.as_path()).await?;
            info!("Created upload directory {}", dir.client_path());
            Ok(())
        }
    }
}

/// An upload in progress. Dropping it without `commit` removes the temp file.
pub struct StagedUpload {
    destination: ResolvedPath,
    temp_path: PathBuf,
    file: Option<File>,
    written: u64,
    limit_bytes: u64,
    committed: bool,
}

impl StagedUpload {
    /// Open a temporary file beside `destination`.
    pub async fn create(destination: ResolvedPath, limit_bytes: u64) -> Result<Self, StorageError> {
        let name = destination
            .file_name()
            .ok_or_else(|| StorageError::MalformedUpload("upload target has no name".into()))?;
        let parent = destination
            .as_path()
            .parent()
            .ok_or_else(|| StorageError::MalformedUpload("upload target has no parent".into()))?;
        let temp_path = parent.join(format!(".{}.{}.part", name, Uuid::new_v4()));

        let file = File::create(&temp_path).await.map_err(|e| {
            error!(
                "Failed to create temporary file for {}: {}",
                destination.client_path(),
                e
            );
            StorageError::from(e)
        })?;

        Ok(Self {
            destination,
            temp_path,
            file: Some(file),
            written: 0,
            limit_bytes,
            committed: false,
        })
    }

    /// Append a chunk, failing fast once the size limit would be exceeded.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.written += chunk.len() as u64;
        if self.written > self.limit_bytes {
            warn!(
                "Upload {} exceeded {} bytes",
                self.destination.client_path(),
                self.limit_bytes
            );
            return Err(StorageError::FileTooLarge {
                limit_bytes: self.limit_bytes,
            });
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| StorageError::MalformedUpload("upload already closed".into()))?;
        file.write_all(chunk).await.map_err(|e| {
            error!(
                "Failed to write upload {}: {}",
                self.destination.client_path(),
                e
            );
            StorageError::from(e)
        })
    }

    /// Flush and atomically move the temporary file onto the destination.
    pub async fn commit(mut self) -> Result<ResolvedPath, StorageError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        fs::rename(&self.temp_path, self.destination.as_path())
            .await
            .map_err(|e| {
                error!(
                    "Failed to move upload into {}: {}",
                    self.destination.client_path(),
                    e
                );
                StorageError::from(e)
            })?;

        self.committed = true;
        info!(
            "Upload completed: {} ({} bytes)",
            self.destination.client_path(),
            self.written
        );
        Ok(self.destination.clone())
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        // one unlink of a file we created; blocking the worker here is bounded
        if let Err(e) = std::fs::remove_file(&self.temp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove temporary upload file: {}", e);
            }
        }
    }
}
