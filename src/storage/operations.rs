//! Storage operations
//!
//! Directory listing, deletion, folder creation and renaming. Every function
//! takes paths already confined by `PathResolver`.

use log::{debug, error, info};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::fs;

use crate::error::StorageError;
use crate::storage::results::FileEntry;
use crate::storage::validation::ResolvedPath;

const MAX_RETRIES: u64 = 3;

/// Lists the visible contents of a directory.
///
/// Dot-files are hidden. Directories come first, then files, each group
/// ordered by case-insensitive name.
pub async fn list_directory(dir: &ResolvedPath) -> Result<Vec<FileEntry>, StorageError> {
    let metadata = fs::metadata(dir.as_path())
        .await
        .map_err(|e| not_found_or_io(e, dir))?;
    if !metadata.is_dir() {
        return Err(StorageError::NotADirectory(dir.client_path()));
    }

    let mut entries = fs::read_dir(dir.as_path()).await.map_err(|e| {
        error!("Failed to list directory {}: {}", dir.client_path(), e);
        StorageError::from(e)
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            debug!("Skipping non UTF-8 entry in {}", dir.client_path());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        // follow symlinks so linked folders are browsable
        let is_directory = match fs::metadata(entry.path()).await {
            Ok(meta) => meta.is_dir(),
            Err(_) => entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false),
        };

        let mut path = if dir.is_root() {
            format!("/{}", name)
        } else {
            format!("/{}/{}", dir.relative(), name)
        };
        if is_directory {
            path.push('/');
        }

        files.push(FileEntry {
            name,
            is_directory,
            path,
        });
    }

    files.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    info!("Listed directory {} - {} entries", dir.client_path(), files.len());
    Ok(files)
}

/// Deletes a file, or a directory with all of its contents.
///
/// Symlinks are removed themselves, never their targets.
pub async fn delete_entry(target: &ResolvedPath) -> Result<(), StorageError> {
    if target.is_root() {
        return Err(StorageError::RootProtected);
    }

    let metadata = fs::symlink_metadata(target.as_path())
        .await
        .map_err(|e| not_found_or_io(e, target))?;

    for attempt in 1..=MAX_RETRIES {
        let result = if metadata.is_dir() {
            fs::remove_dir_all(target.as_path()).await
        } else {
            fs::remove_file(target.as_path()).await
        };

        match result {
            Ok(()) => {
                info!("Deleted {}", target.client_path());
                return Ok(());
            }
            Err(e) if attempt < MAX_RETRIES && e.kind() == ErrorKind::PermissionDenied => {
                tokio::time::sleep(Duration::from_millis(100 * attempt)).await;
            }
            Err(e) => {
                error!("Failed to delete {}: {}", target.client_path(), e);
                return Err(StorageError::from(e));
            }
        }
    }

    Err(StorageError::IoError(std::io::Error::other(
        "Failed to delete after retries",
    )))
}

/// Creates a directory and any missing parents. An existing directory is fine.
pub async fn create_directory(target: &ResolvedPath) -> Result<(), StorageError> {
    if let Ok(meta) = fs::metadata(target.as_path()).await {
        if !meta.is_dir() {
            return Err(StorageError::AlreadyExists(target.client_path()));
        }
    }

    fs::create_dir_all(target.as_path()).await.map_err(|e| {
        error!("Failed to create directory {}: {}", target.client_path(), e);
        StorageError::from(e)
    })?;

    info!("Created directory {}", target.client_path());
    Ok(())
}

/// Renames `source` to `destination` with a single filesystem rename.
///
/// Refuses to touch the root or to overwrite an existing entry.
pub async fn rename_entry(
    source: &ResolvedPath,
    destination: &ResolvedPath,
) -> Result<(), StorageError> {
    if source.is_root() || destination.is_root() {
        return Err(StorageError::RootProtected);
    }

    fs::symlink_metadata(source.as_path())
        .await
        .map_err(|e| not_found_or_io(e, source))?;

    if fs::symlink_metadata(destination.as_path()).await.is_ok() {
        return Err(StorageError::AlreadyExists(destination.client_path()));
    }

    fs::rename(source.as_path(), destination.as_path())
        .await
        .map_err(|e| {
            error!(
                "Failed to rename {} to {}: {}",
                source.client_path(),
                destination.client_path(),
                e
            );
            StorageError::from(e)
        })?;

    info!(
        "Renamed {} to {}",
        source.client_path(),
        destination.client_path()
    );
    Ok(())
}

fn not_found_or_io(e: std::io::Error, target: &ResolvedPath) -> StorageError {
    match e.kind() {
        ErrorKind::NotFound => StorageError::NotFound(target.client_path()),
        _ => StorageError::IoError(e),
    }
}
