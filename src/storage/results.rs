//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;

/// One visible entry of a directory listing.
///
/// `path` is root-relative (`/a/b`, directories end with `/`) and is accepted
/// back by `PathResolver::resolve` unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub is_directory: bool,
    pub path: String,
}

/// A file moved into place by an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub path: String,
}
