//! HTTP response bodies
//!
//! JSON shapes returned by the API routes.

use serde::Serialize;

use crate::auth::PermissionLevel;
use crate::storage::{FileEntry, UploadedFile};

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub uploaded: Vec<UploadedFile>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
    pub level: PermissionLevel,
}

/// Current user of `GET /api/session`
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub username: String,
    pub level: PermissionLevel,
}
