//! File permissions
//!
//! Permission tiers attached to a session and the tier each operation needs.

use serde::{Deserialize, Serialize};

/// Integer tier of an authenticated session; higher tiers include lower ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Browse and view media
    Viewer = 1,
    /// Additionally upload, delete, rename and create folders
    Editor = 2,
}

impl PermissionLevel {
    pub fn allows(self, operation: Operation) -> bool {
        self >= operation.required_level()
    }
}

/// Filesystem-touching operations exposed over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    ViewMedia,
    Upload,
    Delete,
    Rename,
    CreateDirectory,
}

impl Operation {
    pub fn required_level(self) -> PermissionLevel {
        match self {
            Operation::List | Operation::ViewMedia => PermissionLevel::Viewer,
            Operation::Upload
            | Operation::Delete
            | Operation::Rename
            | Operation::CreateDirectory => PermissionLevel::Editor,
        }
    }
}
