//! File system storage management
//!
//! Handles path confinement, directory operations, permission tiers and
//! staged uploads.

pub mod filesystem;
pub mod operations;
pub mod permissions;
pub mod results;
pub mod validation;

pub use filesystem::{StagedUpload, ensure_directory};
pub use operations::{create_directory, delete_entry, list_directory, rename_entry};
pub use permissions::{Operation, PermissionLevel};
pub use results::{FileEntry, UploadedFile};
pub use validation::{PathResolver, ResolvedPath, validate_name};
