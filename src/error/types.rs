//! Error types
//!
//! Defines domain-specific error types for each module of the media server.
//! `Display` output is meant for server logs; clients only ever see the
//! generic messages produced by `error::handlers`.

use std::fmt;
use std::io;

/// Path confinement errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The request resolved outside the media root
    Forbidden,
    /// A required path argument was absent
    MissingPath,
    /// A single path component (upload name, folder name, new name) was unusable
    InvalidName(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Forbidden => write!(f, "Path escapes the media root"),
            PathError::MissingPath => write!(f, "Missing path"),
            PathError::InvalidName(n) => write!(f, "Invalid name: {}", n),
        }
    }
}

impl std::error::Error for PathError {}

/// Media streaming errors
#[derive(Debug)]
pub enum StreamError {
    /// Target absent, unreadable or not a regular file
    NotFound,
    /// Range header unparseable or outside the file
    RangeNotSatisfiable { size: u64 },
    /// Unexpected filesystem failure before the body started
    InternalIo(io::Error),
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::NotFound => write!(f, "Media not found"),
            StreamError::RangeNotSatisfiable { size } => {
                write!(f, "Range not satisfiable for {} byte file", size)
            }
            StreamError::InternalIo(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StreamError {}

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    NotFound(String),
    NotADirectory(String),
    AlreadyExists(String),
    /// Refused operation on the media root itself (delete, rename)
    RootProtected,
    NoFilesReceived,
    FileTooLarge { limit_bytes: u64 },
    TooManyFiles { limit: usize },
    MalformedUpload(String),
    FeatureDisabled(&'static str),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(p) => write!(f, "Not found: {}", p),
            StorageError::NotADirectory(p) => write!(f, "Not a directory: {}", p),
            StorageError::AlreadyExists(p) => write!(f, "Already exists: {}", p),
            StorageError::RootProtected => write!(f, "Operation not allowed on the media root"),
            StorageError::NoFilesReceived => write!(f, "No files received"),
            StorageError::FileTooLarge { limit_bytes } => {
                write!(f, "File exceeds upload limit of {} bytes", limit_bytes)
            }
            StorageError::TooManyFiles { limit } => {
                write!(f, "Too many files in one upload (max {})", limit)
            }
            StorageError::MalformedUpload(msg) => write!(f, "Malformed upload: {}", msg),
            StorageError::FeatureDisabled(name) => write!(f, "Feature disabled: {}", name),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// Authentication module errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials(String),
    MalformedInput(String),
    NotLoggedIn,
    InsufficientPermission,
    TooManyAttempts(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials(u) => write!(f, "Invalid credentials for user: {}", u),
            AuthError::MalformedInput(s) => write!(f, "Malformed input: {}", s),
            AuthError::NotLoggedIn => write!(f, "User not logged in"),
            AuthError::InsufficientPermission => write!(f, "Insufficient permission level"),
            AuthError::TooManyAttempts(u) => write!(f, "Too many login attempts for user: {}", u),
        }
    }
}

impl std::error::Error for AuthError {}

/// General media server error that encompasses all error types
#[derive(Debug)]
pub enum MediaServerError {
    Path(PathError),
    Stream(StreamError),
    Storage(StorageError),
    Auth(AuthError),
}

impl fmt::Display for MediaServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaServerError::Path(e) => write!(f, "Path error: {}", e),
            MediaServerError::Stream(e) => write!(f, "Stream error: {}", e),
            MediaServerError::Storage(e) => write!(f, "Storage error: {}", e),
            MediaServerError::Auth(e) => write!(f, "Authentication error: {}", e),
        }
    }
}

impl std::error::Error for MediaServerError {}

impl From<PathError> for MediaServerError {
    fn from(error: PathError) -> Self {
        MediaServerError::Path(error)
    }
}

impl From<StreamError> for MediaServerError {
    fn from(error: StreamError) -> Self {
        MediaServerError::Stream(error)
    }
}

impl From<StorageError> for MediaServerError {
    fn from(error: StorageError) -> Self {
        MediaServerError::Storage(error)
    }
}

impl From<AuthError> for MediaServerError {
    fn from(error: AuthError) -> Self {
        MediaServerError::Auth(error)
    }
}
