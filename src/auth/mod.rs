//! Authentication system
//!
//! Handles credential validation, login sessions and permission levels.

pub mod credentials;
pub mod session;
pub mod validator;

pub use crate::storage::permissions::PermissionLevel;
pub use credentials::{ConfigCredentialStore, CredentialStore};
pub use session::{InMemorySessionStore, SESSION_COOKIE, Session, SessionStore};
pub use validator::validate_login;
