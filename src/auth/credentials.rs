//! Credential storage and management
//!
//! Credential storage is an external collaborator: the server only needs to
//! ask whether a username/password pair is valid and at which level.

use std::collections::HashMap;

use crate::config::UserEntry;
use crate::storage::permissions::PermissionLevel;

/// Looks up accounts. Implementations own any hashing scheme.
pub trait CredentialStore: Send + Sync {
    /// Permission level of `username` when `password` matches
    fn verify(&self, username: &str, password: &str) -> Option<PermissionLevel>;
}

/// Accounts declared in the `[[users]]` table of the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigCredentialStore {
    users: HashMap<String, (String, PermissionLevel)>,
}

impl ConfigCredentialStore {
    pub fn new(entries: &[UserEntry]) -> Self {
        let users = entries
            .iter()
            .map(|u| (u.username.clone(), (u.password.clone(), u.level)))
            .collect();
        Self { users }
    }
}

impl CredentialStore for ConfigCredentialStore {
    fn verify(&self, username: &str, password: &str) -> Option<PermissionLevel> {
        match self.users.get(username) {
            Some((stored, level)) if stored == password => Some(*level),
            _ => None,
        }
    }
}
