//! Authentication validator
//!
//! Sanity-checks login input before asking the credential store.

use crate::auth::credentials::CredentialStore;
use crate::error::AuthError;
use crate::storage::permissions::PermissionLevel;

const MAX_CREDENTIAL_LENGTH: usize = 128;

/// Performs basic input sanitation to check for malicious or malformed usernames/passwords.
fn is_valid_input(input: &str) -> bool {
    !input.trim().is_empty()
        && input.len() <= MAX_CREDENTIAL_LENGTH
        && !input.contains(['\r', '\n', '\0'])
}

/// Validates a username/password pair and returns the account's level.
pub fn validate_login(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<PermissionLevel, AuthError> {
    if !is_valid_input(username) {
        return Err(AuthError::MalformedInput("Invalid username format".into()));
    }
    if !is_valid_input(password) {
        return Err(AuthError::MalformedInput("Invalid password format".into()));
    }

    store
        .verify(username, password)
        .ok_or_else(|| AuthError::InvalidCredentials(username.to_string()))
}
