//! Login session management
//!
//! Sessions map an opaque cookie value to a user and permission level. The
//! store is injected into the server so it can be replaced by a persistent
//! implementation.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::storage::permissions::PermissionLevel;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "media_session";

/// An authenticated login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub level: PermissionLevel,
    pub expires_at: Instant,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Session-id → user mapping capability
pub trait SessionStore: Send + Sync {
    /// Open a new session for a verified user
    fn create(&self, username: &str, level: PermissionLevel) -> Session;

    /// Look up a live session; expired sessions are never returned
    fn get(&self, id: &str) -> Option<Session>;

    /// End a session. Returns whether it existed.
    fn remove(&self, id: &str) -> bool;

    /// Drop expired sessions, returning how many were removed
    fn prune_expired(&self) -> usize;
}

/// Process-local session store with a fixed time-to-live
#[derive(Debug)]
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, username: &str, level: PermissionLevel) -> Session {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            level,
            expires_at: Instant::now() + self.ttl,
        };
        self.lock().insert(session.id.clone(), session.clone());
        info!("Session opened for {} ({:?})", username, level);
        session
    }

    fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.lock();
        match sessions.get(id) {
            Some(session) if session.is_expired() => {
                debug!("Session for {} expired", session.username);
                sessions.remove(id);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    fn remove(&self, id: &str) -> bool {
        match self.lock().remove(id) {
            Some(session) => {
                info!("Session closed for {}", session.username);
                true
            }
            None => false,
        }
    }

    fn prune_expired(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }
}
