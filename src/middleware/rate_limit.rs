//! Rate limiting middleware
//!
//! Sliding-window counter of failed logins, keyed by username.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Simple rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    attempts: HashMap<String, Vec<Instant>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: HashMap::new(),
            max_attempts,
            window,
        }
    }

    /// Whether `key` still has attempts left in the current window
    pub fn is_allowed(&mut self, key: &str) -> bool {
        let now = Instant::now();
        let window = self.window;
        match self.attempts.get_mut(key) {
            Some(entry) => {
                entry.retain(|&time| now.duration_since(time) < window);
                if entry.is_empty() {
                    self.attempts.remove(key);
                    true
                } else {
                    entry.len() < self.max_attempts
                }
            }
            None => true,
        }
    }

    /// Count one failed attempt against `key`. Expired windows of every
    /// key are swept first, so only keys with recent failures are kept.
    pub fn record(&mut self, key: &str) {
        self.prune_expired();
        self.attempts
            .entry(key.to_string())
            .or_default()
            .push(Instant::now());
    }

    /// Forget all attempts of `key`
    pub fn clear(&mut self, key: &str) {
        self.attempts.remove(key);
    }

    /// Drop attempts older than the window across all keys, returning how
    /// many keys were forgotten
    pub fn prune_expired(&mut self) -> usize {
        let now = Instant::now();
        let window = self.window;
        let before = self.attempts.len();
        self.attempts.retain(|_, entry| {
            entry.retain(|&time| now.duration_since(time) < window);
            !entry.is_empty()
        });
        before - self.attempts.len()
    }
}
