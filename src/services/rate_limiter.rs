//! In-memory sliding-window rate limiter for login attempts.
//!
//! Keys are login emails. State resets on process restart and is safe to
//! share via `Arc<RateLimiter>` across handler tasks.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Attempts allowed per email within the window
pub const LOGIN_MAX_ATTEMPTS: usize = 5;
/// Login window length in seconds
pub const LOGIN_WINDOW_SECS: u64 = 5 * 60;

/// Tracks per-key attempt timestamps.
pub struct RateLimiter {
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Limiter configured for `auth.login`
    pub fn for_login() -> Self {
        Self::new(LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW_SECS)
    }

    /// Check `key` against the limit. Returns `true` if the request is allowed,
    /// `false` if it is rate-limited. Records the attempt on `true`.
    pub fn check_and_record(&self, key: &str) -> bool {
        let mut attempts = self.attempts.lock();
        let now = Instant::now();

        let entry = attempts.entry(key.to_lowercase()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);

        if entry.len() >= self.max_attempts {
            return false;
        }
        entry.push(now);
        true
    }

    /// Remove expired entries (call periodically to free memory).
    pub fn cleanup(&self) {
        let mut attempts = self.attempts.lock();
        let now = Instant::now();
        attempts.retain(|_, entries| {
            entries.retain(|t| now.duration_since(*t) < self.window);
            !entries.is_empty()
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.attempts.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_allows_within_limit() {
        let l = RateLimiter::new(3, 60);
        assert!(l.check_and_record("a@b.com"));
        assert!(l.check_and_record("a@b.com"));
        assert!(l.check_and_record("a@b.com"));
    }

    #[test]
    fn rate_limiter_blocks_over_limit() {
        let l = RateLimiter::for_login();
        for _ in 0..LOGIN_MAX_ATTEMPTS {
            assert!(l.check_and_record("admin@royalpaints.test"));
        }
        assert!(!l.check_and_record("admin@royalpaints.test"));
    }

    #[test]
    fn rate_limiter_key_is_case_insensitive() {
        let l = RateLimiter::new(1, 60);
        assert!(l.check_and_record("Admin@Example.com"));
        assert!(!l.check_and_record("admin@example.com"));
    }

    #[test]
    fn rate_limiter_keys_are_independent() {
        let l = RateLimiter::new(2, 60);
        l.check_and_record("user1@b.com");
        l.check_and_record("user1@b.com");
        assert!(!l.check_and_record("user1@b.com"));

        assert!(l.check_and_record("user2@b.com"));
    }

    #[test]
    fn rate_limiter_cleanup_drops_expired_keys() {
        let l = RateLimiter::new(100, 0); // zero window: everything expires
        l.check_and_record("a@b.com");
        l.cleanup();
        assert_eq!(l.tracked_keys(), 0);
    }
}
