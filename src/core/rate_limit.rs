//! Sliding-window admission control keyed by client identity.
//!
//! Each client key keeps the instants of its recently admitted requests.
//! Entries older than the window are purged on every check, so a key never
//! holds more than `capacity` instants. The key map is an LRU with a soft cap
//! of `max_tracked_clients`: when a new client arrives at a full map, the
//! least recently seen client whose instants have all aged out is forgotten.
//! A client still inside its window is never forgotten, so the map grows past
//! the cap rather than losing live history.

use lru::LruCache;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Configuration for rate limiting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Trailing window length.
    pub window: Duration,
    /// Admitted requests allowed per window and client.
    pub capacity: usize,
    /// Distinct client keys kept in memory while idle ones can be reclaimed.
    pub max_tracked_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            capacity: 60,
            max_tracked_clients: 10_000,
        }
    }
}

impl RateLimitConfig {
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_tracked_clients(mut self, max: usize) -> Self {
        self.max_tracked_clients = max;
        self
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: usize },
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Sliding-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Mutex<LruCache<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(LruCache::unbounded()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit or reject a request from `client_key` at `now`.
    pub fn admit(&self, client_key: &str, now: Instant) -> bool {
        self.check(client_key, now).is_admitted()
    }

    /// Like [`admit`](Self::admit), with the remaining budget or retry hint.
    ///
    /// The whole purge-count-record sequence runs under one lock, so two
    /// concurrent checks can never both take the last slot.
    pub fn check(&self, client_key: &str, now: Instant) -> Admission {
        let window = self.config.window;
        let capacity = self.config.capacity;

        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        if !clients.contains(client_key) && clients.len() >= self.config.max_tracked_clients {
            // Least recently seen first
            let idle = clients
                .iter()
                .rev()
                .find(|(_, recent)| {
                    recent
                        .back()
                        .map_or(true, |&newest| now.saturating_duration_since(newest) > window)
                })
                .map(|(key, _)| key.clone());
            if let Some(key) = idle {
                clients.pop(&key);
            }
        }
        let recent = clients.get_or_insert_mut(client_key.to_string(), VecDeque::new);

        while let Some(&oldest) = recent.front() {
            if now.saturating_duration_since(oldest) > window {
                recent.pop_front();
            } else {
                break;
            }
        }

        if recent.len() >= capacity {
            let retry_after = recent
                .front()
                .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(window);
            return Admission::Rejected { retry_after };
        }

        recent.push_back(now);
        Admission::Admitted {
            remaining: capacity - recent.len(),
        }
    }

    /// Number of instants currently stored for `client_key`.
    pub fn recorded(&self, client_key: &str) -> usize {
        let clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        clients.peek(client_key).map_or(0, VecDeque::len)
    }

    /// Number of distinct client keys held in memory.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn limiter(capacity: usize) -> RateLimiter {
        RateLimiter::new(
            RateLimitConfig::default()
                .with_window(Duration::from_secs(60))
                .with_capacity(capacity),
        )
    }

    #[test]
    fn test_admits_up_to_capacity() {
        let limiter = limiter(3);
        let t0 = Instant::now();

        for i in 0..3 {
            assert!(limiter.admit("client", t0 + Duration::from_secs(i)));
        }
        assert!(!limiter.admit("client", t0 + Duration::from_secs(3)));
        assert_eq!(limiter.recorded("client"), 3);
    }

    #[test]
    fn test_rejection_does_not_record() {
        let limiter = limiter(1);
        let t0 = Instant::now();

        assert!(limiter.admit("client", t0));
        for i in 1..10 {
            assert!(!limiter.admit("client", t0 + Duration::from_secs(i)));
        }
        assert_eq!(limiter.recorded("client"), 1);
    }

    #[test]
    fn test_window_slides() {
        let limiter = limiter(1);
        let t0 = Instant::now();

        assert!(limiter.admit("client", t0));
        assert!(!limiter.admit("client", t0 + Duration::from_secs(60)));
        assert!(limiter.admit("client", t0 + Duration::from_secs(60) + Duration::from_millis(1)));
    }

    #[test]
    fn test_retry_after_tracks_oldest() {
        let limiter = limiter(2);
        let t0 = Instant::now();

        limiter.admit("client", t0);
        limiter.admit("client", t0 + Duration::from_secs(10));

        match limiter.check("client", t0 + Duration::from_secs(15)) {
            Admission::Rejected { retry_after } => assert_eq!(retry_after, Duration::from_secs(45)),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = limiter(2);
        let t0 = Instant::now();
        assert_eq!(limiter.check("client", t0), Admission::Admitted { remaining: 1 });
        assert_eq!(limiter.check("client", t0), Admission::Admitted { remaining: 0 });
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1);
        let t0 = Instant::now();

        assert!(limiter.admit("alice", t0));
        assert!(limiter.admit("bob", t0));
        assert!(!limiter.admit("alice", t0));
    }

    fn churn_limiter() -> RateLimiter {
        RateLimiter::new(
            RateLimitConfig::default()
                .with_window(Duration::from_secs(60))
                .with_capacity(1)
                .with_max_tracked_clients(2),
        )
    }

    #[test]
    fn test_idle_clients_are_evicted() {
        let limiter = churn_limiter();
        let t0 = Instant::now();

        limiter.admit("a", t0);
        limiter.admit("b", t0 + Duration::from_secs(30));
        // "a" has aged out of its window, "b" has not
        limiter.admit("c", t0 + Duration::from_secs(61));

        assert_eq!(limiter.tracked_clients(), 2);
        assert_eq!(limiter.recorded("a"), 0);
        assert_eq!(limiter.recorded("b"), 1);
        assert_eq!(limiter.recorded("c"), 1);
    }

    #[test]
    fn test_full_client_survives_key_churn() {
        let limiter = churn_limiter();
        let t0 = Instant::now();

        assert!(limiter.admit("a", t0));
        assert!(!limiter.admit("a", t0 + Duration::from_secs(1)));
        assert!(limiter.admit("b", t0 + Duration::from_secs(2)));
        assert!(limiter.admit("c", t0 + Duration::from_secs(3)));

        assert!(!limiter.admit("a", t0 + Duration::from_secs(4)));
        assert_eq!(limiter.recorded("a"), 1);
        // Every key is live, so the map grows past its soft cap
        assert_eq!(limiter.tracked_clients(), 3);
    }

    #[test]
    fn test_concurrent_checks_never_exceed_capacity() {
        let limiter = Arc::new(limiter(50));
        let admitted = Arc::new(AtomicUsize::new(0));
        let now = Instant::now();

        std::thread::scope(|s| {
            for _ in 0..8 {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                s.spawn(move || {
                    for _ in 0..25 {
                        if limiter.admit("shared", now) {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 50);
        assert_eq!(limiter.recorded("shared"), 50);
    }
}
