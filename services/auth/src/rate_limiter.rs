//! Fixed-window request rate limiter keyed by client address

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 900, // 15 minutes
        }
    }
}

/// Rate limiter entry
#[derive(Debug)]
struct RateLimiterEntry {
    /// Requests counted in the current window
    requests: u32,
    /// Start of the current window
    window_start: Instant,
}

#[derive(Debug)]
struct RateLimiterState {
    entries: HashMap<String, RateLimiterEntry>,
    /// Expired entries are swept at most once per window
    last_sweep: Instant,
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Rate limiter configuration
    config: RateLimiterConfig,
    state: Arc<Mutex<RateLimiterState>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(RateLimiterState {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Count a request for `key` and report whether it is within the limit
    pub async fn is_allowed(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut state = self.state.lock().await;
        let window = Duration::from_secs(self.config.window_seconds);

        if now.saturating_duration_since(state.last_sweep) >= window {
            let before = state.entries.len();
            state
                .entries
                .retain(|_, entry| now.saturating_duration_since(entry.window_start) < window);
            state.last_sweep = now;
            debug!(
                "Swept {} expired rate limit entries",
                before - state.entries.len()
            );
        }

        let entry = state
            .entries
            .entry(key.to_string())
            .or_insert(RateLimiterEntry {
                requests: 0,
                window_start: now,
            });
        if now.saturating_duration_since(entry.window_start) >= window {
            entry.requests = 0;
            entry.window_start = now;
        }

        if entry.requests >= self.config.max_requests {
            debug!("Rate limit exceeded for {}", key);
            if entry.requests == self.config.max_requests {
                warn!(
                    "Client {} hit the limit of {} requests per {}s",
                    key, self.config.max_requests, self.config.window_seconds
                );
                entry.requests += 1;
            }
            return false;
        }

        entry.requests += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_requests,
            window_seconds: 60,
        })
    }

    #[tokio::test]
    async fn blocks_after_limit_within_window() {
        let limiter = limiter(2);
        let now = Instant::now();

        assert!(limiter.check_at("10.0.0.1", now).await);
        assert!(limiter.check_at("10.0.0.1", now).await);
        assert!(!limiter.check_at("10.0.0.1", now).await);
        assert!(!limiter.check_at("10.0.0.1", now).await);
        // Other clients are counted separately.
        assert!(limiter.check_at("10.0.0.2", now).await);
    }

    #[tokio::test]
    async fn window_resets() {
        let limiter = limiter(1);
        let start = Instant::now();

        assert!(limiter.check_at("10.0.0.1", start).await);
        assert!(!limiter.check_at("10.0.0.1", start).await);
        assert!(
            limiter
                .check_at("10.0.0.1", start + Duration::from_secs(61))
                .await
        );
    }

    #[tokio::test]
    async fn expired_entries_are_swept_once_per_window() {
        let limiter = limiter(5);
        let start = Instant::now();

        assert!(limiter.check_at("10.0.0.1", start).await);
        assert!(limiter.check_at("10.0.0.2", start).await);
        assert_eq!(limiter.state.lock().await.entries.len(), 2);

        // Within the window nothing is swept.
        assert!(
            limiter
                .check_at("10.0.0.3", start + Duration::from_secs(30))
                .await
        );
        assert_eq!(limiter.state.lock().await.entries.len(), 3);

        // The first request after a full window drops the elapsed entries.
        assert!(
            limiter
                .check_at("10.0.0.4", start + Duration::from_secs(61))
                .await
        );
        let state = limiter.state.lock().await;
        assert_eq!(state.entries.len(), 2);
        assert!(state.entries.contains_key("10.0.0.3"));
        assert!(state.entries.contains_key("10.0.0.4"));
    }
}
