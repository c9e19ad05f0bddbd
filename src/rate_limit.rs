use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::WindowLimit;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window: Duration,
}

impl From<WindowLimit> for RateLimitConfig {
    fn from(limit: WindowLimit) -> Self {
        Self {
            max_attempts: limit.max_attempts,
            window: Duration::from_secs(limit.window_secs),
        }
    }
}

#[derive(Debug)]
struct RateLimitEntry {
    attempts: u32,
    window_start: Instant,
}

/// Fixed-window attempt counter keyed by an arbitrary string (usually an email).
#[derive(Debug, Clone)]
pub struct RateLimiter {
    name: &'static str,
    config: RateLimitConfig,
    attempts: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, config: RateLimitConfig) -> Self {
        Self {
            name,
            config,
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records an attempt for `key`. Returns false once the window is exhausted.
    pub async fn check_rate_limit(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut attempts = self.attempts.lock().await;
        let window = self.config.window;

        // Drop windows that have run out
        attempts.retain(|_, entry| now.saturating_duration_since(entry.window_start) < window);

        match attempts.get_mut(key) {
            Some(entry) if entry.attempts >= self.config.max_attempts => {
                warn!(limiter = self.name, key = %key, "Rate limit exceeded");
                false
            }
            Some(entry) => {
                entry.attempts += 1;
                true
            }
            None => {
                attempts.insert(
                    key.to_string(),
                    RateLimitEntry {
                        attempts: 1,
                        window_start: now,
                    },
                );
                true
            }
        }
    }

    pub async fn reset_rate_limit(&self, key: &str) {
        let mut attempts = self.attempts.lock().await;
        attempts.remove(key);
    }
}
