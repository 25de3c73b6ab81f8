//! Fixed-window request counting keyed by client.
//!
//! Every key gets its own window, opened by the first request seen for that key. Within a
//! window at most `permit_limit` requests are allowed; the rest are rejected until the
//! window closes. Rejections are immediate, nothing is queued.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::FixedWindowSettings;

/// Outcome of [`FixedWindowLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        /// Requests left in the current window
        remaining: u32,
        /// Time until the window closes
        reset_in: Duration,
    },
    Limited {
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    count: u32,
}

/// Thread-safe fixed-window limiter.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    name: &'static str,
    permit_limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(name: &'static str, settings: FixedWindowSettings) -> Self {
        Self {
            name,
            permit_limit: settings.permit_limit,
            window: settings.window(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Counts one request against `key` and tells whether it may proceed.
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        let window = windows.entry(key.to_owned()).or_insert(Window {
            opened_at: now,
            count: 0,
        });

        if now.duration_since(window.opened_at) >= self.window {
            window.opened_at = now;
            window.count = 0;
        }

        let reset_in = self.window.saturating_sub(now.duration_since(window.opened_at));

        if window.count < self.permit_limit {
            window.count += 1;
            RateLimitDecision::Allowed {
                remaining: self.permit_limit - window.count,
                reset_in,
            }
        } else {
            tracing::debug!(limiter = self.name, key, ?reset_in, "window exhausted");
            RateLimitDecision::Limited {
                retry_after: reset_in,
            }
        }
    }

    /// Drops windows that have closed. Run periodically so idle clients don't pile up.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let before = windows.len();
        windows.retain(|_, window| now.duration_since(window.opened_at) < self.window);
        tracing::trace!(
            limiter = self.name,
            purged = before - windows.len(),
            "purged expired rate limit windows"
        );
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.windows.lock().await.len()
    }
}
