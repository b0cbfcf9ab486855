use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, Instant};

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        // warframe.market allows 3 requests per second
        Self {
            max_requests: 3,
            window: Duration::from_secs(1),
        }
    }
}

/// Sliding-window gate shared by every monitoring loop: at most
/// `max_requests` grants inside any window of `window` length, across all
/// callers combined.
pub struct RateLimiter {
    config: RateLimiterConfig,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            grants: Mutex::new(VecDeque::with_capacity(config.max_requests)),
            config,
        }
    }

    /// Waits until a request slot is free and claims it.
    ///
    /// The window state lock is held across the in-window wait, so waiters
    /// are served in arrival order. A grant is recorded only at the moment
    /// this returns; dropping the future while it waits releases the lock
    /// and consumes nothing.
    pub async fn acquire(&self) {
        let mut grants = self.grants.lock().await;

        loop {
            let now = Instant::now();

            while let Some(&front) = grants.front() {
                if now.duration_since(front) >= self.config.window {
                    grants.pop_front();
                } else {
                    break;
                }
            }

            if grants.len() < self.config.max_requests {
                grants.push_back(now);
                return;
            }

            // The oldest grant leaves the window first; sleep until it does.
            let wait = self.config.window - now.duration_since(grants[0]);
            time::sleep(wait).await;
        }
    }

    /// Grants still inside the current window.
    pub async fn current_usage(&self) -> usize {
        let grants = self.grants.lock().await;
        let now = Instant::now();

        grants
            .iter()
            .filter(|&&t| now.duration_since(t) < self.config.window)
            .count()
    }

    pub fn max_requests(&self) -> usize {
        self.config.max_requests
    }

    pub fn window(&self) -> Duration {
        self.config.window
    }
}
