//! Sliding-window rate limiter.
//!
//! Tracks the timestamps of recent requests and answers whether another
//! one fits inside the window right now. Unlike a token bucket there is
//! no refill rate; capacity frees up exactly when old timestamps age out.
//!
//! The query methods do not reserve capacity. The intended protocol is
//! check, then record:
//!
//! ```ignore
//! if limiter.can_make_request() {
//!     limiter.record_request();
//!     // send it
//! }
//! ```
//!
//! Callers that skip the check and record anyway are trusted; the limiter
//! never rejects a record. [`RateLimiter::acquire`] bundles the protocol
//! (with waiting) into one atomic step for async callers.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::trace;

/// Rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Requests admitted per window.
    pub max_requests: usize,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimiterConfig {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Thread-safe sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Whether a request started now would stay inside the limit.
    pub fn can_make_request(&self) -> bool {
        let mut timestamps = self.timestamps.lock().unwrap();
        Self::prune(&mut timestamps, self.config.window, Instant::now());
        timestamps.len() < self.config.max_requests
    }

    /// Record that a request was just made. Never rejects; pair it with
    /// [`RateLimiter::can_make_request`].
    pub fn record_request(&self) {
        self.timestamps.lock().unwrap().push_back(Instant::now());
    }

    /// Slots still free in the current window.
    pub fn remaining_requests(&self) -> usize {
        let mut timestamps = self.timestamps.lock().unwrap();
        Self::prune(&mut timestamps, self.config.window, Instant::now());
        self.config.max_requests.saturating_sub(timestamps.len())
    }

    /// How long until the next request fits. Zero whenever
    /// [`RateLimiter::can_make_request`] is true.
    pub fn time_until_next_request(&self) -> Duration {
        let mut timestamps = self.timestamps.lock().unwrap();
        let now = Instant::now();
        Self::prune(&mut timestamps, self.config.window, now);
        if timestamps.len() < self.config.max_requests {
            return Duration::ZERO;
        }
        match timestamps.front() {
            Some(oldest) => (*oldest + self.config.window).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Wait for a free slot, then claim it. Check-and-record happens under
    /// one lock, so concurrent acquirers cannot oversubscribe the window.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock().unwrap();
                let now = Instant::now();
                Self::prune(&mut timestamps, self.config.window, now);
                if timestamps.len() < self.config.max_requests {
                    timestamps.push_back(now);
                    return;
                }
                match timestamps.front() {
                    Some(oldest) => (*oldest + self.config.window).saturating_duration_since(now),
                    // max_requests == 0: nothing ever frees up, re-check per window.
                    None => self.config.window,
                }
            };
            trace!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    // Timestamps aged a full window no longer count against the limit.
    fn prune(timestamps: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}
