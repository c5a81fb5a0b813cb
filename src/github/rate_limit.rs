// src/github/rate_limit.rs
// =============================================================================
// The quota gate.
//
// GitHub reports the remaining core quota and the reset time (unix seconds)
// on every response. When the remaining quota drops to the threshold, the
// next caller sleeps until the reset time before sending another request.
//
// The state sits behind a tokio Mutex owned by the limiter. Every admitted
// caller takes one unit off `remaining` before its request is sent, so
// requests in flight count against the quota before GitHub reports back. A
// caller that has to wait holds the lock while sleeping, so every other worker
// queues behind the same reset instead of racing on stale counters.
// =============================================================================

use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::info;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

// Stop issuing core requests once this many remain
pub const DEFAULT_THRESHOLD: u64 = 3;

// Last quota numbers reported by the API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaState {
    pub remaining: Option<u64>,
    pub reset_at: Option<u64>,
}

impl QuotaState {
    // How long a caller must wait at `now` (unix seconds), if at all
    pub fn wait_for(&self, threshold: u64, now: u64) -> Option<Duration> {
        let remaining = self.remaining?;
        if remaining > threshold {
            return None;
        }
        let reset_at = self.reset_at?;
        if reset_at <= now {
            return None;
        }
        Some(Duration::from_secs(reset_at - now))
    }
}

pub struct RateLimiter {
    threshold: u64,
    state: Mutex<QuotaState>,
}

impl RateLimiter {
    pub fn new(threshold: u64) -> Self {
        RateLimiter {
            threshold,
            state: Mutex::new(QuotaState::default()),
        }
    }

    /// Blocks until a core request may be sent.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        if let Some(wait) = state.wait_for(self.threshold, unix_now()) {
            info!(
                remaining = state.remaining,
                wait_secs = wait.as_secs(),
                "quota nearly exhausted, waiting for reset"
            );
            tokio::time::sleep(wait).await;
            // Unknown until the next response reports fresh numbers
            state.remaining = None;
        }

        if let Some(remaining) = state.remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }

    pub async fn record(&self, quota: QuotaState) {
        let mut state = self.state.lock().await;
        if let Some(reported) = quota.remaining {
            let same_window = quota.reset_at.is_none() || quota.reset_at == state.reset_at;
            // Within one window a late response must not hand back units
            // already taken by requests admitted after it
            state.remaining = match state.remaining {
                Some(current) if same_window => Some(current.min(reported)),
                _ => Some(reported),
            };
        }
        if quota.reset_at.is_some() {
            state.reset_at = quota.reset_at;
        }
    }

    pub async fn snapshot(&self) -> QuotaState {
        *self.state.lock().await
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::new(DEFAULT_THRESHOLD)
    }
}

// Reads the quota headers; missing or malformed values stay None
pub fn quota_from_headers(headers: &HeaderMap) -> QuotaState {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };
    QuotaState {
        remaining: read(REMAINING_HEADER),
        reset_at: read(RESET_HEADER),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
