//! Per-actor fixed-window admission control
//!
//! Each actor owns one window: the first admission after the window has
//! elapsed resets it, and at most `limit` admissions are granted inside a
//! window. This is a fixed window, not a sliding one, so a burst straddling a
//! boundary can see up to `2 * limit` admissions in a short span.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

/// Returned by [`RateLimiter::remaining`] when limiting is disabled
pub const UNBOUNDED: u32 = u32::MAX;

const MAX_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

/// Counting state for one actor
#[derive(Debug, Clone, Default)]
pub struct RateWindow {
    pub window_start: Option<DateTime<Utc>>,
    pub count: u32,
}

impl RateWindow {
    fn is_expired(&self, now: DateTime<Utc>, length: Duration) -> bool {
        match self.window_start {
            Some(start) => now - start >= length,
            None => true,
        }
    }

    fn reset(&mut self, now: DateTime<Utc>) {
        self.window_start = Some(now);
        self.count = 0;
    }
}

/// Actor-keyed fixed-window rate limiter
pub struct RateLimiter {
    enabled: bool,
    limit: u32,
    window: Duration,
    windows: DashMap<String, RateWindow>,
}

impl RateLimiter {
    pub fn new(enabled: bool, limit: u32, window: Duration) -> Self {
        Self {
            enabled,
            limit,
            window,
            windows: DashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        let window_secs = i64::try_from(config.window_secs)
            .unwrap_or(MAX_WINDOW_SECS)
            .min(MAX_WINDOW_SECS);
        Self::new(
            config.enabled,
            config.requests_per_window,
            Duration::seconds(window_secs),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Windows older than this are purged by [`RateLimiter::cleanup`]
    pub fn stale_after(&self) -> Duration {
        self.window * 2
    }

    /// Number of actors currently tracked
    pub fn tracked_actors(&self) -> usize {
        self.windows.len()
    }

    /// Admit one request for `actor`, counting it against the current window
    pub fn is_allowed(&self, actor: &str) -> bool {
        self.is_allowed_at(actor, Utc::now())
    }

    pub fn is_allowed_at(&self, actor: &str, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }

        // The entry guard keeps reset, check and increment atomic for this key.
        let mut window = self.windows.entry(actor.to_string()).or_default();
        if window.is_expired(now, self.window) {
            window.reset(now);
        }

        if window.count < self.limit {
            window.count += 1;
            debug!(actor = %actor, count = window.count, limit = self.limit, "Rate limit check passed");
            true
        } else {
            warn!(actor = %actor, count = window.count, limit = self.limit, "Rate limit exceeded");
            false
        }
    }

    /// Admissions left in the actor's current window
    pub fn remaining(&self, actor: &str) -> u32 {
        self.remaining_at(actor, Utc::now())
    }

    pub fn remaining_at(&self, actor: &str, now: DateTime<Utc>) -> u32 {
        if !self.enabled {
            return UNBOUNDED;
        }

        match self.windows.get(actor) {
            Some(window) if !window.is_expired(now, self.window) => {
                self.limit.saturating_sub(window.count)
            }
            _ => self.limit,
        }
    }

    /// End of the actor's current window, if one has been opened
    pub fn reset_time(&self, actor: &str) -> Option<DateTime<Utc>> {
        if !self.enabled {
            return None;
        }

        self.windows
            .get(actor)
            .and_then(|window| window.window_start)
            .map(|start| start + self.window)
    }

    /// Purge stale windows; returns how many were removed
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    pub fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.stale_after();
        let before = self.windows.len();
        self.windows.retain(|_, window| match window.window_start {
            Some(start) => start >= cutoff,
            None => true,
        });
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, "Purged stale rate limit windows");
        }
        removed
    }
}
