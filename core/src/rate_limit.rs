//! Server-reported quota and the pacing decision derived from it.
//!
//! The server is the only source of truth: the remaining count is overwritten
//! from every response and never decremented locally. Below the low-water
//! mark the gap between dispatches grows linearly with the shortfall.

use std::time::Duration;

use crate::http::HttpResponse;

/// Response header carrying the remaining call budget.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Quota level at or above which calls are dispatched back to back.
pub const DEFAULT_LOW_WATER_MARK: u64 = 60;

/// Remaining quota assumed before the first response arrives.
pub const DEFAULT_INITIAL_REMAINING: u64 = 60;

/// Last-observed remaining quota. Owned by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    remaining: u64,
}

impl RateLimit {
    pub fn new(initial_remaining: u64) -> Self {
        Self {
            remaining: initial_remaining,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Overwrite the remaining quota from a response. A missing or
    /// non-numeric header counts as zero.
    pub fn observe(&mut self, response: &HttpResponse) -> u64 {
        self.remaining = parse_remaining(response.header(REMAINING_HEADER));
        self.remaining
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_REMAINING)
    }
}

/// Parse a remaining-quota header value; anything but an unsigned integer is 0.
pub fn parse_remaining(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// How long to wait between dispatches for a given remaining quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub low_water_mark: u64,
    /// Delay per call of shortfall below the low-water mark.
    pub unit: Duration,
}

impl PacingPolicy {
    /// `(low_water_mark - remaining)` units when below the mark, otherwise zero.
    pub fn delay_for(&self, remaining: u64) -> Duration {
        let shortfall = self.low_water_mark.saturating_sub(remaining);
        let shortfall = u32::try_from(shortfall).unwrap_or(u32::MAX);
        self.unit.saturating_mul(shortfall)
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            unit: Duration::from_secs(1),
        }
    }
}
