//! Per-payer fixed-window rate limiting.
//!
//! Each payer account gets a counter that resets entirely when its window
//! expires. Bursts of up to twice the quota are possible across a window
//! boundary.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Requests allowed per window when no quota is configured.
pub const DEFAULT_QUOTA: u32 = 10;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub quota: u32,
    pub window: Duration,
    /// How often stale entries are swept
    pub sweep_interval: Duration,
    /// How long an expired entry is kept before the sweeper drops it
    pub grace_period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            quota: DEFAULT_QUOTA,
            window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(5 * 60),
            grace_period: Duration::from_secs(2 * 60),
        }
    }
}

impl RateLimitConfig {
    /// Default timings with a per-minute quota. A quota of 0 keeps the default.
    pub fn per_minute(quota: u32) -> Self {
        Self {
            quota,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window limiter shared by every charge request in the process.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    config: RateLimitConfig,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl RateLimiter {
    pub fn new(mut config: RateLimitConfig) -> Self {
        if config.quota == 0 {
            config.quota = DEFAULT_QUOTA;
        }
        Self {
            windows: DashMap::new(),
            config,
        }
    }

    pub fn quota(&self) -> u32 {
        self.config.quota
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Records a request for `key` and reports whether it is within quota.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Requests left for `key` in its current window. Never mutates.
    pub fn remaining(&self, key: &str) -> u32 {
        self.remaining_at(key, Instant::now())
    }

    /// Drops entries whose window expired more than the grace period ago.
    /// Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Number of payers currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Runs [`sweep`](Self::sweep) every `sweep_interval` until the limiter is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, tracked = limiter.tracked(), "Swept rate limit entries");
                }
            }
        })
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let fresh = Window {
            count: 1,
            reset_at: now + self.config.window,
        };

        match self.windows.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                true
            }
            Entry::Occupied(mut slot) => {
                let window = slot.get_mut();
                if now > window.reset_at {
                    *window = fresh;
                    true
                } else if window.count < self.config.quota {
                    window.count += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn remaining_at(&self, key: &str, now: Instant) -> u32 {
        match self.windows.get(key) {
            Some(window) if now <= window.reset_at => {
                self.config.quota.saturating_sub(window.count)
            }
            _ => self.config.quota,
        }
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let grace = self.config.grace_period;
        let mut removed = 0;
        self.windows.retain(|_, window| {
            let keep = now <= window.reset_at + grace;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }
}
