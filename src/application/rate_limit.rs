//! Fixed-window admission control keyed by caller identity.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

const METRIC_RATE_LIMIT_DENIED: &str = "social_rate_limit_denied_total";
const METRIC_RATE_LIMIT_IDENTITIES: &str = "social_rate_limit_identities";

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub permitted: bool,
    /// Time until the current window closes. Zero when permitted.
    pub retry_after: Duration,
}

impl Decision {
    fn permit() -> Self {
        Self {
            permitted: true,
            retry_after: Duration::ZERO,
        }
    }

    fn deny(retry_after: Duration) -> Self {
        Self {
            permitted: false,
            retry_after,
        }
    }

    /// Whole seconds for a `Retry-After` header, rounded up and never zero.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        let rounded = if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        rounded.max(1)
    }
}

/// Admission decision per caller identity.
///
/// Implementations keep their own counting state; a shared store for a
/// fleet of processes plugs in here.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, identity: &str) -> Decision;
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// In-process fixed-window counter.
///
/// At most `limit` requests per identity are admitted in each window; the
/// window restarts on the first request after it elapses.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: DashMap<String, WindowState>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: DashMap::new(),
        }
    }

    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    /// Drop identities whose window ended more than `idle_ttl` ago.
    /// Returns how many were removed.
    pub fn sweep_idle(&self, idle_ttl: Duration) -> usize {
        let now = Instant::now();
        let horizon = self.window + idle_ttl;
        let before = self.windows.len();
        self.windows
            .retain(|_, state| now.duration_since(state.start) < horizon);
        let removed = before.saturating_sub(self.windows.len());
        gauge!(METRIC_RATE_LIMIT_IDENTITIES).set(self.windows.len() as f64);
        removed
    }

    /// Run [`sweep_idle`](Self::sweep_idle) every `every` until the handle is
    /// aborted.
    pub fn spawn_sweeper(
        limiter: Arc<Self>,
        every: Duration,
        idle_ttl: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep_idle(idle_ttl);
                if removed > 0 {
                    debug!(
                        removed,
                        remaining = limiter.tracked_identities(),
                        "swept idle rate-limit windows"
                    );
                }
            }
        })
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, identity: &str) -> Decision {
        let now = Instant::now();

        let state = match self.windows.entry(identity.to_owned()) {
            Entry::Vacant(vacant) => {
                vacant.insert(WindowState {
                    start: now,
                    count: 1,
                });
                gauge!(METRIC_RATE_LIMIT_IDENTITIES).set(self.windows.len() as f64);
                return self.admit_first();
            }
            Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                let elapsed = now.duration_since(state.start);
                if elapsed >= self.window {
                    *state = WindowState {
                        start: now,
                        count: 1,
                    };
                } else {
                    state.count = state.count.saturating_add(1);
                }
                *state
            }
        };

        if state.count <= self.limit {
            return Decision::permit();
        }

        counter!(METRIC_RATE_LIMIT_DENIED).increment(1);
        let elapsed = now.duration_since(state.start);
        Decision::deny(self.window.saturating_sub(elapsed))
    }
}

impl FixedWindowLimiter {
    /// A zero limit denies even the request that opens the window, which
    /// then has the full window left to run.
    fn admit_first(&self) -> Decision {
        if self.limit == 0 {
            counter!(METRIC_RATE_LIMIT_DENIED).increment(1);
            return Decision::deny(self.window);
        }
        Decision::permit()
    }
}
