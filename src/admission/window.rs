//! Fixed-window accounting.
//!
//! The policy here is a pure function: it reads one entry, decides, and
//! describes the mutation. The store owns all exclusion, so the policy
//! never needs a lock of its own.
//!
//! Fixed window is a deliberate choice over sliding-window or bucket
//! algorithms: O(1) per request, one counter and two timestamps per key.
//! The known weakness is boundary bursts, where up to twice the limit can
//! land in an interval straddling two windows. That tradeoff is accepted.

/// Per-call limit configuration for one action.
///
/// Travels with every admission check and is never cached in the store,
/// so a changed limit takes effect on the very next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    /// Maximum requests admitted within one window
    pub max_requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl Limit {
    /// Create a limit of `max_requests` per `window_ms` milliseconds.
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// `n` requests per second.
    pub fn per_second(n: u32) -> Self {
        Self::new(n, 1_000)
    }

    /// `n` requests per minute.
    pub fn per_minute(n: u32) -> Self {
        Self::new(n, 60_000)
    }
}

/// Per-key counter state for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    /// Requests counted in the current window
    pub count: u32,
    /// When the current window began (unix ms)
    pub window_start_ms: u64,
    /// When the current window closes (unix ms); refreshed on every touch
    /// so staleness checks see the limit supplied on the latest call
    pub window_end_ms: u64,
}

impl WindowEntry {
    /// Fresh zero-count entry opening a window at `now_ms`.
    pub fn fresh(now_ms: u64, window_ms: u64) -> Self {
        Self {
            count: 0,
            window_start_ms: now_ms,
            window_end_ms: now_ms.saturating_add(window_ms),
        }
    }
}

/// The outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// The ceiling that applied to this check
    pub limit: u32,
    /// Quota left in the current window after this check
    pub remaining: u32,
    /// When the current window closes (unix ms)
    pub reset_at_ms: u64,
}

impl Decision {
    /// Milliseconds until the window resets, from the caller's `now`.
    pub fn retry_after_ms(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms)
    }
}

/// Apply the fixed-window policy to one entry.
///
/// Rolls the window over once `window_ms` has elapsed, admits while the
/// count is below the limit, and denies without consuming quota otherwise.
/// Denied checks still touch the entry, so retry storms cannot reset or
/// bypass the window.
///
/// A backward clock jump leaves `window_start_ms` in the future; the
/// saturating elapsed computation reads that as an unelapsed window, so it
/// never causes a spurious reset or a negative remaining count.
pub fn assess(mut entry: WindowEntry, limit: &Limit, now_ms: u64) -> (Decision, WindowEntry) {
    if now_ms.saturating_sub(entry.window_start_ms) >= limit.window_ms {
        entry = WindowEntry::fresh(now_ms, limit.window_ms);
    } else {
        // Keep the close time in step with the limit supplied on this call.
        entry.window_end_ms = entry.window_start_ms.saturating_add(limit.window_ms);
    }

    let allowed = entry.count < limit.max_requests;
    if allowed {
        entry.count += 1;
    }

    let decision = Decision {
        allowed,
        limit: limit.max_requests,
        remaining: limit.max_requests.saturating_sub(entry.count),
        reset_at_ms: entry.window_end_ms,
    };

    (decision, entry)
}
