//! Transport projection for admission decisions.
//!
//! Stateless helpers that turn a [`Decision`] into response artifacts: the
//! standard rate-limit headers, the 429 status, and the structured denial
//! payload. Handlers attach the headers to every response, allowed or
//! denied, so well-behaved clients can self-throttle proactively; on a
//! denial they must short-circuit with [`TOO_MANY_REQUESTS`] and the
//! [`DenialBody`] before any business logic runs.

use serde::Serialize;

use crate::admission::Decision;

/// Status code for a denied request.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// Header carrying the rate-limit ceiling.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the remaining quota in the current window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the window reset time as an absolute unix timestamp
/// in seconds.
pub const RESET_HEADER: &str = "x-ratelimit-reset";
/// Header carrying seconds-until-retry, attached to denials only.
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Render the always-present rate-limit headers for a decision.
pub fn headers(decision: &Decision) -> Vec<(&'static str, String)> {
    vec![
        (LIMIT_HEADER, decision.limit.to_string()),
        (REMAINING_HEADER, decision.remaining.to_string()),
        (RESET_HEADER, (decision.reset_at_ms / 1_000).to_string()),
    ]
}

/// Headers for a denied response: the standard set plus `retry-after`.
pub fn denial_headers(decision: &Decision, now_ms: u64) -> Vec<(&'static str, String)> {
    let mut set = headers(decision);
    set.push((
        RETRY_AFTER_HEADER,
        retry_after_secs(decision, now_ms).to_string(),
    ));
    set
}

/// Structured body for a denied request, distinct from business-logic
/// error payloads so clients can tell "try again later" apart from a bad
/// request or an authorization failure.
#[derive(Debug, Clone, Serialize)]
pub struct DenialBody {
    /// Stable machine-readable error code
    pub error: &'static str,
    /// Human-readable guidance
    pub message: String,
    /// Seconds until the window resets
    pub retry_after_secs: u64,
}

impl DenialBody {
    /// Build the denial payload for a decision.
    pub fn new(decision: &Decision, now_ms: u64) -> Self {
        let retry_after_secs = retry_after_secs(decision, now_ms);
        Self {
            error: "rate_limited",
            message: format!("Rate limit exceeded. Retry in {} seconds", retry_after_secs),
            retry_after_secs,
        }
    }
}

/// Seconds until reset, rounded up so an open window never advertises
/// "retry in 0 seconds".
fn retry_after_secs(decision: &Decision, now_ms: u64) -> u64 {
    decision.retry_after_ms(now_ms).div_ceil(1_000)
}
