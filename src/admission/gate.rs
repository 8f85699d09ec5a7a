//! The admission gate, public entry point for admission checks.

use std::panic;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::error::{AdmissionError, Result};

use super::key::AdmissionKey;
use super::rules::{FaultPolicy, RuleBook};
use super::store::CounterStore;
use super::window::{Decision, Limit};

/// Admission gate combining the counter store and the window policy.
///
/// Create one instance at process start and hand it (behind `Arc`) to every
/// request handler; a fresh instance per test gives isolation without any
/// global state. Checks are synchronous and constant-time, so they can sit
/// on the hot path of every protected endpoint.
pub struct AdmissionGate {
    /// The shared counter store
    store: Arc<CounterStore>,
    /// Per-action rules, swappable at runtime
    rules: RwLock<RuleBook>,
    /// Time source for checks that do not supply their own
    clock: Arc<dyn Clock>,
}

impl AdmissionGate {
    /// Create a gate with default tuning, the system clock, and no rules.
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    /// Create a gate with specific store tuning.
    pub fn with_config(config: GateConfig) -> Self {
        Self::with_parts(config, RuleBook::new(), Arc::new(SystemClock))
    }

    /// Create a gate with store tuning and a per-action rule book.
    pub fn with_rules(config: GateConfig, rules: RuleBook) -> Self {
        Self::with_parts(config, rules, Arc::new(SystemClock))
    }

    /// Fully injected constructor; tests use it to control time.
    pub fn with_parts(config: GateConfig, rules: RuleBook, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(CounterStore::new(config)),
            rules: RwLock::new(rules),
            clock,
        }
    }

    /// Check admission for one identity/action pair under a caller-supplied
    /// limit, stamped with the gate's clock.
    ///
    /// Every call counts against the window, allowed or denied, so repeated
    /// denied attempts cannot reset or bypass it. A deny is a normal
    /// `Ok(Decision)`; only misconfiguration and store faults are errors.
    pub fn check(&self, identity: &str, action: &str, limit: Limit) -> Result<Decision> {
        self.check_at(identity, action, limit, self.clock.now_ms())
    }

    /// Deterministic variant of [`check`](Self::check) with an explicit
    /// timestamp in unix milliseconds.
    pub fn check_at(
        &self,
        identity: &str,
        action: &str,
        limit: Limit,
        now_ms: u64,
    ) -> Result<Decision> {
        validate(identity, action, &limit)?;

        let key = AdmissionKey::new(identity, action);
        trace!(
            key = %key,
            max_requests = limit.max_requests,
            window_ms = limit.window_ms,
            "Checking admission"
        );

        let decision = self.guarded_apply(key, &limit, now_ms)?;

        if !decision.allowed {
            debug!(identity, action, reset_at_ms = decision.reset_at_ms, "Admission denied");
        }

        Ok(decision)
    }

    /// Check admission using the configured rule for `action`.
    ///
    /// Store faults are mapped through the action's fault policy instead of
    /// propagating; configuration errors still propagate, and an action
    /// without a rule is rejected.
    pub fn check_action(&self, identity: &str, action: &str) -> Result<Decision> {
        self.check_action_at(identity, action, self.clock.now_ms())
    }

    /// Deterministic variant of [`check_action`](Self::check_action).
    pub fn check_action_at(&self, identity: &str, action: &str, now_ms: u64) -> Result<Decision> {
        let (limit, on_fault) = {
            let rules = self.rules.read();
            let rule = rules
                .get(action)
                .ok_or_else(|| AdmissionError::UnknownAction(action.to_string()))?;
            (rule.limit(), rule.on_fault)
        };

        validate(identity, action, &limit)?;

        match self.guarded_apply(AdmissionKey::new(identity, action), &limit, now_ms) {
            Ok(decision) => Ok(decision),
            Err(AdmissionError::StoreFault(reason)) => {
                warn!(
                    action,
                    reason = %reason,
                    policy = ?on_fault,
                    "Admission check faulted, applying fault policy"
                );
                Ok(fault_decision(on_fault, &limit, now_ms))
            }
            Err(e) => Err(e),
        }
    }

    /// Replace the rule book; the next check sees the new rules.
    pub fn replace_rules(&self, rules: RuleBook) {
        *self.rules.write() = rules;
        debug!("Admission rules replaced");
    }

    /// Get a snapshot of the current rule book.
    pub fn rules(&self) -> RuleBook {
        self.rules.read().clone()
    }

    /// Start the background prune sweep for this gate's store.
    ///
    /// Must be called from within a tokio runtime. The task exits once the
    /// gate is dropped.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.store.spawn_sweeper(Arc::clone(&self.clock))
    }

    /// Get the number of keys currently tracked by the store.
    pub fn counter_count(&self) -> usize {
        self.store.len()
    }

    /// Drop all counters.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Run the store mutation with panic containment, so a corrupted store
    /// surfaces as a fault the caller (or the fault policy) can handle.
    fn guarded_apply(&self, key: AdmissionKey, limit: &Limit, now_ms: u64) -> Result<Decision> {
        panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.store.apply(key, limit, now_ms)
        }))
        .map_err(|_| {
            warn!("Counter store panicked during admission check");
            AdmissionError::StoreFault("panic in counter store".to_string())
        })
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject programmer errors before the store is touched.
fn validate(identity: &str, action: &str, limit: &Limit) -> Result<()> {
    if identity.is_empty() {
        return Err(AdmissionError::Config("identity must not be empty".to_string()));
    }
    if action.is_empty() {
        return Err(AdmissionError::Config("action must not be empty".to_string()));
    }
    if limit.max_requests == 0 {
        return Err(AdmissionError::Config("max_requests must be positive".to_string()));
    }
    if limit.window_ms == 0 {
        return Err(AdmissionError::Config("window_ms must be positive".to_string()));
    }
    Ok(())
}

/// Synthetic decision standing in for a check the store could not perform.
/// It carries no quota information beyond the configured ceiling.
fn fault_decision(policy: FaultPolicy, limit: &Limit, now_ms: u64) -> Decision {
    Decision {
        allowed: policy == FaultPolicy::Open,
        limit: limit.max_requests,
        remaining: 0,
        reset_at_ms: now_ms.saturating_add(limit.window_ms),
    }
}
