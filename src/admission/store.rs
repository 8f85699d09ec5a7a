//! Shared counter store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::clock::Clock;
use crate::config::GateConfig;

use super::key::AdmissionKey;
use super::window::{assess, Decision, Limit, WindowEntry};

/// Process-wide mapping from admission key to window state.
///
/// This is the only shared mutable structure in the subsystem. The map is
/// sharded, so checks for distinct keys proceed without contending on a
/// common lock, while the per-entry guard makes the read-decide-write for
/// a single key indivisible: two concurrent callers can never both consume
/// the final slot in a window.
pub struct CounterStore {
    /// Window state indexed by admission key
    entries: DashMap<AdmissionKey, WindowEntry>,
    /// Checks observed since startup, for piggybacked prune scheduling
    applies: AtomicU64,
    /// Retention and prune cadence settings
    config: GateConfig,
}

impl CounterStore {
    /// Create an empty store with the given retention settings.
    pub fn new(config: GateConfig) -> Self {
        Self {
            entries: DashMap::new(),
            applies: AtomicU64::new(0),
            config,
        }
    }

    /// Atomically run the window policy against the entry for `key`.
    ///
    /// Creates a fresh zero-count entry on first sight of the key. The
    /// decision and the write-back happen under the same entry guard.
    /// Every call mutates state, allowed or denied.
    pub fn apply(&self, key: AdmissionKey, limit: &Limit, now_ms: u64) -> Decision {
        trace!(key = %key, "Applying admission window");

        let decision = {
            let mut entry = self.entries.entry(key).or_insert_with(|| {
                debug!("Creating new admission counter");
                WindowEntry::fresh(now_ms, limit.window_ms)
            });

            let (decision, updated) = assess(*entry, limit, now_ms);
            *entry = updated;
            decision
        };

        // The entry guard is released above; prune takes shard locks of
        // its own and must never run while one is held.
        self.note_apply(now_ms);

        decision
    }

    /// Remove entries whose window closed more than `older_than_ms` ago.
    ///
    /// Any touch after a window closes rolls the window over and refreshes
    /// its close time, so an old `window_end_ms` means the key has been
    /// idle since that window ended.
    pub fn prune(&self, older_than_ms: u64, now_ms: u64) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now_ms.saturating_sub(entry.window_end_ms) <= older_than_ms);

        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(
                removed,
                remaining = self.entries.len(),
                "Pruned stale admission counters"
            );
        }
    }

    /// Start a background task that prunes on a fixed interval.
    ///
    /// An alternative to the piggybacked prune for processes that prefer a
    /// predictable sweep cadence. The task holds only a weak reference and
    /// exits once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, clock: Arc<dyn Clock>) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        let period = Duration::from_secs(self.config.sweep_interval_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else { break };
                store.prune(store.config.stale_after_ms, clock.now_ms());
            }
        })
    }

    /// Get the number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store tracks no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all counters.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Schedule the piggybacked prune: one pass per `prune_every` checks.
    fn note_apply(&self, now_ms: u64) {
        if self.config.prune_every == 0 {
            return;
        }

        let n = self.applies.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.config.prune_every == 0 {
            self.prune(self.config.stale_after_ms, now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use futures::future::join_all;

    fn store() -> CounterStore {
        CounterStore::new(GateConfig::default())
    }

    fn key(identity: &str, action: &str) -> AdmissionKey {
        AdmissionKey::new(identity, action)
    }

    #[test]
    fn test_apply_creates_counter_lazily() {
        let store = store();
        assert!(store.is_empty());

        let decision = store.apply(key("user-1", "menu:POST"), &Limit::new(5, 1_000), 0);

        assert!(decision.allowed);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = store();
        let limit = Limit::new(1, 1_000);

        let first = store.apply(key("user-1", "menu:POST"), &limit, 0);
        let denied = store.apply(key("user-1", "menu:POST"), &limit, 0);

        // Exhausting one key leaves sibling keys untouched
        let other_action = store.apply(key("user-1", "menu:DELETE"), &limit, 0);
        let other_identity = store.apply(key("user-2", "menu:POST"), &limit, 0);

        assert!(first.allowed);
        assert!(!denied.allowed);
        assert!(other_action.allowed);
        assert!(other_identity.allowed);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_denials_count_against_the_window() {
        let store = store();
        let limit = Limit::new(2, 1_000);
        let k = key("user-1", "billing:POST");

        store.apply(k.clone(), &limit, 0);
        store.apply(k.clone(), &limit, 0);

        // Hammering a denied key never recovers quota within the window
        for t in [10, 20, 900, 999] {
            let decision = store.apply(k.clone(), &limit, t);
            assert!(!decision.allowed);
            assert_eq!(decision.remaining, 0);
            assert_eq!(decision.reset_at_ms, 1_000);
        }
    }

    #[tokio::test]
    async fn test_concurrent_checks_admit_exactly_the_limit() {
        let capacity = 50;
        let store = Arc::new(CounterStore::new(GateConfig::default()));
        let limit = Limit::new(capacity, 60_000);

        let mut handles = vec![];
        for _ in 0..capacity * 2 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.apply(AdmissionKey::new("user-1", "search:GET"), &limit, 1_000)
            }));
        }

        let results = join_all(handles).await;
        let allowed = results
            .into_iter()
            .filter(|r| matches!(r, Ok(d) if d.allowed))
            .count();

        assert_eq!(allowed, capacity as usize);
    }

    #[test]
    fn test_prune_removes_only_stale_entries() {
        let store = store();
        let limit = Limit::new(5, 1_000);

        store.apply(key("idle", "menu:GET"), &limit, 0);
        store.apply(key("active", "menu:GET"), &limit, 10_000);

        // idle's window closed at t=1000; active's is still open
        store.prune(5_000, 10_500);

        assert_eq!(store.len(), 1);
        let fresh = store.apply(key("idle", "menu:GET"), &limit, 10_500);
        assert_eq!(fresh.remaining, 4);
        assert_eq!(fresh.reset_at_ms, 11_500);
    }

    #[test]
    fn test_prune_spares_recently_closed_windows() {
        let store = store();
        store.apply(key("user-1", "menu:GET"), &Limit::new(5, 1_000), 0);

        // Window closed at t=1000 but within the staleness allowance
        store.prune(5_000, 3_000);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_piggybacked_prune_runs_on_cadence() {
        let config = GateConfig {
            stale_after_ms: 0,
            prune_every: 2,
            sweep_interval_secs: 60,
        };
        let store = CounterStore::new(config);
        let limit = Limit::new(5, 100);

        store.apply(key("old", "menu:GET"), &limit, 0);

        // Second apply hits the cadence and sweeps the stale key out
        let decision = store.apply(key("new", "menu:GET"), &limit, 10_000);
        assert!(decision.allowed);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweeper_prunes() {
        let config = GateConfig {
            stale_after_ms: 0,
            prune_every: 0,
            sweep_interval_secs: 1,
        };
        let store = Arc::new(CounterStore::new(config));
        let clock = Arc::new(ManualClock::new(0));

        store.apply(key("user-1", "menu:GET"), &Limit::new(5, 100), 0);
        clock.set(10_000);

        let handle = store.spawn_sweeper(clock);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(store.is_empty());
        handle.abort();
    }

    #[test]
    fn test_clear() {
        let store = store();
        store.apply(key("user-1", "menu:GET"), &Limit::new(5, 1_000), 0);
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }
}
