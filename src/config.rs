//! Configuration for the admission gate's counter store.

use serde::{Deserialize, Serialize};

/// Tuning knobs for counter retention and pruning.
///
/// Per-action limits do not live here: they travel with each check (or in
/// the [`RuleBook`](crate::admission::RuleBook)), so changing a limit takes
/// effect on the very next call with no store coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// How long an untouched counter stays resident after its window
    /// closes, in milliseconds.
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,

    /// Run a piggybacked prune pass once per this many admission checks.
    /// Zero disables piggybacked pruning (background sweep only).
    #[serde(default = "default_prune_every")]
    pub prune_every: u64,

    /// Interval for the optional background sweep task, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            stale_after_ms: default_stale_after_ms(),
            prune_every: default_prune_every(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_stale_after_ms() -> u64 {
    300_000
}

fn default_prune_every() -> u64 {
    4096
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl GateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GateConfig = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::AdmissionError::Config(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.stale_after_ms, 300_000);
        assert_eq!(config.prune_every, 4096);
        assert_eq!(config.sweep_interval_secs, 60);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: GateConfig = serde_yaml::from_str("stale_after_ms: 1000").unwrap();
        assert_eq!(config.stale_after_ms, 1_000);
        assert_eq!(config.prune_every, 4096);
        assert_eq!(config.sweep_interval_secs, 60);
    }
}
