//! Per-action admission rules.
//!
//! The rule book maps each protected action to its limit and its fault
//! policy. Rules are resolved on every check, never cached in the counter
//! store, so swapping the book takes effect on the next call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{AdmissionError, Result};

use super::window::Limit;

/// What the gate does when the counter store itself faults.
///
/// Deliberately an explicit per-action setting rather than a process-wide
/// default: payment and account-mutation actions fail closed, while
/// read-only low-risk actions may opt into failing open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Deny the request when the admission check itself fails
    #[default]
    Closed,
    /// Admit the request when the admission check itself fails
    Open,
}

/// Limit and fault policy for one protected action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRule {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Failure behavior when the store faults (closed unless stated)
    #[serde(default)]
    pub on_fault: FaultPolicy,
}

impl ActionRule {
    /// The per-call limit this rule prescribes.
    pub fn limit(&self) -> Limit {
        Limit::new(self.max_requests, self.window_ms)
    }
}

/// The complete per-action rule table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleBook {
    /// Rules indexed by action name
    #[serde(default)]
    pub actions: HashMap<String, ActionRule>,
}

impl RuleBook {
    /// Create an empty rule book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading admission rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load rules from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| AdmissionError::Config(format!("Failed to parse admission rules: {}", e)))
    }

    /// Get the rule for an action, if one is configured.
    pub fn get(&self, action: &str) -> Option<&ActionRule> {
        self.actions.get(action)
    }

    /// Insert or replace the rule for one action.
    pub fn set(&mut self, action: impl Into<String>, rule: ActionRule) {
        self.actions.insert(action.into(), rule);
    }
}
