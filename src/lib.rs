//! Turnstile - Request Admission Control
//!
//! This crate implements the admission-control gate shared by an API's
//! sensitive endpoints: per identity and per action, it decides whether a
//! request may proceed, keeps fixed-window counters in a sharded in-process
//! store, prunes stale counters to bound memory, and reports remaining
//! quota and reset time so clients can self-throttle.
//!
//! Quotas are process-local. Running several server processes yields
//! independent quotas per process; there is no cross-node coordination and
//! no state survives a restart.

pub mod admission;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;

pub use admission::{ActionRule, AdmissionGate, Decision, FaultPolicy, Limit, RuleBook};
pub use config::GateConfig;
pub use error::AdmissionError;
