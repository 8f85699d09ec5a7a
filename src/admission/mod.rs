//! Admission control logic and state management.

mod gate;
mod key;
mod rules;
mod store;
mod window;

pub use gate::AdmissionGate;
pub use key::AdmissionKey;
pub use rules::{ActionRule, FaultPolicy, RuleBook};
pub use store::CounterStore;
pub use window::{assess, Decision, Limit, WindowEntry};
