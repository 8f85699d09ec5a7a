//! Error types for the admission gate.

use thiserror::Error;

/// Main error type for admission operations.
///
/// A denied request is never an error: denials come back as a normal
/// [`Decision`](crate::admission::Decision). Only misconfiguration and
/// internal store faults surface here.
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// Invalid call-site configuration: non-positive limit or window,
    /// empty identity or action. Rejected before the store is touched.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No rule is configured for the requested action.
    #[error("No admission rule for action: {0}")]
    UnknownAction(String),

    /// The counter store violated an internal invariant. The only variant
    /// eligible for per-action fail-open/fail-closed mapping.
    #[error("Counter store fault: {0}")]
    StoreFault(String),

    /// I/O errors while loading rule or gate configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for admission operations.
pub type Result<T> = std::result::Result<T, AdmissionError>;
