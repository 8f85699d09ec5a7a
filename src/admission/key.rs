//! Admission key construction and handling.

/// A key that uniquely identifies one caller's quota for one action.
///
/// Composed of the caller identity (authenticated user id, or a client
/// address fallback for anonymous traffic) and the protected action name.
/// The pair is the only invariant: two actions for the same identity never
/// share a counter, and the same action across two identities never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdmissionKey {
    /// The caller's identity
    pub identity: String,
    /// The protected action, e.g. "reactivate-subscription:POST"
    pub action: String,
}

impl AdmissionKey {
    /// Create a new admission key from an identity and an action.
    pub fn new(identity: &str, action: &str) -> Self {
        Self {
            identity: identity.to_string(),
            action: action.to_string(),
        }
    }
}

impl std::fmt::Display for AdmissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.identity, self.action)
    }
}
