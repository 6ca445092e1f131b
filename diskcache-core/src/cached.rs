//! The tagged result emitted by a cached fetch.

use std::fmt;

/// A value together with its policy and provenance.
///
/// A fetch emits at most one `Cached` read back from the store
/// (`from_disk == true`) followed by the freshly computed one
/// (`from_disk == false`). Equality is structural over all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cached<V, P> {
    /// The cached or freshly computed value.
    value: V,
    /// The policy stored alongside the value.
    policy: P,
    /// Whether this was read from the store.
    from_disk: bool,
}

impl<V, P> Cached<V, P> {
    /// Create a result read back from the store.
    pub fn from_disk(value: V, policy: P) -> Self {
        Self {
            value,
            policy,
            from_disk: true,
        }
    }

    /// Create a result produced by running the underlying producer.
    pub fn fresh(value: V, policy: P) -> Self {
        Self {
            value,
            policy,
            from_disk: false,
        }
    }

    /// Get a reference to the value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Get a reference to the policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Check if this result was served from the store.
    pub fn is_from_disk(&self) -> bool {
        self.from_disk
    }

    /// Check if this result was freshly computed.
    pub fn is_fresh(&self) -> bool {
        !self.from_disk
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Consume the wrapper and return `(value, policy, from_disk)`.
    pub fn into_parts(self) -> (V, P, bool) {
        (self.value, self.policy, self.from_disk)
    }

    /// Map the inner value to a new type, keeping policy and provenance.
    pub fn map<U, F>(self, f: F) -> Cached<U, P>
    where
        F: FnOnce(V) -> U,
    {
        Cached {
            value: f(self.value),
            policy: self.policy,
            from_disk: self.from_disk,
        }
    }
}

impl<V, P> AsRef<V> for Cached<V, P> {
    fn as_ref(&self) -> &V {
        &self.value
    }
}

impl<V: fmt::Debug, P: fmt::Debug> fmt::Display for Cached<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cached{{from_disk={}, policy={:?}, value={:?}}}",
            self.from_disk, self.policy, self.value
        )
    }
}
