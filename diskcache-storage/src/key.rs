//! Physical key layout for cached entries.
//!
//! One logical key maps to two store records: the value under the key itself
//! and the policy under the key with [`POLICY_SUFFIX`] appended. Data written
//! by any other implementation using the same layout stays readable.

use std::fmt;

/// Suffix appended to a logical key to address its policy record.
pub const POLICY_SUFFIX: &str = "_policy";

/// A logical cache key and the two physical keys derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    logical: String,
    policy: String,
}

impl CacheKey {
    /// Create a cache key from the caller-supplied logical key.
    pub fn new(key: impl Into<String>) -> Self {
        let logical = key.into();
        let policy = format!("{logical}{POLICY_SUFFIX}");
        Self { logical, policy }
    }

    /// The caller-supplied key.
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Store key of the value record.
    pub fn value_key(&self) -> &str {
        &self.logical
    }

    /// Store key of the policy record.
    pub fn policy_key(&self) -> &str {
        &self.policy
    }

    /// Recover the logical key from a policy record key.
    ///
    /// Returns `None` if `key` does not end with [`POLICY_SUFFIX`].
    pub fn from_policy_key(key: &str) -> Option<Self> {
        key.strip_suffix(POLICY_SUFFIX).map(Self::new)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.logical)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}
