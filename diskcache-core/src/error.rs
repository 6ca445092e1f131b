//! Error types for diskcache operations

use std::fmt;
use thiserror::Error;

/// Store adapter errors.
///
/// Every `CacheStore` operation reports failures through this type, whatever
/// the backing engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("I/O error on {key}: {reason}")]
    Io { key: String, reason: String },

    #[error("Transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Serialization failed for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Build a `NotFound` error for a key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Build an `Io` error for a key from any displayable cause.
    pub fn io(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Io {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `Serialization` error for a key from any displayable cause.
    pub fn serialization(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Serialization {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if the record simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all diskcache errors.
#[derive(Debug, Clone, Error)]
pub enum DiskCacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for diskcache operations.
pub type DiskCacheResult<T> = Result<T, DiskCacheError>;

/// Result type alias for store adapter operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Terminal failure of a cached fetch.
///
/// Cache-path problems never show up here: they are absorbed by the
/// pipeline. Only the producer, the policy creation function and the
/// persist step can end a fetch with an error.
#[derive(Debug, Error)]
pub enum FetchError<E> {
    /// The underlying producer failed. The error is passed through untouched.
    #[error("Producer failed: {0}")]
    Producer(E),

    /// The producer succeeded but persisting its result failed.
    #[error("Persisting fresh value failed: {0}")]
    Persist(#[source] StoreError),

    /// The policy creation function panicked. Nothing was persisted.
    #[error("Policy creation failed: {reason}")]
    Policy { reason: String },
}

impl<E> FetchError<E> {
    /// Returns the producer error, if this is one.
    pub fn producer(&self) -> Option<&E> {
        match self {
            Self::Producer(e) => Some(e),
            Self::Persist(_) | Self::Policy { .. } => None,
        }
    }

    /// Consume the error and return the producer error, if this is one.
    pub fn into_producer(self) -> Option<E> {
        match self {
            Self::Producer(e) => Some(e),
            Self::Persist(_) | Self::Policy { .. } => None,
        }
    }

    /// Returns true if the failure happened while persisting.
    pub fn is_persist(&self) -> bool {
        matches!(self, Self::Persist(_))
    }

    /// Returns true if the policy creation function failed.
    pub fn is_policy(&self) -> bool {
        matches!(self, Self::Policy { .. })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_not_found() {
        let err = StoreError::not_found("user42_policy");
        let msg = format!("{}", err);
        assert!(msg.contains("Key not found"));
        assert!(msg.contains("user42_policy"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_store_error_display_io() {
        let err = StoreError::io("user42", "disk full");
        let msg = format!("{}", err);
        assert!(msg.contains("user42"));
        assert!(msg.contains("disk full"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "max_size_mb".to_string(),
            value: "0".to_string(),
            reason: "must be greater than 0".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("max_size_mb"));
        assert!(msg.contains("must be greater than 0"));
    }

    #[test]
    fn test_diskcache_error_from_variants() {
        let store = DiskCacheError::from(StoreError::LockPoisoned);
        assert!(matches!(store, DiskCacheError::Store(_)));

        let config = DiskCacheError::from(ConfigError::MissingRequired {
            field: "path".to_string(),
        });
        assert!(matches!(config, DiskCacheError::Config(_)));
    }

    #[test]
    fn test_fetch_error_accessors() {
        let producer: FetchError<&str> = FetchError::Producer("boom");
        assert_eq!(producer.producer(), Some(&"boom"));
        assert!(!producer.is_persist());
        assert_eq!(producer.into_producer(), Some("boom"));

        let persist: FetchError<&str> = FetchError::Persist(StoreError::io("k", "full"));
        assert!(persist.is_persist());
        assert!(persist.producer().is_none());
        assert!(format!("{}", persist).contains("Persisting fresh value failed"));

        let policy: FetchError<&str> = FetchError::Policy {
            reason: "create bug".to_string(),
        };
        assert!(policy.is_policy());
        assert!(!policy.is_persist());
        assert!(policy.into_producer().is_none());
    }
}
