//! diskcache Core - Shared Types
//!
//! Pure data types shared by every diskcache crate: the tagged [`Cached`]
//! result, the [`CachePolicy`] contract with its stock policies, the error
//! taxonomy and store configuration. This crate performs no I/O.

pub mod cached;
pub mod config;
pub mod error;
pub mod policy;

pub use cached::Cached;
pub use config::StoreConfig;
pub use error::{
    ConfigError, DiskCacheError, DiskCacheResult, FetchError, StoreError, StoreResult,
};
pub use policy::{CachePolicy, TimeAndVersionPolicy, TimePolicy, VersionPolicy};
