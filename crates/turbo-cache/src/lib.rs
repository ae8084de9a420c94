//! Type-safe key-value store for TurboCommerce.
//!
//! Holds the small amount of state a storefront client keeps locally: the
//! session token, per-user cart snapshots and recent orders. Values are
//! stored as JSON through a [`KeyValueStore`] backend, either in memory or
//! as one file per key.
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_cache::{cache_key, Cache};
//!
//! let cache = Cache::open(data_dir)?;
//!
//! // Store a value
//! cache.set(&cache_key!("cart", "alice"), &lines)?;
//!
//! // Retrieve a value
//! let lines: Option<Vec<LineItem>> = cache.get(&cache_key!("cart", "alice"))?;
//!
//! // Delete a value
//! cache.delete(&cache_key!("cart", "alice"))?;
//! ```

mod error;
mod kv;
mod store;

pub use error::CacheError;
pub use kv::Cache;
pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{cache_key, Cache, CacheError, KeyValueStore};
}
