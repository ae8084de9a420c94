//! Typed JSON cache over a [`KeyValueStore`].

use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::CacheError;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Type-safe cache with automatic JSON serialization.
///
/// Clones share the same backend.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Cache {
    /// Wrap an existing backend.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// A cache that lives only as long as the process.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// A cache persisted under `dir`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cache = Cache::open("~/.local/share/shop")?;
    /// ```
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        Ok(Self::new(Arc::new(FileStore::open(dir)?)))
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cart: Option<Vec<LineItem>> = cache.get("cart:alice")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.store.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Set a value in the cache.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(key, &bytes)
    }

    /// Delete a value from the cache.
    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key)
    }

    /// Check if a key exists in the cache.
    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.store.exists(key)
    }

    /// Get all keys in the cache.
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.store.keys()
    }

    /// Read-modify-write a value.
    ///
    /// Updates through the same `Cache` (or its clones) are serialized.
    /// `f` receives `None` when the key is missing; returning `None`
    /// deletes it.
    pub fn update<T, F>(&self, key: &str, f: F) -> Result<Option<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> Option<T>,
    {
        let _guard = self.write_lock.lock();
        let next = f(self.get(key)?);
        match &next {
            Some(value) => self.set(key, value)?,
            None => self.delete(key)?,
        }
        Ok(next)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = cache_key!("cart", user_id);
/// // Returns "cart:user123"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Line {
        sku: String,
        qty: i64,
    }

    #[test]
    fn test_typed_roundtrip() {
        let cache = Cache::memory();
        let lines = vec![Line {
            sku: "tee".into(),
            qty: 2,
        }];

        cache.set("cart:alice", &lines).unwrap();
        let back: Option<Vec<Line>> = cache.get("cart:alice").unwrap();
        assert_eq!(back, Some(lines));
        assert!(cache.get::<Vec<Line>>("cart:bob").unwrap().is_none());
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        let cache = Cache::memory();
        cache.set("k", &"text").unwrap();
        assert!(matches!(
            cache.get::<Vec<Line>>("k"),
            Err(CacheError::SerializeError(_))
        ));
    }

    #[test]
    fn test_update() {
        let cache = Cache::memory();
        cache
            .update("orders:bob", |list: Option<Vec<u32>>| {
                let mut list = list.unwrap_or_default();
                list.push(1);
                Some(list)
            })
            .unwrap();
        let updated = cache
            .update("orders:bob", |list: Option<Vec<u32>>| {
                list.map(|mut l| {
                    l.push(2);
                    l
                })
            })
            .unwrap();
        assert_eq!(updated, Some(vec![1, 2]));

        cache.update("orders:bob", |_: Option<Vec<u32>>| None).unwrap();
        assert!(!cache.exists("orders:bob").unwrap());
    }

    #[test]
    fn test_cache_key() {
        let user = "alice";
        assert_eq!(cache_key!("cart", user), "cart:alice");
        assert_eq!(cache_key!("orders", user, 3), "orders:alice:3");
    }

    #[test]
    fn test_persists_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        Cache::open(dir.path()).unwrap().set("session:current", &42).unwrap();
        let reopened = Cache::open(dir.path()).unwrap();
        assert_eq!(reopened.get::<i32>("session:current").unwrap(), Some(42));
    }
}
