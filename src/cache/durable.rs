//! Durable Store Module
//!
//! The persistent key-value text store the cache engine writes through, plus
//! an in-memory implementation and a file-backed one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

use crate::error::StoreError;

// == Durable Store ==
/// A synchronous key-value text store with finite capacity and no expiry.
///
/// Mirrors the shape of a browser-style storage area: keys are enumerated by
/// index, and writes may be rejected at any time.
pub trait DurableStore: Send + Sync {
    /// Number of keys currently stored.
    fn len(&self) -> usize;

    /// Key at position `index`, or `None` when out of range.
    fn key(&self, index: usize) -> Option<String>;

    /// Value stored under `key`, or `None` when absent.
    ///
    /// Reads never fail; an unreadable store behaves as empty.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is a no-op.
    fn remove_item(&self, key: &str);

    // == Keys ==
    /// Every key in index order, taken in one pass.
    ///
    /// The default walks `key(i)`; stores that can hand out their key list
    /// directly should override it.
    fn keys(&self) -> Vec<String> {
        (0..self.len()).filter_map(|i| self.key(i)).collect()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Size of a string in UTF-16 code units, the unit capacity is measured in.
pub fn char_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Map plus insertion order, with a running size total.
#[derive(Debug, Default)]
struct Items {
    values: HashMap<String, String>,
    order: Vec<String>,
    /// Characters held by keys and values
    used: usize,
}

impl Items {
    fn insert(&mut self, key: &str, value: &str) {
        let size = char_len(key) + char_len(value);
        match self.values.insert(key.to_string(), value.to_string()) {
            Some(old) => self.used = self.used - char_len(key) - char_len(&old) + size,
            None => {
                self.order.push(key.to_string());
                self.used += size;
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(old) = self.values.remove(key) {
            self.used -= char_len(key) + char_len(&old);
            if let Some(pos) = self.order.iter().position(|k| k == key) {
                self.order.remove(pos);
            }
        }
    }

    fn pairs(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }
}

// == Memory Store ==
/// In-memory store with an optional quota in characters.
///
/// Keys enumerate in insertion order; replacing a value keeps its position.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<Items>,
    /// Maximum characters (keys + values) the store accepts, None = unbounded
    quota: Option<usize>,
}

impl MemoryStore {
    // == Constructors ==
    /// Creates an unbounded, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes beyond `quota` characters.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: Mutex::new(Items::default()),
            quota: Some(quota),
        }
    }

    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut items = Items::default();
        for (key, value) in pairs {
            items.insert(&key, &value);
        }
        Self {
            items: Mutex::new(items),
            quota: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Items> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Used ==
    /// Total characters currently stored.
    pub fn used(&self) -> usize {
        self.lock().used
    }

    fn snapshot(&self) -> Vec<(String, String)> {
        self.lock().pairs()
    }
}

impl DurableStore for MemoryStore {
    fn len(&self) -> usize {
        self.lock().order.len()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.lock().order.get(index).cloned()
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut items = self.lock();

        if let Some(quota) = self.quota {
            let replaced = items
                .values
                .get(key)
                .map(|old| char_len(key) + char_len(old))
                .unwrap_or(0);
            let used = items.used - replaced;
            let needed = char_len(key) + char_len(value);

            if used + needed > quota {
                return Err(StoreError::QuotaExceeded {
                    needed,
                    available: quota.saturating_sub(used),
                });
            }
        }

        items.insert(key, value);
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.lock().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.lock().order.clone()
    }
}

// == File Store ==
/// A store persisted as a single JSON file of `[key, value]` pairs, kept in
/// insertion order.
///
/// Every mutation rewrites the file. A missing or unreadable file loads as an
/// empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Opens the store at `path`, loading whatever it already holds.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let pairs = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<(String, String)>>(&content) {
                Ok(pairs) => pairs,
                Err(e) => {
                    warn!("Discarding unreadable store file {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            path,
            inner: MemoryStore::from_pairs(pairs),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string(&self.inner.snapshot())?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn key(&self, index: usize) -> Option<String> {
        self.inner.key(index)
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let previous = self.inner.get_item(key);
        self.inner.set_item(key, value)?;

        if let Err(e) = self.persist() {
            // Keep memory and disk in agreement when the write cannot land
            match previous {
                Some(old) => {
                    let _ = self.inner.set_item(key, &old);
                }
                None => self.inner.remove_item(key),
            }
            return Err(e);
        }
        Ok(())
    }

    /// Removes `key` from memory and rewrites the file.
    ///
    /// A failed rewrite is only logged: the key stays gone for this process,
    /// but the stale copy on disk comes back on the next [`open`](Self::open).
    fn remove_item(&self, key: &str) {
        self.inner.remove_item(key);
        if let Err(e) = self.persist() {
            warn!("Failed to persist removal of {}: {}", key, e);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_basic_operations() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_item("a"), Some("1".to_string()));
        assert_eq!(store.key(0), Some("a".to_string()));
        assert_eq!(store.key(1), Some("b".to_string()));
        assert_eq!(store.key(2), None);

        store.remove_item("a");
        store.remove_item("a");
        assert_eq!(store.len(), 1);
        assert!(store.get_item("a").is_none());
    }

    #[test]
    fn test_memory_store_keys_follow_insertion_order() {
        let store = MemoryStore::new();
        store.set_item("zeta", "1").unwrap();
        store.set_item("alpha", "2").unwrap();
        store.set_item("mid", "3").unwrap();

        // Replacing keeps the original position
        store.set_item("zeta", "updated").unwrap();
        assert_eq!(store.keys(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(store.key(0), Some("zeta".to_string()));
        assert_eq!(store.key(1), Some("alpha".to_string()));

        store.remove_item("alpha");
        assert_eq!(store.keys(), vec!["zeta", "mid"]);
        assert_eq!(store.key(1), Some("mid".to_string()));
        assert_eq!(store.used(), char_len("zetaupdated") + char_len("mid3"));
    }

    #[test]
    fn test_default_keys_walks_index() {
        struct Indexed(Vec<String>);

        impl DurableStore for Indexed {
            fn len(&self) -> usize {
                self.0.len()
            }
            fn key(&self, index: usize) -> Option<String> {
                self.0.get(index).cloned()
            }
            fn get_item(&self, _key: &str) -> Option<String> {
                None
            }
            fn set_item(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
                Ok(())
            }
            fn remove_item(&self, _key: &str) {}
        }

        let store = Indexed(vec!["b".to_string(), "a".to_string()]);
        assert_eq!(store.keys(), vec!["b", "a"]);
    }

    #[test]
    fn test_memory_store_quota_rejects_overflow() {
        let store = MemoryStore::with_quota(10);

        store.set_item("abc", "defg").unwrap(); // 7 characters
        let result = store.set_item("xy", "z"); // 3 more fits exactly
        assert!(result.is_ok());

        let result = store.set_item("q", "r");
        assert!(matches!(
            result,
            Err(StoreError::QuotaExceeded {
                needed: 2,
                available: 0
            })
        ));
        assert!(store.get_item("q").is_none());
    }

    #[test]
    fn test_memory_store_quota_counts_replacement() {
        let store = MemoryStore::with_quota(8);

        store.set_item("key", "12345").unwrap();
        // Replacing the value frees the old one first
        store.set_item("key", "abcde").unwrap();
        assert_eq!(store.used(), 8);
    }

    #[test]
    fn test_char_len_counts_utf16_units() {
        assert_eq!(char_len("abc"), 3);
        assert_eq!(char_len("é"), 1);
        assert_eq!(char_len("😀"), 2);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("store.json");

        {
            let store = FileStore::open(&path);
            store.set_item("k1", "v1").unwrap();
            store.set_item("k2", "v2").unwrap();
            store.remove_item("k1");
        }

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.get_item("k2"), Some("v2".to_string()));
        assert!(reopened.get_item("k1").is_none());
    }

    #[test]
    fn test_file_store_corrupt_file_loads_empty() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert!(store.is_empty());

        store.set_item("k", "v").unwrap();
        assert_eq!(FileStore::open(&path).get_item("k"), Some("v".to_string()));
    }

    #[test]
    fn test_file_store_keeps_insertion_order_across_opens() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("store.json");

        {
            let store = FileStore::open(&path);
            store.set_item("second", "2").unwrap();
            store.set_item("first", "1").unwrap();
        }

        assert_eq!(FileStore::open(&path).keys(), vec!["second", "first"]);
    }

    #[test]
    fn test_file_store_rolls_back_when_persist_fails() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let store = FileStore::open(blocker.join("store.json"));
        let result = store.set_item("k", "v");

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(store.is_empty());
        assert!(store.get_item("k").is_none());
    }
}
