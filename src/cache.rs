use crate::core::{Result, UpgradeError};
use crate::interface::Cache;
use crate::storage::JsonSnapshot;
use lru::LruCache;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Characters escaped when turning an IRI into a URI. Reserved characters and
/// `%` are left alone; non-ASCII is always escaped as UTF-8.
const IRI_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

pub fn iri_to_uri(iri: &str) -> String {
    utf8_percent_encode(iri, IRI_ESCAPE).to_string()
}

/// Cache key under which the web application memoizes `name` for the record
/// at `pootle_path`.
pub fn cache_key(pootle_path: &str, name: &str) -> String {
    iri_to_uri(&format!("{}:{}", pootle_path, name))
}

/// Bounded LRU cache used when no external cache server is configured.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Value>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| UpgradeError::Cache("Cache capacity must be >= 1".to_string()))?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn set(&self, key: impl Into<String>, value: Value) -> Result<()> {
        self.entries.lock()?.put(key.into(), value);
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entries.lock()?.contains(key))
    }

    /// Seed a cache from a JSON object dump; a missing file yields an empty
    /// cache. The cache grows past `capacity` to hold every dumped entry.
    pub fn load<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        let entries: BTreeMap<String, Value> =
            JsonSnapshot::new(path).load()?.unwrap_or_default();
        let cache = Self::new(capacity.max(entries.len()))?;
        for (key, value) in entries {
            cache.set(key, value)?;
        }
        Ok(cache)
    }

    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let entries: BTreeMap<String, Value> = self
            .entries
            .lock()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        JsonSnapshot::new(path).save(&entries)
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock()?.get(key).cloned())
    }

    fn delete_many(&self, keys: &[String]) -> Result<()> {
        let mut entries = self.entries.lock()?;
        for key in keys {
            entries.pop(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_escapes_non_ascii() {
        assert_eq!(cache_key("/fr/tutorial/", "getquickstats"), "/fr/tutorial/:getquickstats");
        assert_eq!(
            cache_key("/ru/проект/a b.po", "sync"),
            "/ru/%D0%BF%D1%80%D0%BE%D0%B5%D0%BA%D1%82/a%20b.po:sync"
        );
    }

    #[test]
    fn test_iri_to_uri_keeps_reserved() {
        assert_eq!(iri_to_uri("/a?b=c&d#e%20"), "/a?b=c&d#e%20");
    }

    #[test]
    fn test_delete_many() {
        let cache = MemoryCache::new(8).unwrap();
        cache.set("a", json!(1)).unwrap();
        cache.set("b", json!(2)).unwrap();
        cache.delete_many(&["a".to_string(), "missing".to_string()]).unwrap();

        assert_eq!(cache.get("a").unwrap(), None);
        assert_eq!(cache.get("b").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let cache = MemoryCache::new(2).unwrap();
        cache.set("a", json!(1)).unwrap();
        cache.set("b", json!(2)).unwrap();
        cache.get("a").unwrap();
        cache.set("c", json!(3)).unwrap();

        assert!(cache.contains("a").unwrap());
        assert!(!cache.contains("b").unwrap());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(MemoryCache::new(0).is_err());
    }

    #[test]
    fn test_dump_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        let cache = MemoryCache::new(4).unwrap();
        cache.set("/fr/tutorial/intro.po:sync", json!("2012-03-01T10:00:00Z")).unwrap();
        cache.dump(&path).unwrap();

        let loaded = MemoryCache::load(&path, 4).unwrap();
        assert_eq!(loaded.len().unwrap(), 1);
    }

    #[test]
    fn test_load_keeps_entries_beyond_capacity() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.json");
        let cache = MemoryCache::new(8).unwrap();
        for n in 0..5 {
            cache.set(format!("/fr/p/{}.po:sync", n), json!(1_330_000_000 + n)).unwrap();
        }
        cache.dump(&path).unwrap();

        let loaded = MemoryCache::load(&path, 3).unwrap();
        assert_eq!(loaded.len().unwrap(), 5);
        for n in 0..5 {
            assert!(loaded.contains(&format!("/fr/p/{}.po:sync", n)).unwrap());
        }

        loaded.dump(&path).unwrap();
        assert_eq!(MemoryCache::load(&path, 1).unwrap().len().unwrap(), 5);
    }

    #[test]
    fn test_load_missing_file_uses_capacity() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = MemoryCache::load(temp_dir.path().join("none.json"), 2).unwrap();
        assert!(loaded.is_empty().unwrap());
        assert!(MemoryCache::load(temp_dir.path().join("none.json"), 0).is_err());
    }
}
