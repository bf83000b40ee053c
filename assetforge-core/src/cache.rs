//! Cache store contract and an in-memory implementation

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::asset::Asset;

/// Storage for compiled assets.
///
/// Keys come from [`crate::hashing::cache_key`] and fold in a fingerprint of
/// every dependency; `dependencies` returns the dependency set last stored
/// for a request path so the current key can be recomputed before `get`.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Asset>;
    /// Store `asset` under `key`, replacing whatever `path` pointed to before.
    fn put(&self, path: &str, key: String, asset: Asset);
    fn dependencies(&self, path: &str) -> Option<BTreeSet<PathBuf>>;
}

#[derive(Debug)]
struct Entry {
    key: String,
    dependencies: BTreeSet<PathBuf>,
}

#[derive(Debug, Default)]
struct CacheState {
    assets: HashMap<String, Asset>,
    paths: HashMap<String, Entry>,
}

/// Process-local cache holding one asset per request path.
///
/// Concurrent misses for the same key may compile twice.
#[derive(Debug, Default)]
pub struct MemoryCache {
    state: RwLock<CacheState>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.read().assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<Asset> {
        self.state.read().assets.get(key).cloned()
    }

    fn put(&self, path: &str, key: String, asset: Asset) {
        let mut state = self.state.write();
        let entry = Entry {
            key: key.clone(),
            dependencies: asset.dependency_set().clone(),
        };
        if let Some(previous) = state.paths.insert(path.to_string(), entry) {
            if previous.key != key {
                state.assets.remove(&previous.key);
            }
        }
        state.assets.insert(key, asset);
    }

    fn dependencies(&self, path: &str) -> Option<BTreeSet<PathBuf>> {
        self.state
            .read()
            .paths
            .get(path)
            .map(|entry| entry.dependencies.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concatenation::Concatenation;

    fn asset(body: &str, dependency: &str) -> Asset {
        let mut concatenation = Concatenation::new();
        concatenation.push(dependency.into(), body.into());
        Asset::assemble(
            "app".into(),
            dependency.into(),
            "application/javascript".into(),
            &concatenation,
            [PathBuf::from(dependency)].into_iter().collect(),
        )
    }

    #[test]
    fn put_replaces_previous_entry_for_path() {
        let cache = MemoryCache::new();
        cache.put("app.js", "k1".into(), asset("one", "/app.js"));
        cache.put("app.js", "k2".into(), asset("two", "/app.js"));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("k1").is_none());
        assert_eq!(cache.get("k2").map(|a| a.content().into_owned()), Some("two".to_string()));
    }

    #[test]
    fn distinct_paths_are_kept_apart() {
        let cache = MemoryCache::new();
        cache.put("a.js", "ka".into(), asset("a", "/a.js"));
        cache.put("b.js", "kb".into(), asset("b", "/b.js"));

        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.dependencies("b.js"),
            Some([PathBuf::from("/b.js")].into_iter().collect())
        );
        assert!(cache.dependencies("c.js").is_none());
    }

    #[test]
    fn same_key_overwrites_in_place() {
        let cache = MemoryCache::new();
        cache.put("app.js", "k".into(), asset("one", "/app.js"));
        cache.put("app.js", "k".into(), asset("one", "/app.js"));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k").is_some());
    }
}
