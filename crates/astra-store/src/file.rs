//! JSON-file-backed store implementation.
//!
//! Each namespace is one JSON object in `<root>/<ns>.json`. Namespaces are
//! loaded on first touch and written through on every mutation, so state
//! survives gateway restarts. Suited to a single gateway process; there is
//! no cross-process locking.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use astra_types::error::{AstraError, Result};

use crate::KvStore;

type Cache = BTreeMap<String, BTreeMap<String, String>>;

/// A namespaced store persisted as one JSON document per namespace.
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    cache: Mutex<Cache>,
}

impl JsonFileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            cache: Mutex::new(BTreeMap::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn path_for(&self, ns: &str) -> Result<PathBuf> {
        if ns.is_empty()
            || !ns
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AstraError::Storage(format!("invalid namespace: {ns:?}")));
        }
        Ok(self.root.join(format!("{ns}.json")))
    }

    /// Ensure `ns` is present in the cache, reading its file if one exists.
    fn load(&self, cache: &mut Cache, ns: &str) -> Result<()> {
        if cache.contains_key(ns) {
            return Ok(());
        }
        let path = self.path_for(ns)?;
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            BTreeMap::new()
        };
        cache.insert(ns.to_string(), entries);
        Ok(())
    }

    /// Write the namespace's current contents back to its file.
    fn flush(&self, cache: &Cache, ns: &str) -> Result<()> {
        let path = self.path_for(ns)?;
        let entries = cache.get(ns).ok_or_else(|| {
            AstraError::Storage(format!("namespace vanished from cache: {ns}"))
        })?;
        let text = serde_json::to_string_pretty(entries)?;
        fs::write(&path, text)?;
        log::debug!("flushed namespace '{ns}' ({} keys)", entries.len());
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, ns: &str, key: &str) -> Result<Option<String>> {
        let mut cache = self.lock();
        self.load(&mut cache, ns)?;
        Ok(cache
            .get(ns)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn set(&self, ns: &str, key: &str, value: &str) -> Result<()> {
        let mut cache = self.lock();
        self.load(&mut cache, ns)?;
        if let Some(entries) = cache.get_mut(ns) {
            entries.insert(key.to_string(), value.to_string());
        }
        self.flush(&cache, ns)
    }

    fn delete(&self, ns: &str, key: &str) -> Result<bool> {
        let mut cache = self.lock();
        self.load(&mut cache, ns)?;
        let removed = cache
            .get_mut(ns)
            .is_some_and(|entries| entries.remove(key).is_some());
        if removed {
            self.flush(&cache, ns)?;
        }
        Ok(removed)
    }

    fn keys(&self, ns: &str) -> Result<Vec<String>> {
        let mut cache = self.lock();
        self.load(&mut cache, ns)?;
        Ok(cache
            .get(ns)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
