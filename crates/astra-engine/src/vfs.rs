//! Virtual file system: a persisted name → content mapping.

use std::sync::Arc;

use astra_store::KvStore;
use astra_types::error::{AstraError, Result};

const NS: &str = "vfs";

/// Sentinel returned when listing an empty VFS.
pub const NO_FILES: &str = "No files in virtual file system";

/// Flat virtual file system over the injected store.
///
/// File names are unique keys; size is derived from content length. Each
/// operation is a single store call, so no extra locking is needed here.
#[derive(Clone)]
pub struct VirtualFs {
    store: Arc<dyn KvStore>,
}

impl VirtualFs {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Write or overwrite a file. Returns the content size in bytes.
    pub fn create(&self, name: &str, content: &str) -> Result<usize> {
        if name.is_empty() {
            return Err(AstraError::MissingIdentifier("filename".into()));
        }
        self.store.set(NS, name, content)?;
        log::debug!("vfs: wrote {name} ({} bytes)", content.len());
        Ok(content.len())
    }

    pub fn read(&self, name: &str) -> Result<String> {
        self.store
            .get(NS, name)?
            .ok_or_else(|| AstraError::NotFound(format!("file '{name}'")))
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        if self.store.delete(NS, name)? {
            Ok(())
        } else {
            Err(AstraError::NotFound(format!("file '{name}'")))
        }
    }

    /// All (name, size) pairs in lexicographic order.
    pub fn list(&self) -> Result<Vec<(String, usize)>> {
        let mut entries = Vec::new();
        for name in self.store.keys(NS)? {
            // A file deleted between keys() and get() is simply skipped.
            if let Some(content) = self.store.get(NS, &name)? {
                entries.push((name, content.len()));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use astra_store::MemoryStore;

    use super::*;

    fn vfs() -> VirtualFs {
        VirtualFs::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn create_returns_byte_size() {
        let fs = vfs();
        assert_eq!(fs.create("a.txt", "hello").unwrap(), 5);
        assert_eq!(fs.create("empty.txt", "").unwrap(), 0);
    }

    #[test]
    fn create_rejects_empty_name() {
        let err = vfs().create("", "content").unwrap_err();
        assert!(matches!(err, AstraError::MissingIdentifier(_)));
    }

    #[test]
    fn create_overwrites() {
        let fs = vfs();
        fs.create("a.txt", "one").unwrap();
        fs.create("a.txt", "two").unwrap();
        assert_eq!(fs.read("a.txt").unwrap(), "two");
    }

    #[test]
    fn read_missing_is_not_found() {
        let err = vfs().read("ghost.txt").unwrap_err();
        assert!(matches!(err, AstraError::NotFound(_)));
        assert!(format!("{err}").contains("ghost.txt"));
    }

    #[test]
    fn delete_then_read_fails() {
        let fs = vfs();
        fs.create("a.txt", "hello").unwrap();
        fs.delete("a.txt").unwrap();
        assert!(fs.read("a.txt").is_err());
    }

    #[test]
    fn delete_missing_is_not_found() {
        assert!(matches!(
            vfs().delete("ghost.txt").unwrap_err(),
            AstraError::NotFound(_)
        ));
    }

    #[test]
    fn list_is_sorted() {
        let fs = vfs();
        fs.create("zeta.txt", "zz").unwrap();
        fs.create("alpha.txt", "a").unwrap();
        let listing = fs.list().unwrap();
        assert_eq!(
            listing,
            vec![("alpha.txt".to_string(), 1), ("zeta.txt".to_string(), 2)]
        );
    }

    #[test]
    fn list_empty_is_empty() {
        assert!(vfs().list().unwrap().is_empty());
    }
}
