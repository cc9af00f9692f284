use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::fsutil::{self, FileError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load machine identity: {0}")]
    Load(#[source] FileError),
    #[error("failed to store machine identity: {0}")]
    Store(#[source] FileError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cache {
    Unloaded,
    Loaded(Option<String>),
}

/// Process-wide cache of the machine identity (`maas_id`).
///
/// The file is read at most once: the first caller to find the cache empty
/// loads it while holding the write lock, and every later read is served from
/// memory. [`IdentityStore::set`] replaces both the file and the cached value
/// under the same lock, so readers never see one without the other.
#[derive(Debug)]
pub struct IdentityStore {
    path: PathBuf,
    cached: RwLock<Cache>,
    #[cfg(test)]
    loads: AtomicUsize,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(Cache::Unloaded),
            #[cfg(test)]
            loads: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the machine identity, loading it from disk on first use.
    ///
    /// A missing, empty, or whitespace-only file means no identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the file exists but cannot be read. The
    /// cache stays empty, so a later call retries.
    pub fn get(&self) -> Result<Option<String>> {
        if let Cache::Loaded(id) = &*self.read() {
            return Ok(id.clone());
        }

        let mut cache = self.write();
        // Another caller may have loaded it while we waited for the lock.
        if let Cache::Loaded(id) = &*cache {
            return Ok(id.clone());
        }
        #[cfg(test)]
        self.loads.fetch_add(1, Ordering::SeqCst);
        let id = fsutil::read_to_string_if_exists(&self.path)
            .map_err(Error::Load)?
            .map(|contents| contents.trim().to_owned())
            .filter(|id| !id.is_empty());
        log::debug!(
            "Loaded machine identity from {}: {}",
            self.path.display(),
            id.as_deref().unwrap_or("<none>")
        );
        *cache = Cache::Loaded(id.clone());
        Ok(id)
    }

    /// Stores `id` on disk and in the cache; `None` removes the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the file cannot be written or removed. The
    /// cached value is left untouched in that case.
    pub fn set(&self, id: Option<&str>) -> Result<()> {
        let id = id.map(str::trim).filter(|id| !id.is_empty());

        let mut cache = self.write();
        match id {
            Some(id) => fsutil::write_atomic(&self.path, id.as_bytes()),
            None => fsutil::remove_if_exists(&self.path),
        }
        .map_err(Error::Store)?;
        *cache = Cache::Loaded(id.map(str::to_owned));
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Cache> {
        self.cached.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Cache> {
        self.cached.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn store() -> (tempfile::TempDir, IdentityStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path().join("maas_id"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_no_identity() {
        let (_dir, store) = store();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_reads_trimmed_identity() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "  abc123\n").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_blank_file_is_no_identity() {
        let (_dir, store) = store();
        std::fs::write(store.path(), " \n\t").unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_disk_is_read_only_once() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "abc123").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc123"));

        std::fs::write(store.path(), "changed").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc123"));
        std::fs::remove_file(store.path()).unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_set_writes_file_and_cache() {
        let (_dir, store) = store();
        store.set(Some("xyz789")).unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("xyz789"));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "xyz789");

        let reopened = IdentityStore::new(store.path());
        assert_eq!(reopened.get().unwrap().as_deref(), Some("xyz789"));
    }

    #[test]
    fn test_set_none_removes_file() {
        let (_dir, store) = store();
        store.set(Some("xyz789")).unwrap();
        store.set(None).unwrap();
        assert!(!store.path().exists());
        assert_eq!(store.get().unwrap(), None);

        // Clearing an absent identity is not an error.
        store.set(None).unwrap();
    }

    #[test]
    fn test_concurrent_first_access_reads_disk_once() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "abc123").unwrap();

        let barrier = Barrier::new(8);
        let results: Vec<Option<String>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        store.get().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|id| id.as_deref() == Some("abc123")));
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);

        store.get().unwrap();
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_never_exposes_a_partial_update() {
        let (_dir, store) = store();
        store.set(Some("old-id")).unwrap();

        let barrier = Barrier::new(5);
        let seen: Vec<Vec<Option<String>>> = std::thread::scope(|scope| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        (0..200).map(|_| store.get().unwrap()).collect::<Vec<_>>()
                    })
                })
                .collect();
            barrier.wait();
            store.set(Some("new-id")).unwrap();
            readers.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for values in &seen {
            assert!(
                values
                    .iter()
                    .all(|id| matches!(id.as_deref(), Some("old-id" | "new-id")))
            );
            // Once a reader has seen the new value it never goes back.
            if let Some(first_new) = values.iter().position(|id| id.as_deref() == Some("new-id")) {
                assert!(values[first_new..].iter().all(|id| id.as_deref() == Some("new-id")));
            }
        }
        assert_eq!(store.get().unwrap().as_deref(), Some("new-id"));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "new-id");
        assert_eq!(store.loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cold_readers_racing_set_see_old_or_new() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "old-id").unwrap();

        let barrier = Barrier::new(5);
        let seen: Vec<Option<String>> = std::thread::scope(|scope| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        store.get().unwrap()
                    })
                })
                .collect();
            barrier.wait();
            store.set(Some("new-id")).unwrap();
            readers.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(
            seen.iter()
                .all(|id| matches!(id.as_deref(), Some("old-id" | "new-id")))
        );
        assert!(store.loads.load(Ordering::SeqCst) <= 1);
        assert_eq!(store.get().unwrap().as_deref(), Some("new-id"));
    }

    #[test]
    fn test_load_failure_is_retried() {
        let (dir, store) = store();
        // A directory at the identity path cannot be read as a file.
        std::fs::create_dir(dir.path().join("maas_id")).unwrap();
        assert!(matches!(store.get(), Err(Error::Load(_))));

        std::fs::remove_dir(dir.path().join("maas_id")).unwrap();
        std::fs::write(store.path(), "abc123").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc123"));
    }
}
