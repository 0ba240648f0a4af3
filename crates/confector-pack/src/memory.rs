use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::entry::check_path;
use crate::error::{PackError, PackResult};
use crate::store::{matching, ArchiveStore};

/// In-memory archive.
///
/// Intended for tests and embedding. Clones share the same entries, so a
/// handle kept by the caller can still inspect what a registry wrote after
/// the registry consumed its own handle.
#[derive(Clone, Default)]
pub struct InMemoryArchive {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// All entry paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.entries
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ArchiveStore for InMemoryArchive {
    fn write_entry(&mut self, path: &str, data: &[u8]) -> PackResult<()> {
        if self.is_closed() {
            return Err(PackError::Closed);
        }
        check_path(path)?;
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn read_entry(&self, path: &str) -> PackResult<Vec<u8>> {
        self.entries
            .read()
            .expect("lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| PackError::EntryNotFound(path.to_string()))
    }

    fn entry_exists(&self, path: &str) -> bool {
        self.entries.read().expect("lock poisoned").contains_key(path)
    }

    fn list_entries(&self, pattern: &str) -> PackResult<Vec<String>> {
        let map = self.entries.read().expect("lock poisoned");
        matching(map.keys().map(String::as_str), pattern)
    }

    fn close(&mut self) -> PackResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(PackError::Closed);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryArchive")
            .field("entry_count", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
