//! In-memory store registry using `DashMap`.
//!
//! Stores are named entries in a registry; data is lost on process exit.
//! Writes are staged in the writer and published on `finish`. A name with a
//! live writer cannot be opened for read, and a name with an open cursor
//! cannot be opened for write.

use super::{Entry, KvCursor, KvWriter};
use crate::{Error, Result};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

/// Registry of named in-memory stores.
///
/// Cloning shares the same registry. Each store is an immutable
/// `Arc<Vec<Entry>>` snapshot; an open cursor holds one reference to it.
///
/// # Example
///
/// ```rust
/// use tensorkv::kv::{KvCursor, KvWriter, MemoryKvStore};
///
/// # fn example() -> tensorkv::Result<()> {
/// let registry = MemoryKvStore::new();
/// let mut writer = registry.create_writer("numbers")?;
/// writer.put("one", b"1")?;
/// writer.finish()?;
///
/// let mut cursor = registry.open_cursor("numbers")?;
/// assert_eq!(cursor.next_entry()?, Some(("one".to_string(), b"1".to_vec())));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    stores: Arc<DashMap<String, Arc<Vec<Entry>>>>,
    writing: Arc<DashMap<String, ()>>,
}

impl MemoryKvStore {
    /// Create a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry behind `StoreKind::Memory`.
    #[must_use]
    pub fn global() -> Self {
        static GLOBAL: OnceLock<MemoryKvStore> = OnceLock::new();
        GLOBAL.get_or_init(Self::new).clone()
    }

    /// Truncate (or create) `name` and return a writer for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreBusy`] if a cursor or another writer on `name`
    /// is still open.
    pub fn create_writer(&self, name: &str) -> Result<MemoryWriter> {
        let reading = self
            .stores
            .get(name)
            .is_some_and(|records| Arc::strong_count(records.value()) > 1);
        if reading {
            return Err(Error::StoreBusy(name.to_string()));
        }
        match self.writing.entry(name.to_string()) {
            MapEntry::Occupied(_) => return Err(Error::StoreBusy(name.to_string())),
            MapEntry::Vacant(slot) => {
                slot.insert(());
            }
        }

        self.stores.insert(name.to_string(), Arc::new(Vec::new()));
        Ok(MemoryWriter {
            registry: self.clone(),
            name: name.to_string(),
            staged: Vec::new(),
            finished: false,
        })
    }

    /// Open a cursor at the first entry of `name`.
    ///
    /// # Errors
    ///
    /// - [`Error::StoreBusy`] if a writer on `name` is still open
    /// - [`Error::StoreNotFound`] if `name` was never written
    pub fn open_cursor(&self, name: &str) -> Result<MemoryCursor> {
        if self.writing.contains_key(name) {
            return Err(Error::StoreBusy(name.to_string()));
        }
        let records = self
            .stores
            .get(name)
            .map(|records| Arc::clone(records.value()))
            .ok_or_else(|| Error::StoreNotFound(name.to_string()))?;
        Ok(MemoryCursor {
            records,
            position: 0,
        })
    }

    /// Number of entries in `name`, if it exists.
    #[must_use]
    pub fn entry_count(&self, name: &str) -> Option<usize> {
        self.stores.get(name).map(|records| records.len())
    }

    /// Check if a store named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    /// Drop the store `name`. Open cursors keep their snapshot.
    pub fn remove(&self, name: &str) {
        self.stores.remove(name);
    }

    /// Number of stores in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Check if the registry holds no stores.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Drop every store.
    pub fn clear(&self) {
        self.stores.clear();
    }
}

/// Staging writer for one in-memory store
pub struct MemoryWriter {
    registry: MemoryKvStore,
    name: String,
    staged: Vec<Entry>,
    finished: bool,
}

impl KvWriter for MemoryWriter {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        if self.finished {
            return Err(Error::Closed);
        }
        self.staged.push((key.to_string(), value.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if !self.finished {
            let records = std::mem::take(&mut self.staged);
            self.registry
                .stores
                .insert(self.name.clone(), Arc::new(records));
            self.registry.writing.remove(&self.name);
            self.finished = true;
        }
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.registry.writing.remove(&self.name);
        }
    }
}

/// Cursor over a snapshot of one in-memory store
pub struct MemoryCursor {
    records: Arc<Vec<Entry>>,
    position: usize,
}

impl KvCursor for MemoryCursor {
    fn next_entry(&mut self) -> Result<Option<Entry>> {
        let entry = self.records.get(self.position).cloned();
        if entry.is_some() {
            self.position += 1;
        }
        Ok(entry)
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate(registry: &MemoryKvStore, name: &str, count: usize) {
        let mut writer = registry.create_writer(name).unwrap();
        for i in 0..count {
            writer.put(&format!("key{i}"), format!("value{i}").as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_memory_write_then_read() {
        let registry = MemoryKvStore::new();
        populate(&registry, "s", 2);

        let mut cursor = registry.open_cursor("s").unwrap();
        assert_eq!(
            cursor.next_entry().unwrap(),
            Some(("key0".to_string(), b"value0".to_vec()))
        );
        assert_eq!(
            cursor.next_entry().unwrap(),
            Some(("key1".to_string(), b"value1".to_vec()))
        );
        assert_eq!(cursor.next_entry().unwrap(), None);
    }

    #[test]
    fn test_memory_staged_until_finish() {
        let registry = MemoryKvStore::new();
        let mut writer = registry.create_writer("s").unwrap();
        writer.put("k", b"v").unwrap();

        assert_eq!(registry.entry_count("s"), Some(0));
        writer.finish().unwrap();
        assert_eq!(registry.entry_count("s"), Some(1));
    }

    #[test]
    fn test_memory_put_after_finish() {
        let registry = MemoryKvStore::new();
        let mut writer = registry.create_writer("s").unwrap();
        writer.finish().unwrap();
        assert!(matches!(writer.put("k", b"v"), Err(Error::Closed)));
    }

    #[test]
    fn test_memory_missing_store() {
        let registry = MemoryKvStore::new();
        assert!(matches!(
            registry.open_cursor("nope"),
            Err(Error::StoreNotFound(_))
        ));
    }

    #[test]
    fn test_memory_busy_while_reading() {
        let registry = MemoryKvStore::new();
        populate(&registry, "s", 1);

        let cursor = registry.open_cursor("s").unwrap();
        assert!(matches!(registry.create_writer("s"), Err(Error::StoreBusy(_))));

        drop(cursor);
        assert!(registry.create_writer("s").is_ok());
    }

    #[test]
    fn test_memory_busy_while_writing() {
        let registry = MemoryKvStore::new();
        populate(&registry, "s", 2);

        let mut writer = registry.create_writer("s").unwrap();
        writer.put("k", b"v").unwrap();
        assert!(matches!(registry.open_cursor("s"), Err(Error::StoreBusy(_))));
        assert!(matches!(registry.create_writer("s"), Err(Error::StoreBusy(_))));

        writer.finish().unwrap();
        let mut cursor = registry.open_cursor("s").unwrap();
        assert_eq!(cursor.next_entry().unwrap(), Some(("k".to_string(), b"v".to_vec())));
    }

    #[test]
    fn test_memory_abandoned_writer_releases_name() {
        let registry = MemoryKvStore::new();
        drop(registry.create_writer("s").unwrap());
        assert!(registry.open_cursor("s").is_ok());
        assert!(registry.create_writer("s").is_ok());
    }

    #[test]
    fn test_memory_rewind() {
        let registry = MemoryKvStore::new();
        populate(&registry, "s", 1);

        let mut cursor = registry.open_cursor("s").unwrap();
        cursor.next_entry().unwrap();
        assert_eq!(cursor.next_entry().unwrap(), None);
        cursor.rewind().unwrap();
        assert!(cursor.next_entry().unwrap().is_some());
    }

    #[test]
    fn test_memory_registry_bookkeeping() {
        let registry = MemoryKvStore::new();
        assert!(registry.is_empty());

        populate(&registry, "a", 1);
        populate(&registry, "b", 1);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));

        registry.remove("a");
        assert!(!registry.contains("a"));

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_memory_clones_share_registry() {
        let registry = MemoryKvStore::new();
        let other = registry.clone();
        populate(&registry, "shared", 3);
        assert_eq!(other.entry_count("shared"), Some(3));
    }
}
