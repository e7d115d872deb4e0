//! Key-value store backends
//!
//! A store is an ordered, append-only list of `(key, value)` entries
//! addressed by a kind and a path. It is opened in exactly one mode:
//!
//! ```text
//! Unopened ──create(Write)──> WriteOpen ──close──> Closed(Written)
//!                                                      │
//!          Closed(Read) <──close── ReadOpen <──create(Read)
//! ```
//!
//! Opening for write truncates whatever was stored before. A handle closes
//! itself on drop, so the store is released on every exit path.
//!
//! # Example
//!
//! ```rust
//! use tensorkv::kv::{DbHandle, Mode, StoreKind};
//!
//! # fn example() -> tensorkv::Result<()> {
//! let mut db = DbHandle::create(StoreKind::Memory, "doc_example", Mode::Write)?;
//! db.put("train_000", b"value")?;
//! db.close()?;
//!
//! let mut db = DbHandle::create(StoreKind::Memory, "doc_example", Mode::Read)?;
//! let batch = db.read_batch(3)?; // wraps around the single entry
//! assert_eq!(batch.len(), 3);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod memory;
mod minidb;

pub use memory::{MemoryCursor, MemoryKvStore, MemoryWriter};
pub use minidb::{MiniDbCursor, MiniDbWriter, MINIDB_MAGIC};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One stored `(key, value)` pair
pub type Entry = (String, Vec<u8>);

/// Write side of a backend.
pub trait KvWriter {
    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot accept the write.
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Flush and publish everything written; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be made durable.
    fn finish(&mut self) -> Result<()>;
}

/// Sequential read side of a backend.
pub trait KvCursor {
    /// Next entry in store order, or `None` at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying data is unreadable or corrupt.
    fn next_entry(&mut self) -> Result<Option<Entry>>;

    /// Move back to the first entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot seek.
    fn rewind(&mut self) -> Result<()>;
}

/// Storage engine behind a store path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-wide in-memory registry; lost on exit
    Memory,
    /// Single append-only file on disk
    #[default]
    MiniDb,
}

impl StoreKind {
    /// Kind name as used in configuration
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::MiniDb => "minidb",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "minidb" => Ok(Self::MiniDb),
            _ => Err(Error::UnknownStoreKind(s.to_string())),
        }
    }
}

/// Access mode of an open store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Create or truncate, then append
    Write,
    /// Sequential iteration from the first entry
    Read,
}

enum State {
    Write(Box<dyn KvWriter>),
    Read(Box<dyn KvCursor>),
    Closed,
}

/// Handle to one open store.
pub struct DbHandle {
    kind: StoreKind,
    path: String,
    state: State,
}

impl DbHandle {
    /// Open the store at `(kind, path)` in `mode`.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if a `minidb` file cannot be created or opened
    /// - [`Error::StoreNotFound`] if a store opened for read does not exist
    /// - [`Error::StoreBusy`] if a memory store is already open in another handle
    /// - [`Error::CorruptStore`] if a `minidb` file has a bad header
    pub fn create(kind: StoreKind, path: impl Into<String>, mode: Mode) -> Result<Self> {
        let path = path.into();
        let state = match (kind, mode) {
            (StoreKind::Memory, Mode::Write) => {
                State::Write(Box::new(MemoryKvStore::global().create_writer(&path)?))
            }
            (StoreKind::Memory, Mode::Read) => {
                State::Read(Box::new(MemoryKvStore::global().open_cursor(&path)?))
            }
            (StoreKind::MiniDb, Mode::Write) => State::Write(Box::new(MiniDbWriter::create(&path)?)),
            (StoreKind::MiniDb, Mode::Read) => State::Read(Box::new(MiniDbCursor::open(&path)?)),
        };

        tracing::debug!(%kind, path, ?mode, "opened store");
        Ok(Self { kind, path, state })
    }

    /// Backend kind.
    #[must_use]
    pub const fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Store path or name.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current mode, or `None` once closed.
    #[must_use]
    pub const fn mode(&self) -> Option<Mode> {
        match self.state {
            State::Write(_) => Some(Mode::Write),
            State::Read(_) => Some(Mode::Read),
            State::Closed => None,
        }
    }

    /// Check if the handle is still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self.state, State::Closed)
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMode`] in read mode, [`Error::Closed`] after
    /// close, or the backend's write error.
    pub fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        match &mut self.state {
            State::Write(writer) => writer.put(key, value),
            State::Read(_) => Err(Error::InvalidMode {
                operation: "put",
                required: "write",
            }),
            State::Closed => Err(Error::Closed),
        }
    }

    /// Next entry in store order, without wrapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMode`] in write mode, [`Error::Closed`] after
    /// close, or the backend's read error.
    pub fn read_next(&mut self) -> Result<Option<Entry>> {
        self.cursor("read_next")?.next_entry()
    }

    /// Read the next `n` entries, wrapping to the first entry at the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyStore`] if the store has no entries, plus the
    /// errors of [`read_next`](Self::read_next).
    pub fn read_batch(&mut self, n: usize) -> Result<Vec<Entry>> {
        let cursor = self.cursor("read_batch")?;
        let mut entries = Vec::with_capacity(n);
        while entries.len() < n {
            if let Some(entry) = cursor.next_entry()? {
                entries.push(entry);
                continue;
            }
            cursor.rewind()?;
            tracing::debug!(read = entries.len(), "store cursor wrapped");
            match cursor.next_entry()? {
                Some(entry) => entries.push(entry),
                None => return Err(Error::EmptyStore),
            }
        }
        Ok(entries)
    }

    /// Move the read cursor back to the first entry.
    ///
    /// # Errors
    ///
    /// Same mode errors as [`read_next`](Self::read_next).
    pub fn rewind(&mut self) -> Result<()> {
        self.cursor("rewind")?.rewind()
    }

    /// Flush (write mode) and release the store. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the backend's flush error; the handle is closed regardless.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Write(mut writer) => {
                writer.finish()?;
                tracing::debug!(kind = %self.kind, path = %self.path, "closed store after write");
            }
            State::Read(_) => {
                tracing::debug!(kind = %self.kind, path = %self.path, "closed store after read");
            }
            State::Closed => {}
        }
        Ok(())
    }

    fn cursor(&mut self, operation: &'static str) -> Result<&mut dyn KvCursor> {
        match &mut self.state {
            State::Read(cursor) => Ok(cursor.as_mut()),
            State::Write(_) => Err(Error::InvalidMode {
                operation,
                required: "read",
            }),
            State::Closed => Err(Error::Closed),
        }
    }
}

impl fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbHandle")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("mode", &self.mode())
            .finish()
    }
}

impl Drop for DbHandle {
    fn drop(&mut self) {
        if self.mode() == Some(Mode::Write) {
            tracing::warn!(kind = %self.kind, path = %self.path, "store dropped while open for write, closing");
        }
        if self.is_open() {
            if let Err(e) = self.close() {
                tracing::warn!(kind = %self.kind, path = %self.path, error = %e, "failed to close store on drop");
            }
        }
    }
}
