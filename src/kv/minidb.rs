//! Single-file append-only store.
//!
//! The layout is specific to this crate and is not the Caffe2 `MiniDB`
//! container; only the record values follow the Caffe2 `TensorProtos`
//! message. File layout:
//!
//! ```text
//! "TKVMINI1"                                  8-byte header
//! u32 LE key_len | key | u32 LE value_len | value   repeated per entry
//! ```
//!
//! Entries are read back strictly in write order. The writer creates or
//! truncates the file; it never appends to an existing one.

use super::{Entry, KvCursor, KvWriter};
use crate::{Error, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// File header identifying a minidb store
pub const MINIDB_MAGIC: &[u8; 8] = b"TKVMINI1";

#[allow(clippy::cast_possible_truncation)]
const HEADER_LEN: u64 = MINIDB_MAGIC.len() as u64;

/// Writer for a minidb file
pub struct MiniDbWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    entries: usize,
}

impl MiniDbWriter {
    /// Create (or truncate) the file at `path` and write the header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be created, e.g. when the
    /// parent directory does not exist or is not writable.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MINIDB_MAGIC)?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            writer: Some(writer),
            entries: 0,
        })
    }

    /// Entries written so far.
    #[must_use]
    pub const fn entries(&self) -> usize {
        self.entries
    }
}

fn write_chunk(writer: &mut impl Write, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len()).map_err(|_| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("entry field of {} bytes exceeds u32 length prefix", bytes.len()),
        )
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(bytes)?;
    Ok(())
}

impl KvWriter for MiniDbWriter {
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::Closed)?;
        write_chunk(writer, key.as_bytes())?;
        write_chunk(writer, value)?;
        self.entries += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
            tracing::debug!(path = %self.path.display(), entries = self.entries, "minidb flushed");
        }
        Ok(())
    }
}

/// Sequential reader over a minidb file
pub struct MiniDbCursor {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    file_len: u64,
}

impl MiniDbCursor {
    /// Open `path` and validate its header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreNotFound`] if the file does not exist,
    /// [`Error::CorruptStore`] if the header is missing or wrong, or
    /// [`Error::Io`] for other I/O failures.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::StoreNotFound(path.display().to_string()),
            _ => Error::Io(e),
        })?;
        let file_len = file.metadata()?.len();

        let mut reader = BufReader::new(file);
        let mut magic = [0u8; 8];
        match reader.read_exact(&mut magic) {
            Ok(()) if &magic == MINIDB_MAGIC => {}
            Ok(()) => {
                return Err(Error::CorruptStore(format!(
                    "{}: not a minidb file",
                    path.display()
                )))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(Error::CorruptStore(format!(
                    "{}: missing header",
                    path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            path,
            reader,
            offset: HEADER_LEN,
            file_len,
        })
    }

    fn corrupt(&self, what: &str) -> Error {
        Error::CorruptStore(format!(
            "{}: {what} at byte {}",
            self.path.display(),
            self.offset
        ))
    }

    /// Read a length prefix; `None` only on a clean end of file.
    fn read_len(&mut self, allow_eof: bool) -> Result<Option<u64>> {
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 && allow_eof {
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(self.corrupt("truncated length prefix"));
        }
        self.offset += 4;
        Ok(Some(u64::from(u32::from_le_bytes(buf))))
    }

    fn read_chunk(&mut self, len: u64) -> Result<Vec<u8>> {
        if len > self.file_len.saturating_sub(self.offset) {
            return Err(self.corrupt("entry runs past end of file"));
        }
        let len = usize::try_from(len).map_err(|_| self.corrupt("entry too large"))?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => self.corrupt("truncated entry"),
            _ => Error::Io(e),
        })?;
        self.offset += len as u64;
        Ok(buf)
    }
}

impl KvCursor for MiniDbCursor {
    fn next_entry(&mut self) -> Result<Option<Entry>> {
        let Some(key_len) = self.read_len(true)? else {
            return Ok(None);
        };
        let key = self.read_chunk(key_len)?;
        let key = String::from_utf8(key).map_err(|_| self.corrupt("key is not UTF-8"))?;

        let value_len = self
            .read_len(false)?
            .ok_or_else(|| self.corrupt("missing value"))?;
        let value = self.read_chunk(value_len)?;
        Ok(Some((key, value)))
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(HEADER_LEN))?;
        self.offset = HEADER_LEN;
        Ok(())
    }
}
