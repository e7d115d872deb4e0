//! Bulk dataset writer

use crate::data::Dataset;
use crate::kv::{DbHandle, Mode, StoreKind};
use crate::record::encode_example;
use crate::Result;

/// Outcome of a [`write_dataset`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Backend kind written to
    pub kind: StoreKind,
    /// Store path or name
    pub path: String,
    /// Records written
    pub records: usize,
    /// Total encoded value bytes
    pub bytes: usize,
}

/// Key of the `index`-th record: `"{prefix}_{index:03}"`.
#[must_use]
pub fn key_for(prefix: &str, index: usize) -> String {
    format!("{prefix}_{index:03}")
}

/// Write every example of `dataset` into a fresh store at `(kind, path)`.
///
/// Records are put in dataset order under [`key_for`] keys, and the store
/// is closed before this returns. If the store cannot be created nothing
/// is written. A failure part way through leaves a partial store; the
/// write is not resumable.
///
/// # Errors
///
/// Returns the store's open, put or close error.
pub fn write_dataset(
    kind: StoreKind,
    path: &str,
    dataset: &Dataset,
    key_prefix: &str,
) -> Result<WriteSummary> {
    let mut db = DbHandle::create(kind, path, Mode::Write)?;

    let mut bytes = 0;
    for (index, example) in dataset.examples().enumerate() {
        let value = encode_example(&example);
        bytes += value.len();
        db.put(&key_for(key_prefix, index), &value)?;
    }
    db.close()?;

    tracing::info!(%kind, path, records = dataset.len(), bytes, "wrote store");
    Ok(WriteSummary {
        kind,
        path: path.to_string(),
        records: dataset.len(),
        bytes,
    })
}
