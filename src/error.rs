//! Error types for tensorkv
//!
//! Every failure is fatal to the current top-level operation: there is no
//! retry and no partial result. Messages say what to check next.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// tensorkv error types
#[derive(Error, Debug)]
pub enum Error {
    /// Remote dataset could not be fetched
    #[error("Fetch failed for {url}: {reason}")]
    Fetch {
        /// Requested location
        url: String,
        /// Transport error or HTTP status
        reason: String,
    },

    /// CSV row has the wrong number of columns
    #[error("Line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        /// 1-based line number in the source
        line: u64,
        /// Feature columns + label column
        expected: usize,
        /// Columns actually present
        found: usize,
    },

    /// CSV field is not a number
    #[error("Line {line}, column {column}: '{value}' is not a number")]
    InvalidValue {
        /// 1-based line number in the source
        line: u64,
        /// 0-based column index
        column: usize,
        /// Offending field text
        value: String,
    },

    /// Label missing from the lookup table
    #[error("Line {line}: unknown label '{label}'\nAdd it to the LabelMap or fix the source data")]
    UnknownLabel {
        /// 1-based line number in the source
        line: u64,
        /// Offending label text
        label: String,
    },

    /// Features and labels disagree in shape
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Train size larger than the dataset
    #[error("Invalid split: train_count {train_count} exceeds dataset size {total}")]
    InvalidSplit {
        /// Requested training rows
        train_count: usize,
        /// Rows available
        total: usize,
    },

    /// Batch size of zero
    #[error("Invalid batch size: {0} (must be at least 1)")]
    InvalidBatchSize(usize),

    /// Store kind string not recognised
    #[error("Unknown store kind '{0}'\nSupported kinds: memory, minidb")]
    UnknownStoreKind(String),

    /// Store does not exist (read of a never-written store)
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// Store is held by another handle
    #[error("Store busy: {0} is open in another handle. Close it first")]
    StoreBusy(String),

    /// Operation not allowed in the handle's mode
    #[error("Invalid mode: {operation} requires a store opened for {required}")]
    InvalidMode {
        /// Attempted operation
        operation: &'static str,
        /// Mode the operation needs
        required: &'static str,
    },

    /// Handle used after close
    #[error("Store handle already closed")]
    Closed,

    /// Cyclic read over a store with no records
    #[error("Store is empty: nothing to read")]
    EmptyStore,

    /// Finite read past the last record
    #[error("End of store reached\nCall reset() to start a new pass")]
    EndOfStore,

    /// Record bytes do not decode to an example
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Store file layout is damaged
    #[error("Corrupt store: {0}")]
    CorruptStore(String),

    /// Pipeline configuration is invalid
    #[error("Config error: {0}")]
    Config(String),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl From<prost::DecodeError> for Error {
    fn from(err: prost::DecodeError) -> Self {
        Self::CorruptRecord(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
