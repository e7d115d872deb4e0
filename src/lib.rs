//! # tensorkv: tabular data to tensor key-value stores
//!
//! tensorkv turns a small labelled CSV dataset into a key-value database
//! of serialized tensor records, and reads it back in fixed-size batches
//! for a training loop.
//!
//! ## Workflow
//!
//! ```text
//! CSV (URL/file) ─> Loader ─> Splitter ─> Record encoder ─> Store writer
//!                                                             │
//!                          training loop <── Batch reader <───┘
//! ```
//!
//! - [`data`]: CSV loading, label mapping, train/test split
//! - [`record`]: one example ⇄ `TensorProtos` bytes (features, then label)
//! - [`kv`]: `(kind, path)` stores opened for write or read
//! - [`store`]: bulk writer and batch reader
//! - [`pipeline`]: configuration and the end-to-end run
//!
//! ## Example Usage
//!
//! ```rust
//! use ndarray::{Array1, Array2};
//! use tensorkv::data::{split, Dataset};
//! use tensorkv::kv::StoreKind;
//! use tensorkv::store::{write_dataset, BatchReader, WrapPolicy};
//!
//! # fn main() -> tensorkv::Result<()> {
//! let dataset = Dataset::new(Array2::zeros((150, 4)), Array1::zeros(150))?;
//! let parts = split(&dataset, 100, Some(7))?;
//! write_dataset(StoreKind::Memory, "crate_doc_train", &parts.train, "train")?;
//!
//! let mut reader = BatchReader::open(StoreKind::Memory, "crate_doc_train", 16, WrapPolicy::Cycle)?;
//! let batch = reader.next_batch()?;
//! assert_eq!(batch.features.dim(), (16, 4));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod data;
pub mod error;
pub mod kv;
pub mod pipeline;
pub mod record;
pub mod store;

pub use error::{Error, Result};
