//! Dataset ⇄ store transfer
//!
//! [`write_dataset`] persists a [`Dataset`](crate::data::Dataset) as one
//! encoded record per example; [`BatchReader`] streams the records back as
//! fixed-size [`Batch`]es for a training loop.
//!
//! A store is written once, closed, then read any number of times. It is
//! never open for writing and reading at the same time.

mod reader;
mod writer;

pub use reader::{Batch, BatchReader, WrapPolicy};
pub use writer::{key_for, write_dataset, WriteSummary};
