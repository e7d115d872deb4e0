//! Fixed-size batch reader over a written store

use crate::data::Example;
use crate::kv::{DbHandle, Mode, StoreKind};
use crate::record::decode_example;
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float32Array, Int32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What happens when a read reaches the end of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapPolicy {
    /// Treat the store as a circular stream; every batch is full
    #[default]
    Cycle,
    /// One pass: the last batch may be partial, then [`Error::EndOfStore`]
    Stop,
}

/// Decoded records, in store order
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Keys of the records
    pub keys: Vec<String>,
    /// B × N features
    pub features: Array2<f32>,
    /// B labels
    pub labels: Array1<i32>,
}

impl Batch {
    /// Assemble a batch from decoded records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptRecord`] if feature lengths differ.
    pub fn from_records(records: Vec<(String, Example)>) -> Result<Self> {
        let feature_count = records.first().map_or(0, |(_, e)| e.features.len());
        let mut keys = Vec::with_capacity(records.len());
        let mut features = Vec::with_capacity(records.len() * feature_count);
        let mut labels = Vec::with_capacity(records.len());

        for (key, example) in records {
            if example.features.len() != feature_count {
                return Err(Error::CorruptRecord(format!(
                    "record {key} has {} features, batch has {feature_count}",
                    example.features.len()
                )));
            }
            features.extend_from_slice(&example.features);
            labels.push(example.label);
            keys.push(key);
        }

        let features = Array2::from_shape_vec((keys.len(), feature_count), features)
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
        Ok(Self {
            keys,
            features,
            labels: Array1::from(labels),
        })
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the batch has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Record `index` as an example.
    #[must_use]
    pub fn example(&self, index: usize) -> Option<Example> {
        (index < self.len())
            .then(|| Example::new(self.features.row(index).to_vec(), self.labels[index]))
    }

    /// Columnar view: `f0..f{N-1}` as Float32, then `label` as Int32.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Arrow`] if the batch cannot be assembled.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(self.features.ncols() + 1);
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.features.ncols() + 1);

        for (j, column) in self.features.columns().into_iter().enumerate() {
            fields.push(Field::new(format!("f{j}"), DataType::Float32, false));
            columns.push(Arc::new(Float32Array::from(column.to_vec())));
        }
        fields.push(Field::new("label", DataType::Int32, false));
        columns.push(Arc::new(Int32Array::from(self.labels.to_vec())));

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}

/// Reads successive fixed-size batches from a store.
///
/// # Example
///
/// ```rust
/// use ndarray::{Array1, Array2};
/// use tensorkv::data::Dataset;
/// use tensorkv::kv::StoreKind;
/// use tensorkv::store::{write_dataset, BatchReader, WrapPolicy};
///
/// # fn example() -> tensorkv::Result<()> {
/// let dataset = Dataset::new(Array2::zeros((10, 4)), Array1::zeros(10))?;
/// write_dataset(StoreKind::Memory, "reader_doc", &dataset, "train")?;
///
/// let mut reader = BatchReader::open(StoreKind::Memory, "reader_doc", 4, WrapPolicy::Stop)?;
/// let sizes: Vec<usize> = reader.by_ref().map(|b| b.map(|b| b.len())).collect::<Result<_, _>>()?;
/// assert_eq!(sizes, vec![4, 4, 2]);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Debug)]
pub struct BatchReader {
    db: DbHandle,
    batch_size: usize,
    policy: WrapPolicy,
    batches_read: usize,
    exhausted: bool,
}

impl BatchReader {
    /// Open `(kind, path)` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBatchSize`] for a zero batch size, or the
    /// store's open error.
    pub fn open(kind: StoreKind, path: &str, batch_size: usize, policy: WrapPolicy) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidBatchSize(batch_size));
        }
        let db = DbHandle::create(kind, path, Mode::Read)?;
        tracing::info!(%kind, path, batch_size, ?policy, "opened batch reader");
        Ok(Self {
            db,
            batch_size,
            policy,
            batches_read: 0,
            exhausted: false,
        })
    }

    /// Records per batch.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// End-of-store behaviour.
    #[must_use]
    pub const fn policy(&self) -> WrapPolicy {
        self.policy
    }

    /// Batches returned so far.
    #[must_use]
    pub const fn batches_read(&self) -> usize {
        self.batches_read
    }

    /// Read and decode the next batch.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyStore`] under [`WrapPolicy::Cycle`] on an empty store
    /// - [`Error::EndOfStore`] under [`WrapPolicy::Stop`] once every record was read
    /// - [`Error::CorruptRecord`] if a record fails to decode
    pub fn next_batch(&mut self) -> Result<Batch> {
        let entries = match self.policy {
            WrapPolicy::Cycle => self.db.read_batch(self.batch_size)?,
            WrapPolicy::Stop => {
                let mut entries = Vec::with_capacity(self.batch_size);
                while entries.len() < self.batch_size {
                    match self.db.read_next()? {
                        Some(entry) => entries.push(entry),
                        None => break,
                    }
                }
                if entries.is_empty() {
                    self.exhausted = true;
                    return Err(Error::EndOfStore);
                }
                entries
            }
        };

        let records = entries
            .into_iter()
            .map(|(key, value)| {
                let example = decode_example(&value).map_err(|e| match e {
                    Error::CorruptRecord(reason) => Error::CorruptRecord(format!("{key}: {reason}")),
                    other => other,
                })?;
                Ok((key, example))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = Batch::from_records(records)?;
        self.batches_read += 1;
        tracing::debug!(batch = self.batches_read, records = batch.len(), "read batch");
        Ok(batch)
    }

    /// Start over from the first record.
    ///
    /// # Errors
    ///
    /// Returns the store's seek error.
    pub fn reset(&mut self) -> Result<()> {
        self.db.rewind()?;
        self.exhausted = false;
        Ok(())
    }

    /// Release the store.
    ///
    /// # Errors
    ///
    /// Returns the store's close error.
    pub fn close(mut self) -> Result<()> {
        self.db.close()
    }
}

impl Iterator for BatchReader {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.next_batch() {
            Err(Error::EndOfStore) => None,
            Err(Error::EmptyStore) => {
                self.exhausted = true;
                Some(Err(Error::EmptyStore))
            }
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use crate::store::write_dataset;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn write_indexed(name: &str, rows: usize) -> Dataset {
        let features = Array2::from_shape_fn((rows, 4), |(r, c)| (r * 4 + c) as f32);
        let labels = Array1::from_shape_fn(rows, |r| (r % 3) as i32);
        let dataset = Dataset::new(features, labels).unwrap();
        write_dataset(StoreKind::Memory, name, &dataset, "train").unwrap();
        dataset
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        write_indexed("reader_zero", 1);
        let err = BatchReader::open(StoreKind::Memory, "reader_zero", 0, WrapPolicy::Cycle)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBatchSize(0)));
    }

    #[test]
    fn test_cycle_batches_of_sixteen_over_hundred() {
        let dataset = write_indexed("reader_cycle", 100);
        let mut reader =
            BatchReader::open(StoreKind::Memory, "reader_cycle", 16, WrapPolicy::Cycle).unwrap();

        for i in 0..6 {
            let batch = reader.next_batch().unwrap();
            assert_eq!(batch.len(), 16);
            assert_eq!(batch.keys[0], format!("train_{:03}", i * 16));
        }

        let seventh = reader.next_batch().unwrap();
        assert_eq!(seventh.len(), 16);
        assert_eq!(seventh.keys[0], "train_096");
        assert_eq!(seventh.keys[3], "train_099");
        assert_eq!(seventh.keys[4], "train_000");
        assert_eq!(seventh.example(4), dataset.example(0));
        assert_eq!(reader.batches_read(), 7);
    }

    #[test]
    fn test_stop_partial_then_end() {
        write_indexed("reader_stop", 100);
        let mut reader =
            BatchReader::open(StoreKind::Memory, "reader_stop", 16, WrapPolicy::Stop).unwrap();

        for _ in 0..6 {
            assert_eq!(reader.next_batch().unwrap().len(), 16);
        }
        let last = reader.next_batch().unwrap();
        assert_eq!(last.len(), 4);
        assert_eq!(last.keys, vec!["train_096", "train_097", "train_098", "train_099"]);
        assert!(matches!(reader.next_batch(), Err(Error::EndOfStore)));

        reader.reset().unwrap();
        assert_eq!(reader.next_batch().unwrap().keys[0], "train_000");
    }

    #[test]
    fn test_iterator_stops_after_one_pass() {
        write_indexed("reader_iter", 10);
        let reader =
            BatchReader::open(StoreKind::Memory, "reader_iter", 3, WrapPolicy::Stop).unwrap();
        let total: usize = reader.map(|b| b.unwrap().len()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_cycle_on_empty_store() {
        write_indexed("reader_empty", 0);
        let mut reader =
            BatchReader::open(StoreKind::Memory, "reader_empty", 2, WrapPolicy::Cycle).unwrap();
        assert!(matches!(reader.next_batch(), Err(Error::EmptyStore)));
    }

    #[test]
    fn test_iterator_reports_empty_store_once() {
        write_indexed("reader_empty_iter", 0);
        let reader =
            BatchReader::open(StoreKind::Memory, "reader_empty_iter", 2, WrapPolicy::Cycle).unwrap();
        let results: Vec<_> = reader.take(5).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::EmptyStore)));
    }

    #[test]
    fn test_corrupt_record_fails_batch() {
        let mut db = DbHandle::create(StoreKind::Memory, "reader_corrupt", Mode::Write).unwrap();
        db.put("train_000", &[0x0a, 0x05, 0x01]).unwrap();
        db.close().unwrap();

        let mut reader =
            BatchReader::open(StoreKind::Memory, "reader_corrupt", 1, WrapPolicy::Cycle).unwrap();
        assert!(matches!(reader.next_batch(), Err(Error::CorruptRecord(_))));
    }

    #[test]
    fn test_batch_from_records_rejects_ragged() {
        let records = vec![
            ("a".to_string(), Example::new(vec![1.0, 2.0], 0)),
            ("b".to_string(), Example::new(vec![1.0], 1)),
        ];
        assert!(matches!(
            Batch::from_records(records),
            Err(Error::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_to_record_batch() {
        let records = vec![
            ("a".to_string(), Example::new(vec![1.0, 2.0], 0)),
            ("b".to_string(), Example::new(vec![3.0, 4.0], 2)),
        ];
        let rb = Batch::from_records(records).unwrap().to_record_batch().unwrap();

        assert_eq!(rb.num_rows(), 2);
        assert_eq!(rb.num_columns(), 3);
        assert_eq!(rb.schema().field(1).name(), "f1");
        let labels = rb.column(2).as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(labels.value(1), 2);
        let f1 = rb.column(1).as_any().downcast_ref::<Float32Array>().unwrap();
        assert!((f1.value(0) - 2.0).abs() < f32::EPSILON);
    }
}
