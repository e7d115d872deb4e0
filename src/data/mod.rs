//! In-memory dataset model
//!
//! A [`Dataset`] is a row-aligned pair of a `rows × N` feature matrix and a
//! length-`rows` label vector. [`Example`] is one row of it.
//!
//! ## Usage
//!
//! ```rust
//! use ndarray::{array, Array1};
//! use tensorkv::data::Dataset;
//!
//! let dataset = Dataset::new(
//!     array![[5.1, 3.5, 1.4, 0.2], [7.0, 3.2, 4.7, 1.4]],
//!     Array1::from(vec![0, 1]),
//! )?;
//! assert_eq!(dataset.len(), 2);
//! assert_eq!(dataset.example(1).unwrap().label, 1);
//! # Ok::<(), tensorkv::Error>(())
//! ```

pub mod loader;
pub mod split;

pub use loader::{
    fetch_text, load_from_path, load_from_url, parse_csv, LabelMap, IRIS_FEATURE_COUNT,
    IRIS_FEATURE_NAMES, IRIS_URL,
};
pub use split::{split, Split};

use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

/// One data point: a feature vector and its class label
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    /// Feature values, constant length within a dataset
    pub features: Vec<f32>,
    /// Dense integer class label
    pub label: i32,
}

impl Example {
    /// Create a new example.
    #[must_use]
    pub fn new(features: Vec<f32>, label: i32) -> Self {
        Self { features, label }
    }
}

/// Row-aligned features and labels
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Array1<i32>,
}

impl Dataset {
    /// Create a dataset from a feature matrix and a label vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the row counts differ.
    pub fn new(features: Array2<f32>, labels: Array1<i32>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        Ok(Self { features, labels })
    }

    /// Build a dataset from examples sharing one feature length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if feature lengths differ.
    pub fn from_examples(examples: &[Example], feature_count: usize) -> Result<Self> {
        let mut flat = Vec::with_capacity(examples.len() * feature_count);
        let mut labels = Vec::with_capacity(examples.len());
        for (i, example) in examples.iter().enumerate() {
            if example.features.len() != feature_count {
                return Err(Error::ShapeMismatch(format!(
                    "example {i} has {} features, expected {feature_count}",
                    example.features.len()
                )));
            }
            flat.extend_from_slice(&example.features);
            labels.push(example.label);
        }
        let features = Array2::from_shape_vec((examples.len(), feature_count), flat)
            .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
        Self::new(features, Array1::from(labels))
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of feature columns.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.features.ncols()
    }

    /// Feature matrix (rows × N).
    #[must_use]
    pub const fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// Label vector.
    #[must_use]
    pub const fn labels(&self) -> &Array1<i32> {
        &self.labels
    }

    /// Row `index` as an owned example, if in range.
    #[must_use]
    pub fn example(&self, index: usize) -> Option<Example> {
        (index < self.len()).then(|| {
            Example::new(
                self.features.row(index).to_vec(),
                self.labels[index],
            )
        })
    }

    /// Iterate rows in order.
    pub fn examples(&self) -> impl Iterator<Item = Example> + '_ {
        self.features
            .outer_iter()
            .zip(self.labels.iter())
            .map(|(row, &label)| Example::new(row.to_vec(), label))
    }

    /// New dataset made of the given rows, in the given order.
    ///
    /// # Panics
    ///
    /// Panics if an index is out of bounds.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }
}
