//! Random train/test partitioning

use super::Dataset;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Disjoint train/test subsets of one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// First `train_count` permuted rows
    pub train: Dataset,
    /// Remaining permuted rows
    pub test: Dataset,
    /// Source row of each `train` row
    pub train_indices: Vec<usize>,
    /// Source row of each `test` row
    pub test_indices: Vec<usize>,
}

/// Shuffle the rows of `dataset` and cut the permutation at `train_count`.
///
/// With `seed = Some(_)` the split is reproducible; with `None` the
/// generator is seeded from OS entropy and every call differs.
///
/// # Errors
///
/// Returns [`Error::InvalidSplit`] if `train_count > dataset.len()`.
///
/// # Example
///
/// ```rust
/// use ndarray::{Array1, Array2};
/// use tensorkv::data::{split, Dataset};
///
/// let dataset = Dataset::new(Array2::zeros((10, 4)), Array1::zeros(10))?;
/// let parts = split(&dataset, 7, Some(42))?;
/// assert_eq!(parts.train.len(), 7);
/// assert_eq!(parts.test.len(), 3);
/// # Ok::<(), tensorkv::Error>(())
/// ```
pub fn split(dataset: &Dataset, train_count: usize, seed: Option<u64>) -> Result<Split> {
    let total = dataset.len();
    if train_count > total {
        return Err(Error::InvalidSplit { train_count, total });
    }

    let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let mut permutation: Vec<usize> = (0..total).collect();
    permutation.shuffle(&mut rng);

    let test_indices = permutation.split_off(train_count);
    let train_indices = permutation;

    tracing::info!(
        train = train_indices.len(),
        test = test_indices.len(),
        seeded = seed.is_some(),
        "split dataset"
    );

    Ok(Split {
        train: dataset.select(&train_indices),
        test: dataset.select(&test_indices),
        train_indices,
        test_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use std::collections::HashSet;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn indexed(rows: usize) -> Dataset {
        let features = Array2::from_shape_fn((rows, 2), |(r, c)| (r * 10 + c) as f32);
        let labels = Array1::from_shape_fn(rows, |r| r as i32);
        Dataset::new(features, labels).unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let parts = split(&indexed(150), 100, Some(1)).unwrap();
        assert_eq!(parts.train.len(), 100);
        assert_eq!(parts.test.len(), 50);
    }

    #[test]
    fn test_split_is_disjoint_and_complete() {
        let parts = split(&indexed(40), 25, Some(9)).unwrap();
        let train: HashSet<usize> = parts.train_indices.iter().copied().collect();
        let test: HashSet<usize> = parts.test_indices.iter().copied().collect();

        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 40);
    }

    #[test]
    fn test_split_preserves_alignment() {
        let dataset = indexed(30);
        let parts = split(&dataset, 20, Some(3)).unwrap();

        for (row, &source) in parts.train_indices.iter().enumerate() {
            assert_eq!(parts.train.example(row), dataset.example(source));
        }
        for (row, &source) in parts.test_indices.iter().enumerate() {
            assert_eq!(parts.test.example(row), dataset.example(source));
        }
    }

    #[test]
    fn test_same_seed_same_split() {
        let dataset = indexed(50);
        let a = split(&dataset, 30, Some(1234)).unwrap();
        let b = split(&dataset, 30, Some(1234)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_train_count_too_large() {
        let err = split(&indexed(5), 6, None).unwrap_err();
        assert!(matches!(err, Error::InvalidSplit { train_count: 6, total: 5 }));
    }

    #[test]
    fn test_edge_counts() {
        let dataset = indexed(5);
        assert_eq!(split(&dataset, 0, None).unwrap().test.len(), 5);
        assert_eq!(split(&dataset, 5, None).unwrap().train.len(), 5);
    }
}
