//! End-to-end dataset preparation
//!
//! Load → split → write train and test stores, driven by a
//! [`PipelineConfig`]. Defaults reproduce the Iris walkthrough: 150 rows,
//! 100 for training, stores read back 16 records at a time.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tensorkv::kv::StoreKind;
//! use tensorkv::pipeline::Pipeline;
//!
//! # fn example() -> tensorkv::Result<()> {
//! let pipeline = Pipeline::builder()
//!     .seed(42)
//!     .store_kind(StoreKind::MiniDb)
//!     .train_path("/tmp/iris_train.minidb")
//!     .test_path("/tmp/iris_test.minidb")
//!     .build()?;
//!
//! let summary = pipeline.prepare()?;
//! println!("{} train / {} test records", summary.train.records, summary.test.records);
//!
//! let mut reader = pipeline.train_reader()?;
//! let batch = reader.next_batch()?;
//! assert_eq!(batch.len(), 16);
//! # Ok(())
//! # }
//! ```

use crate::data::{self, Dataset, LabelMap, IRIS_FEATURE_COUNT, IRIS_URL};
use crate::kv::StoreKind;
use crate::store::{write_dataset, BatchReader, WrapPolicy, WriteSummary};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pipeline settings; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Remote CSV location
    pub source_url: String,
    /// Local CSV file, used instead of `source_url` when set
    pub source_path: Option<PathBuf>,
    /// Label names in id order; `None` uses the Iris table
    pub labels: Option<Vec<String>>,
    /// Numeric columns before the label column
    pub feature_count: usize,
    /// Rows assigned to the training store
    pub train_count: usize,
    /// Split seed; `None` draws one from OS entropy
    pub seed: Option<u64>,
    /// Backend for both stores
    pub store_kind: StoreKind,
    /// Training store path
    pub train_path: String,
    /// Test store path
    pub test_path: String,
    /// Key prefix for training records
    pub train_prefix: String,
    /// Key prefix for test records
    pub test_prefix: String,
    /// Records per batch when reading back
    pub batch_size: usize,
    /// End-of-store behaviour when reading back
    pub wrap: WrapPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: IRIS_URL.to_string(),
            source_path: None,
            labels: None,
            feature_count: IRIS_FEATURE_COUNT,
            train_count: 100,
            seed: None,
            store_kind: StoreKind::MiniDb,
            train_path: "iris_train.minidb".to_string(),
            test_path: "iris_test.minidb".to_string(),
            train_prefix: "train".to_string(),
            test_prefix: "test".to_string(),
            batch_size: 16,
            wrap: WrapPolicy::Cycle,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed JSON or invalid settings.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or the errors of
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check settings that would only fail later in the run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first bad setting.
    pub fn validate(&self) -> Result<()> {
        if self.feature_count == 0 {
            return Err(Error::Config("feature_count must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if self.train_path == self.test_path {
            return Err(Error::Config(format!(
                "train_path and test_path are both '{}'",
                self.train_path
            )));
        }
        if self.labels.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::Config("labels must not be empty".to_string()));
        }
        Ok(())
    }

    /// Label lookup table for this configuration.
    #[must_use]
    pub fn label_map(&self) -> LabelMap {
        self.labels
            .as_ref()
            .map_or_else(LabelMap::iris, |names| LabelMap::from_names(names))
    }
}

/// Result of [`Pipeline::prepare`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    /// Rows loaded
    pub total: usize,
    /// Training store
    pub train: WriteSummary,
    /// Test store
    pub test: WriteSummary,
}

/// Configured dataset preparation run
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    labels: LabelMap,
}

impl Pipeline {
    /// Create a pipeline builder with default settings.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Create a pipeline from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let labels = config.label_map();
        Ok(Self { config, labels })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured source.
    ///
    /// # Errors
    ///
    /// Returns the loader's fetch, I/O or parse error.
    pub fn load(&self) -> Result<Dataset> {
        match &self.config.source_path {
            Some(path) => data::load_from_path(path, &self.labels, self.config.feature_count),
            None => data::load_from_url(
                &self.config.source_url,
                &self.labels,
                self.config.feature_count,
            ),
        }
    }

    /// Load, split and write both stores.
    ///
    /// # Errors
    ///
    /// Returns the first load, split or write error.
    pub fn prepare(&self) -> Result<PrepareSummary> {
        let dataset = self.load()?;
        self.prepare_dataset(&dataset)
    }

    /// Split an already loaded dataset and write both stores.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the dataset's feature count differs
    ///   from the configured one
    /// - [`Error::InvalidSplit`] if the dataset is smaller than `train_count`
    /// - a store write error
    pub fn prepare_dataset(&self, dataset: &Dataset) -> Result<PrepareSummary> {
        let cfg = &self.config;
        if dataset.feature_count() != cfg.feature_count {
            return Err(Error::ShapeMismatch(format!(
                "dataset has {} features, pipeline is configured for {}",
                dataset.feature_count(),
                cfg.feature_count
            )));
        }
        let parts = data::split(dataset, cfg.train_count, cfg.seed)?;

        let train = write_dataset(cfg.store_kind, &cfg.train_path, &parts.train, &cfg.train_prefix)?;
        let test = write_dataset(cfg.store_kind, &cfg.test_path, &parts.test, &cfg.test_prefix)?;

        tracing::info!(
            total = dataset.len(),
            train = train.records,
            test = test.records,
            "prepared stores"
        );
        Ok(PrepareSummary {
            total: dataset.len(),
            train,
            test,
        })
    }

    /// Batch reader over the training store.
    ///
    /// # Errors
    ///
    /// Returns the store's open error.
    pub fn train_reader(&self) -> Result<BatchReader> {
        self.reader(&self.config.train_path)
    }

    /// Batch reader over the test store.
    ///
    /// # Errors
    ///
    /// Returns the store's open error.
    pub fn test_reader(&self) -> Result<BatchReader> {
        self.reader(&self.config.test_path)
    }

    fn reader(&self, path: &str) -> Result<BatchReader> {
        BatchReader::open(
            self.config.store_kind,
            path,
            self.config.batch_size,
            self.config.wrap,
        )
    }
}

/// Builder for [`Pipeline`]
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Start from an existing configuration.
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Set the remote CSV location.
    #[must_use]
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.config.source_url = url.into();
        self
    }

    /// Read a local CSV file instead of fetching.
    #[must_use]
    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_path = Some(path.into());
        self
    }

    /// Set label names in id order.
    #[must_use]
    pub fn labels<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.config.labels = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the number of feature columns.
    #[must_use]
    pub fn feature_count(mut self, count: usize) -> Self {
        self.config.feature_count = count;
        self
    }

    /// Set the number of training rows.
    #[must_use]
    pub fn train_count(mut self, count: usize) -> Self {
        self.config.train_count = count;
        self
    }

    /// Make the split reproducible.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the store backend.
    #[must_use]
    pub fn store_kind(mut self, kind: StoreKind) -> Self {
        self.config.store_kind = kind;
        self
    }

    /// Set the training store path.
    #[must_use]
    pub fn train_path(mut self, path: impl Into<String>) -> Self {
        self.config.train_path = path.into();
        self
    }

    /// Set the test store path.
    #[must_use]
    pub fn test_path(mut self, path: impl Into<String>) -> Self {
        self.config.test_path = path.into();
        self
    }

    /// Set both record key prefixes.
    #[must_use]
    pub fn key_prefixes(mut self, train: impl Into<String>, test: impl Into<String>) -> Self {
        self.config.train_prefix = train.into();
        self.config.test_prefix = test.into();
        self
    }

    /// Set the read-back batch size.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the end-of-store behaviour.
    #[must_use]
    pub fn wrap(mut self, policy: WrapPolicy) -> Self {
        self.config.wrap = policy;
        self
    }

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the settings are invalid.
    pub fn build(self) -> Result<Pipeline> {
        Pipeline::new(self.config)
    }
}
