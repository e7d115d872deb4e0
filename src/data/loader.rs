//! CSV dataset loader
//!
//! Reads `f1,...,fN,label_name` rows from a URL, a file or any reader and
//! maps label names to dense integer ids through a [`LabelMap`].
//! Any bad row aborts the whole load; nothing is cached.

use super::Dataset;
use crate::{Error, Result};
use csv::{ReaderBuilder, Trim};
use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// UCI Iris data file
pub const IRIS_URL: &str = "https://archive.ics.uci.edu/ml/machine-learning-databases/iris/iris.data";

/// Number of numeric feature columns in Iris
pub const IRIS_FEATURE_COUNT: usize = 4;

/// Iris feature column names, in file order
pub const IRIS_FEATURE_NAMES: [&str; IRIS_FEATURE_COUNT] =
    ["sepal_length", "sepal_width", "petal_length", "petal_width"];

/// Ordered label name → dense id lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    entries: Vec<(String, i32)>,
}

impl LabelMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Map each name to its position (`names[i] -> i`).
    #[must_use]
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        (0..)
            .zip(names)
            .fold(Self::new(), |map, (id, name)| map.with(name.as_ref(), id))
    }

    /// The Iris species table: setosa 0, versicolor 1, virginica 2.
    ///
    /// Both the `Iris-` prefixed names used by the UCI file and the bare
    /// species names are accepted.
    #[must_use]
    pub fn iris() -> Self {
        Self::new()
            .with("Iris-setosa", 0)
            .with("Iris-versicolor", 1)
            .with("Iris-virginica", 2)
            .with("setosa", 0)
            .with("versicolor", 1)
            .with("virginica", 2)
    }

    /// Add (or replace) an entry.
    #[must_use]
    pub fn with(mut self, name: &str, id: i32) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = id;
        } else {
            self.entries.push((name.to_string(), id));
        }
        self
    }

    /// Look up the id of a label name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<i32> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    /// First name registered for an id.
    #[must_use]
    pub fn name_of(&self, id: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, i)| *i == id)
            .map(|(n, _)| n.as_str())
    }

    /// Number of entries (aliases included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::iris()
    }
}

/// Fetch a text resource over HTTP(S).
///
/// Blocks the calling thread until the body is read. No retry.
///
/// # Errors
///
/// Returns [`Error::Fetch`] on transport failure or a non-success status.
pub fn fetch_text(url: &str) -> Result<String> {
    let fetch_err = |reason: String| Error::Fetch {
        url: url.to_string(),
        reason,
    };

    let response = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|e| fetch_err(e.to_string()))?;
    let body = response.text().map_err(|e| fetch_err(e.to_string()))?;

    tracing::debug!(url, bytes = body.len(), "fetched dataset source");
    Ok(body)
}

/// Parse CSV rows of `feature_count` numbers followed by one label name.
///
/// Blank and whitespace-only lines are skipped and fields are trimmed.
///
/// # Errors
///
/// - [`Error::ColumnCount`] if a row does not have `feature_count + 1` fields
/// - [`Error::InvalidValue`] if a feature is not a number
/// - [`Error::UnknownLabel`] if the label is not in `labels`
pub fn parse_csv<R: Read>(reader: R, labels: &LabelMap, feature_count: usize) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let expected = feature_count + 1;
    let mut features = Vec::new();
    let mut ids = Vec::new();

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }

        if record.len() != expected {
            return Err(Error::ColumnCount {
                line,
                expected,
                found: record.len(),
            });
        }

        for (column, field) in record.iter().take(feature_count).enumerate() {
            let value = field.parse::<f32>().map_err(|_| Error::InvalidValue {
                line,
                column,
                value: field.to_string(),
            })?;
            features.push(value);
        }

        let name = &record[feature_count];
        let id = labels.id_of(name).ok_or_else(|| Error::UnknownLabel {
            line,
            label: name.to_string(),
        })?;
        ids.push(id);
    }

    let rows = ids.len();
    let features = Array2::from_shape_vec((rows, feature_count), features)
        .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
    Dataset::new(features, Array1::from(ids))
}

/// Fetch and parse a remote CSV dataset.
///
/// # Errors
///
/// Returns [`Error::Fetch`] on network failure, or any [`parse_csv`] error.
pub fn load_from_url(url: &str, labels: &LabelMap, feature_count: usize) -> Result<Dataset> {
    let body = fetch_text(url)?;
    let dataset = parse_csv(body.as_bytes(), labels, feature_count)?;
    tracing::info!(url, rows = dataset.len(), "loaded dataset");
    Ok(dataset)
}

/// Read and parse a local CSV dataset.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened, or any [`parse_csv`] error.
pub fn load_from_path<P: AsRef<Path>>(
    path: P,
    labels: &LabelMap,
    feature_count: usize,
) -> Result<Dataset> {
    let file = File::open(path.as_ref())?;
    let dataset = parse_csv(file, labels, feature_count)?;
    tracing::info!(path = %path.as_ref().display(), rows = dataset.len(), "loaded dataset");
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "5.1,3.5,1.4,0.2,Iris-setosa\n\
                          7.0,3.2,4.7,1.4,Iris-versicolor\n\
                          6.3,3.3,6.0,2.5,Iris-virginica\n\
                          \n\
                          \n";

    #[test]
    fn test_parse_iris_rows() {
        let dataset = parse_csv(SAMPLE.as_bytes(), &LabelMap::iris(), IRIS_FEATURE_COUNT).unwrap();

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.feature_count(), 4);
        assert_eq!(dataset.labels().to_vec(), vec![0, 1, 2]);
        assert_eq!(dataset.example(1).unwrap().features, vec![7.0, 3.2, 4.7, 1.4]);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let data = " 5.1 , 3.5,1.4,0.2 , setosa \n";
        let dataset = parse_csv(data.as_bytes(), &LabelMap::iris(), 4).unwrap();
        assert_eq!(dataset.labels().to_vec(), vec![0]);
    }

    #[test]
    fn test_whitespace_only_lines_skipped() {
        let data = "5.1,3.5,1.4,0.2,Iris-setosa\n   \n\t\n7.0,3.2,4.7,1.4,Iris-versicolor\n";
        let dataset = parse_csv(data.as_bytes(), &LabelMap::iris(), 4).unwrap();
        assert_eq!(dataset.labels().to_vec(), vec![0, 1]);
    }

    #[test]
    fn test_unknown_label_fails_load() {
        let data = "5.1,3.5,1.4,0.2,Iris-setosa\n5.0,3.0,1.0,0.1,Iris-unknown\n";
        let err = parse_csv(data.as_bytes(), &LabelMap::iris(), 4).unwrap_err();

        match err {
            Error::UnknownLabel { line, label } => {
                assert_eq!(line, 2);
                assert_eq!(label, "Iris-unknown");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_column_count_fails_load() {
        let data = "5.1,3.5,1.4,Iris-setosa\n";
        let err = parse_csv(data.as_bytes(), &LabelMap::iris(), 4).unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnCount {
                expected: 5,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_non_numeric_feature_fails_load() {
        let data = "5.1,abc,1.4,0.2,Iris-setosa\n";
        let err = parse_csv(data.as_bytes(), &LabelMap::iris(), 4).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { column: 1, .. }));
    }

    #[test]
    fn test_empty_input_gives_empty_dataset() {
        let dataset = parse_csv("".as_bytes(), &LabelMap::iris(), 4).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(dataset.feature_count(), 4);
    }

    #[test]
    fn test_label_map_lookup() {
        let labels = LabelMap::iris();
        assert_eq!(labels.id_of("Iris-virginica"), Some(2));
        assert_eq!(labels.id_of("virginica"), Some(2));
        assert_eq!(labels.id_of("rose"), None);
        assert_eq!(labels.name_of(1), Some("Iris-versicolor"));
        assert_eq!(labels.name_of(7), None);
    }

    #[test]
    fn test_label_map_from_names() {
        let labels = LabelMap::from_names(&["cat", "dog"]);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.id_of("dog"), Some(1));
    }

    #[test]
    fn test_label_map_with_replaces() {
        let labels = LabelMap::new().with("a", 0).with("a", 5);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.id_of("a"), Some(5));
    }

    #[test]
    fn test_fetch_unreachable_host_fails() {
        let err = fetch_text("http://127.0.0.1:1/iris.data").unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let err = load_from_path("/nonexistent/iris.data", &LabelMap::iris(), 4).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
