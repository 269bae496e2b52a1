//! Consolidated public types for the gexa crate
//!
//! This module contains the table model, dataset sources and all result
//! types returned by the analysis operations.

use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

pub use crate::error::{AnalysisError, Result};

// ============================================================================
// Dataset Sources
// ============================================================================

/// Anything the loader can pull a dataset from
///
/// `name` carries the file-name hint used for format dispatch.
pub trait DatasetSource {
    /// File name (or path) used to pick the delimiter
    fn name(&self) -> &str;

    /// Read the full dataset as text
    ///
    /// # Errors
    /// Returns error if the dataset does not exist or cannot be read
    fn read_text(&self) -> Result<String>;
}

/// Dataset stored on the local file system
#[derive(Debug, Clone)]
pub struct PathSource {
    pub path: PathBuf,
    pub(crate) display: String,
}

/// Dataset delivered inline with its original file name
#[derive(Debug, Clone)]
pub struct InlineSource {
    pub name: String,
    pub content: String,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display = path.display().to_string();
        Self { path, display }
    }
}

impl InlineSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Supported delimited text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Tsv,
    /// `.txt`: delimiter sniffed from the first line
    Txt,
}

// ============================================================================
// Table Types
// ============================================================================

/// Typed contents of a column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// `None` marks a missing entry
    Numeric(Vec<Option<f64>>),
    Categorical,
}

/// A named column; `cells` always holds the raw trimmed text
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub cells: Vec<String>,
    pub data: ColumnData,
}

impl Column {
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    /// Numeric entries, `None` for categorical columns
    #[must_use]
    pub fn values(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values.as_slice()),
            ColumnData::Categorical => None,
        }
    }

    /// Non-missing numeric entries in row order
    #[must_use]
    pub fn present_values(&self) -> Vec<f64> {
        self.values()
            .map(|v| v.iter().filter_map(|x| *x).collect())
            .unwrap_or_default()
    }

    /// Count of missing entries against the full column length
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.values()
            .map_or(0, |v| v.iter().filter(|x| x.is_none()).count())
    }
}

/// An ordered set of uniquely named columns with a uniform row count
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub n_rows: usize,
}

impl Table {
    /// Get number of rows
    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.n_rows
    }

    /// Get number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in table order
    #[must_use]
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get column by name
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of numeric columns in table order
    #[must_use]
    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Descriptive statistics for a numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    #[serde(skip)]
    pub name: String,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub missing: usize,
    pub q25: f64,
    pub q75: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

/// Column name -> statistics, in feature order
pub type StatsReport = IndexMap<String, ColumnStats>;

/// Symmetric correlation matrix, keyed row then column in feature order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CorrelationMatrix(pub IndexMap<String, IndexMap<String, f64>>);

impl CorrelationMatrix {
    /// Column names in feature order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Coefficient between two named columns
    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.0.get(a)?.get(b).copied()
    }
}

/// Which differential code path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferentialMode {
    /// Grouped by a condition-like column
    Real,
    /// Synthetic draws; no grouping column was present
    Simulated,
}

/// Per-feature differential record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneRecord {
    pub gene: String,
    pub log2fc: f64,
    pub pvalue: f64,
    pub significant: bool,
}

/// Result of a two-condition comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialResult {
    pub condition1: String,
    pub condition2: String,
    pub p_value_threshold: f64,
    pub total_genes: usize,
    pub significant_genes: usize,
    pub upregulated: usize,
    pub downregulated: usize,
    pub top_genes: Vec<GeneRecord>,
    pub mode: DifferentialMode,
}

/// Size and per-feature means of one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterStatistics {
    pub size: usize,
    pub mean_values: IndexMap<String, f64>,
}

/// Result of K-means clustering with a 2D projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringResult {
    pub method: String,
    pub n_clusters: usize,
    pub cluster_labels: Vec<usize>,
    /// One centroid per cluster, in original feature units
    pub cluster_centers: Vec<Vec<f64>>,
    pub pca_data: Vec<[f64; 2]>,
    pub pca_variance_ratio: Vec<f64>,
    pub features: Vec<String>,
    pub cluster_statistics: IndexMap<String, ClusterStatistics>,
}
