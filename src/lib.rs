//! Stateless analysis engine for gene-expression style tables
//!
//! Each operation takes a [`DatasetSource`], loads a fresh [`Table`], picks
//! the numeric feature columns and returns a serializable result:
//!
//! * [`basic_stats`]: per-column descriptive statistics
//! * [`correlation`]: Pearson or Spearman correlation matrix
//! * [`differential`]: two-condition comparison (real or simulated)
//! * [`clustering`]: K-means with a 2D PCA projection

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args, clippy::module_name_repetitions)]

pub mod csv_reader;
pub mod error;
pub mod ml;
pub mod structs;

pub use error::{AnalysisError, Result};
pub use ml::clustering::{ClusteringMethod, ClusteringParams};
pub use ml::correlation::CorrelationMethod;
pub use ml::differential::DifferentialParams;
pub use ml::pipeline::{
    basic_stats, clustering, clustering_with_params, correlation, differential,
    differential_with_rng,
};
pub use structs::{
    ClusteringResult, CorrelationMatrix, DatasetSource, DifferentialMode, DifferentialResult,
    InlineSource, PathSource, StatsReport, Table,
};
