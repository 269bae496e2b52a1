use crate::ml::features::{FeatureMatrix, ScaledFeatures, StandardScaler};
use crate::ml::reduction::project_2d;
use crate::structs::{AnalysisError, ClusterStatistics, ClusteringResult, Result, Table};
use indexmap::IndexMap;
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use log::debug;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use std::fmt;
use std::str::FromStr;

/// Supported partition clustering algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusteringMethod {
    #[default]
    KMeans,
}

impl FromStr for ClusteringMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kmeans" => Ok(Self::KMeans),
            other => Err(AnalysisError::UnsupportedMethod(format!(
                "{other}. Use 'kmeans'"
            ))),
        }
    }
}

impl fmt::Display for ClusteringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KMeans => write!(f, "kmeans"),
        }
    }
}

/// Clustering configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusteringParams {
    pub n_clusters: usize,
    pub method: ClusteringMethod,
    /// Seed for centroid initialization; identical input and seed give
    /// identical labels
    pub seed: u64,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            method: ClusteringMethod::KMeans,
            seed: 42,
        }
    }
}

/// Result of K-means clustering in scaled space
#[derive(Debug, Clone)]
pub struct ClusterResult {
    /// Cluster assignment for each sample
    pub labels: Vec<usize>,
    /// Number of clusters
    pub k: usize,
    /// Cluster sizes
    pub sizes: Vec<usize>,
    /// Member mean of each cluster under the final labels, in the space the
    /// model was fitted in
    pub centroids: Vec<Vec<f64>>,
}

/// Perform K-means clustering on standardized features
///
/// # Errors
/// Returns error if k is out of range or clustering fails
pub fn kmeans(features: &ScaledFeatures, k: usize, seed: u64) -> Result<ClusterResult> {
    let n_samples = features.n_samples();

    if k == 0 {
        return Err(AnalysisError::InvalidParameter(
            "n_clusters must be at least 1".into(),
        ));
    }

    if n_samples < k {
        return Err(AnalysisError::InvalidParameter(format!(
            "Cannot create {k} clusters with only {n_samples} samples"
        )));
    }

    let array = Array2::from_shape_vec((n_samples, features.n_features()), features.to_flat())
        .map_err(|e| AnalysisError::Ml(format!("Failed to create array: {e}")))?;

    let dataset = DatasetBase::from(array.clone());

    let model = KMeans::params_with_rng(k, Xoshiro256Plus::seed_from_u64(seed))
        .n_runs(10)
        .max_n_iterations(300)
        .tolerance(1e-4)
        .fit(&dataset)
        .map_err(|e| AnalysisError::Ml(format!("K-means failed: {e}")))?;

    let predictions: Array1<usize> = model.predict(&array);
    let labels: Vec<usize> = predictions.iter().copied().collect();

    let mut sizes: Vec<usize> = vec![0usize; k];
    for &cluster_id in &labels {
        sizes[cluster_id] += 1;
    }

    let centroids = member_means(&features.data, &labels, &sizes)
        .into_iter()
        .zip(model.centroids().rows())
        .zip(&sizes)
        // An empty cluster keeps the model's centroid
        .map(|((mean, fitted), &size)| if size > 0 { mean } else { fitted.to_vec() })
        .collect();

    Ok(ClusterResult {
        labels,
        k,
        sizes,
        centroids,
    })
}

/// Standardize, cluster and project the named feature columns
///
/// Missing values are imputed to 0 so every row receives a label.
///
/// # Errors
/// Returns error if fewer than 2 features or rows are available, or if
/// K-means or PCA fail
pub fn cluster_table(
    table: &Table,
    names: &[String],
    params: &ClusteringParams,
) -> Result<ClusteringResult> {
    if names.len() < 2 {
        return Err(AnalysisError::InsufficientColumns(names.len()));
    }
    if table.row_count() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "clustering needs at least 2 rows, got {}",
            table.row_count()
        )));
    }

    let features = FeatureMatrix::zero_filled(table, names)?;
    // Fitted on this table only
    let scaler = StandardScaler::fit(&features);
    let scaled = scaler.transform(&features);

    let clusters = match params.method {
        ClusteringMethod::KMeans => kmeans(&scaled, params.n_clusters, params.seed)?,
    };
    debug!("K-means cluster sizes: {:?}", clusters.sizes);

    let cluster_centers = clusters
        .centroids
        .iter()
        .map(|c| scaler.inverse_transform(c))
        .collect();

    let pca = project_2d(&scaled)?;

    Ok(ClusteringResult {
        method: params.method.to_string(),
        n_clusters: clusters.k,
        cluster_statistics: cluster_statistics(&features, &clusters),
        cluster_labels: clusters.labels,
        cluster_centers,
        pca_data: pca.projection,
        pca_variance_ratio: pca.explained_variance_ratio,
        features: names.to_vec(),
    })
}

/// Per-cluster mean of `rows` under `labels`; empty clusters get zeros
#[allow(clippy::cast_precision_loss)]
fn member_means(rows: &[Vec<f64>], labels: &[usize], sizes: &[usize]) -> Vec<Vec<f64>> {
    let width = rows.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; width]; sizes.len()];
    for (row, &cluster_id) in rows.iter().zip(labels) {
        for (sum, v) in sums[cluster_id].iter_mut().zip(row) {
            *sum += v;
        }
    }

    for (sums, &size) in sums.iter_mut().zip(sizes) {
        if size > 0 {
            sums.iter_mut().for_each(|s| *s /= size as f64);
        }
    }
    sums
}

/// Member count and per-feature mean for every cluster, in original units
fn cluster_statistics(
    features: &FeatureMatrix,
    clusters: &ClusterResult,
) -> IndexMap<String, ClusterStatistics> {
    let means = member_means(&features.data, &clusters.labels, &clusters.sizes);

    means
        .into_iter()
        .zip(&clusters.sizes)
        .enumerate()
        .map(|(cluster_id, (means, &size))| {
            let mean_values = features.names.iter().cloned().zip(means).collect();
            (
                format!("cluster_{cluster_id}"),
                ClusterStatistics { size, mean_values },
            )
        })
        .collect()
}
