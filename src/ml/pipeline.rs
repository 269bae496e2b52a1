//! The four public analysis operations
//!
//! Every call loads its own [`Table`], selects features and runs one
//! computation. Nothing is cached or shared between calls.

use crate::ml::clustering::{cluster_table, ClusteringMethod, ClusteringParams};
use crate::ml::correlation::{correlation_matrix, CorrelationMethod};
use crate::ml::differential::{self, DifferentialParams};
use crate::ml::features::feature_columns;
use crate::ml::stats::describe;
use crate::structs::{
    AnalysisError, ClusteringResult, CorrelationMatrix, DatasetSource, DifferentialResult,
    Result, StatsReport, Table,
};
use log::debug;
use rand::Rng;

fn load_features(source: &dyn DatasetSource) -> Result<(Table, Vec<String>)> {
    let table = Table::load(source)?;
    let features = feature_columns(&table);
    debug!("Feature columns: {features:?}");
    Ok((table, features))
}

/// Descriptive statistics per column
///
/// An empty or absent `columns` list means all feature columns.
///
/// # Errors
/// Returns `NoNumericData` if nothing numeric is selected
pub fn basic_stats(source: &dyn DatasetSource, columns: Option<&[String]>) -> Result<StatsReport> {
    let (table, features) = load_features(source)?;
    let names = match columns {
        Some(columns) if !columns.is_empty() => columns,
        _ => features.as_slice(),
    };
    describe(&table, names)
}

/// Correlation matrix over all feature columns
///
/// # Errors
/// Returns `UnsupportedMethod` for methods other than pearson/spearman and
/// `InsufficientColumns` with fewer than 2 features
pub fn correlation(source: &dyn DatasetSource, method: &str) -> Result<CorrelationMatrix> {
    let method: CorrelationMethod = method.parse()?;
    let (table, features) = load_features(source)?;
    if features.len() < 2 {
        return Err(AnalysisError::InsufficientColumns(features.len()));
    }
    correlation_matrix(&table, &features, method)
}

/// Two-condition differential analysis with a thread-local RNG for the
/// simulated mode
///
/// # Errors
/// See [`differential_with_rng`]
pub fn differential(
    source: &dyn DatasetSource,
    params: &DifferentialParams,
) -> Result<DifferentialResult> {
    differential_with_rng(source, params, &mut rand::thread_rng())
}

/// Two-condition differential analysis
///
/// # Errors
/// Returns `NoGroupData` when a condition matches no rows and
/// `InsufficientData` when simulating with fewer than 2 features
pub fn differential_with_rng<R: Rng + ?Sized>(
    source: &dyn DatasetSource,
    params: &DifferentialParams,
    rng: &mut R,
) -> Result<DifferentialResult> {
    let (table, features) = load_features(source)?;
    differential::differential(&table, &features, params, rng)
}

/// K-means clustering with the default seed
///
/// # Errors
/// See [`clustering_with_params`]
pub fn clustering(
    source: &dyn DatasetSource,
    n_clusters: usize,
    method: &str,
) -> Result<ClusteringResult> {
    let params = ClusteringParams {
        n_clusters,
        method: method.parse::<ClusteringMethod>()?,
        ..ClusteringParams::default()
    };
    clustering_with_params(source, &params)
}

/// Standardize, cluster and project all feature columns
///
/// # Errors
/// Returns `InsufficientColumns` with fewer than 2 features
pub fn clustering_with_params(
    source: &dyn DatasetSource,
    params: &ClusteringParams,
) -> Result<ClusteringResult> {
    let (table, features) = load_features(source)?;
    cluster_table(&table, &features, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::{DifferentialMode, InlineSource, PathSource};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::Builder;

    const EXPRESSION: &str = "sample,A,B,C\n\
        s1,1.0,8.0,3.0\n\
        s2,2.0,6.5,3.5\n\
        s3,,5.0,2.0\n\
        s4,4.0,4.5,\n\
        s5,5.0,2.0,6.0\n\
        s6,6.0,1.0,6.5";

    fn inline(content: &str) -> InlineSource {
        InlineSource::new("expression.csv", content)
    }

    #[test]
    fn test_stats_uses_all_features() {
        let report = basic_stats(&inline(EXPRESSION), None).expect("stats");

        assert_eq!(report.keys().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        for stats in report.values() {
            assert_eq!(stats.count + stats.missing, 6);
        }
        assert_eq!(report.get("A").unwrap().missing, 1);
    }

    #[test]
    fn test_stats_explicit_columns() {
        let columns = vec!["C".to_string()];
        let report = basic_stats(&inline(EXPRESSION), Some(columns.as_slice())).expect("stats");
        assert_eq!(report.keys().collect::<Vec<_>>(), vec!["C"]);

        let all = basic_stats(&inline(EXPRESSION), Some(&[][..])).expect("stats");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_stats_without_numeric_data() {
        let err = basic_stats(&inline("name,label\na,x\nb,y"), None).unwrap_err();
        assert!(matches!(err, AnalysisError::NoNumericData));
    }

    #[test]
    fn test_correlation_symmetric_with_unit_diagonal() {
        for method in ["pearson", "spearman"] {
            let corr = correlation(&inline(EXPRESSION), method).expect("correlation");
            let names: Vec<&str> = corr.names().collect();
            assert_eq!(names, vec!["A", "B", "C"]);
            for &a in &names {
                assert_abs_diff_eq!(corr.get(a, a).unwrap(), 1.0);
                for &b in &names {
                    assert_eq!(corr.get(a, b), corr.get(b, a));
                }
            }
        }
    }

    #[test]
    fn test_correlation_errors() {
        let err = correlation(&inline(EXPRESSION), "kendall").unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedMethod(_)));

        let err = correlation(&inline("name,A\nx,1\ny,2"), "pearson").unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientColumns(1)));
    }

    #[test]
    fn test_unsupported_format_is_typed() {
        let source = InlineSource::new("expression.parquet", EXPRESSION);
        assert!(matches!(
            basic_stats(&source, None),
            Err(AnalysisError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            clustering(&source, 2, "kmeans"),
            Err(AnalysisError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_differential_real_from_file() {
        let content = "id,group,g1,g2\n\
            1,ctrl,1,5\n\
            2,ctrl,2,3\n\
            3,ctrl,3,4\n\
            4,kd,10,4\n\
            5,kd,11,5\n\
            6,kd,12,3";
        let mut file = Builder::new().suffix(".tsv").tempfile().expect("create");
        file.write_all(content.replace(',', "\t").as_bytes()).expect("write");

        let params = DifferentialParams::new("ctrl", "kd");
        let result = differential(&PathSource::new(file.path()), &params).expect("differential");

        assert_eq!(result.mode, DifferentialMode::Real);
        assert_eq!(result.total_genes, 2);
        assert_eq!(result.top_genes[0].gene, "g1");
        assert!(result.top_genes[0].significant);
        assert_eq!(result.upregulated, 1);
    }

    #[test]
    fn test_differential_simulated_never_needs_groups() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = DifferentialParams::new("ctrl", "kd");
        let result =
            differential_with_rng(&inline(EXPRESSION), &params, &mut rng).expect("simulate");

        assert_eq!(result.mode, DifferentialMode::Simulated);
        assert!(result.top_genes.len() <= 20);
        for record in &result.top_genes {
            assert!((0.0..=1.0).contains(&record.pvalue));
            assert_eq!(record.significant, record.pvalue < 0.05);
        }
    }

    #[test]
    fn test_clustering_labels_and_sizes() {
        let k = 2;
        let result = clustering(&inline(EXPRESSION), k, "kmeans").expect("clustering");

        assert_eq!(result.cluster_labels.len(), 6);
        assert!(result.cluster_labels.iter().all(|&l| l < k));
        assert_eq!(result.cluster_centers.len(), k);
        assert_eq!(result.cluster_statistics.len(), k);
        let total: usize = result.cluster_statistics.values().map(|s| s.size).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let first = clustering(&inline(EXPRESSION), 3, "kmeans").expect("first");
        let second = clustering(&inline(EXPRESSION), 3, "kmeans").expect("second");

        assert_eq!(first.cluster_labels, second.cluster_labels);
        assert_eq!(first.cluster_centers, second.cluster_centers);
    }

    #[test]
    fn test_clustering_errors() {
        let err = clustering(&inline(EXPRESSION), 2, "hierarchical").unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedMethod(_)));

        let err = clustering(&inline("name,A\nx,1\ny,2"), 2, "kmeans").unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientColumns(1)));
    }

    #[test]
    fn test_result_shape_serializes() {
        let result = clustering(&inline(EXPRESSION), 2, "kmeans").expect("clustering");
        let json = serde_json::to_value(&result).expect("serialize");

        assert_eq!(json["method"], "kmeans");
        assert_eq!(json["features"], serde_json::json!(["A", "B", "C"]));
        assert!(json["cluster_statistics"]["cluster_0"]["mean_values"]["A"].is_number());
        assert_eq!(json["pca_data"][0].as_array().map(Vec::len), Some(2));
    }
}
