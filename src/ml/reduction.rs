//! PCA dimensionality reduction via an exact SVD

use crate::ml::features::ScaledFeatures;
use crate::structs::{AnalysisError, Result};
use nalgebra::DMatrix;

/// Number of principal components reported
pub const N_COMPONENTS: usize = 2;

/// Two-component projection of a standardized matrix
#[derive(Debug, Clone)]
pub struct PcaResult {
    /// One `[pc1, pc2]` pair per input row
    pub projection: Vec<[f64; 2]>,
    /// Share of total variance captured by each component; always two
    /// entries, 0.0 for components the data does not span
    pub explained_variance_ratio: Vec<f64>,
}

/// Project standardized features onto their first two principal components
///
/// Components are sign-normalized so their largest loading is positive.
///
/// # Errors
/// Returns error with fewer than 2 features or samples, or if the SVD does
/// not converge
pub fn project_2d(features: &ScaledFeatures) -> Result<PcaResult> {
    let n_samples = features.n_samples();
    let n_features = features.n_features();

    if n_features < 2 {
        return Err(AnalysisError::Ml("PCA requires at least 2 features".into()));
    }
    if n_samples < 2 {
        return Err(AnalysisError::Ml("PCA requires at least 2 samples".into()));
    }

    let matrix = DMatrix::from_row_slice(n_samples, n_features, &features.to_flat());
    let svd = matrix
        .clone()
        .try_svd(false, true, f64::EPSILON, 0)
        .ok_or_else(|| AnalysisError::Ml("PCA failed: SVD did not converge".into()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| AnalysisError::Ml("PCA failed: no right singular vectors".into()))?;
    let singular_values = svd.singular_values;

    let mut order: Vec<usize> = (0..singular_values.len()).collect();
    order.sort_by(|&a, &b| singular_values[b].total_cmp(&singular_values[a]));

    // Standardized columns are centered, so the squared Frobenius norm is the
    // total variance (up to the shared 1/(n-1) factor)
    let total: f64 = matrix.iter().map(|v| v * v).sum();

    let mut projection = vec![[0.0; 2]; n_samples];
    let mut explained_variance_ratio = vec![0.0; N_COMPONENTS];
    for (component, &index) in order.iter().take(N_COMPONENTS).enumerate() {
        let mut axis: Vec<f64> = v_t.row(index).iter().copied().collect();
        let pivot = axis
            .iter()
            .copied()
            .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
        if pivot < 0.0 {
            axis.iter_mut().for_each(|v| *v = -*v);
        }

        for (row, point) in projection.iter_mut().enumerate() {
            point[component] = matrix.row(row).iter().zip(&axis).map(|(x, a)| x * a).sum();
        }

        if total > 0.0 {
            let s = singular_values[index];
            explained_variance_ratio[component] = (s * s) / total;
        }
    }

    Ok(PcaResult {
        projection,
        explained_variance_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::features::{feature_columns, FeatureMatrix, StandardScaler};
    use crate::structs::{InlineSource, Table};
    use approx::assert_abs_diff_eq;

    fn scaled(content: &str) -> ScaledFeatures {
        let table = Table::load(&InlineSource::new("pca.csv", content)).expect("parse");
        let features =
            FeatureMatrix::zero_filled(&table, &feature_columns(&table)).expect("extract");
        StandardScaler::fit(&features).transform(&features)
    }

    fn component_share(result: &PcaResult, component: usize, total: f64) -> f64 {
        result
            .projection
            .iter()
            .map(|p| p[component] * p[component])
            .sum::<f64>()
            / total
    }

    #[test]
    fn test_project_2d() {
        let features = scaled(
            "name,a,b,c\n\
             r1,1.0,2.0,3.5\n\
             r2,2.0,4.1,5.0\n\
             r3,3.0,5.9,7.2\n\
             r4,4.0,8.0,8.9\n\
             r5,5.0,10.2,11.0",
        );

        let result = project_2d(&features).expect("pca");

        assert_eq!(result.projection.len(), 5);
        assert_eq!(result.explained_variance_ratio.len(), 2);
        let sum: f64 = result.explained_variance_ratio.iter().sum();
        assert!(sum <= 1.0 + 1e-9);
        // Nearly collinear columns: the first component dominates
        assert!(result.explained_variance_ratio[0] > 0.998);
        assert!(result.explained_variance_ratio[0] >= result.explained_variance_ratio[1]);
        assert_abs_diff_eq!(result.projection[0][0].abs(), 2.4093, epsilon = 1e-3);

        // Each ratio is the share of variance carried by its projected scores
        let total: f64 = features.to_flat().iter().map(|v| v * v).sum();
        for component in 0..2 {
            assert_abs_diff_eq!(
                component_share(&result, component, total),
                result.explained_variance_ratio[component],
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_rank_deficient_data_pads_ratios() {
        let one_direction = scaled("n,a,b\nr1,1,5\nr2,2,5\nr3,3,5\nr4,4,5");
        let result = project_2d(&one_direction).expect("pca");
        assert_eq!(result.explained_variance_ratio.len(), 2);
        assert_abs_diff_eq!(result.explained_variance_ratio[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.explained_variance_ratio[1], 0.0, epsilon = 1e-9);
        assert!(result.projection.iter().all(|p| p[1].abs() < 1e-9));

        let flat = scaled("n,a,b\nr1,3,5\nr2,3,5\nr3,3,5");
        let result = project_2d(&flat).expect("pca");
        assert_eq!(result.explained_variance_ratio, vec![0.0, 0.0]);
        assert!(result.projection.iter().all(|p| p == &[0.0, 0.0]));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let features = scaled("n,a,b\nr1,1,2\nr2,2,1\nr3,3,4\nr4,4,3");
        let first = project_2d(&features).expect("pca");
        let second = project_2d(&features).expect("pca");

        assert_eq!(first.projection, second.projection);
    }

    #[test]
    fn test_pca_too_few_samples() {
        let features = scaled("name,a,b\nr1,1.0,2.0");
        assert!(project_2d(&features).is_err());
    }
}
