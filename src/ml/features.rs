use crate::structs::{AnalysisError, Result, Table};

/// Numeric columns selected for analysis, in table order
///
/// A leading numeric column is taken for a row identifier and dropped, unless
/// it is the only numeric column in the table.
#[must_use]
pub fn feature_columns(table: &Table) -> Vec<String> {
    let numeric = table.numeric_column_names();
    let first_is_numeric = table.columns.first().is_some_and(|c| c.is_numeric());

    let skip = usize::from(first_is_numeric && numeric.len() > 1);
    numeric.into_iter().skip(skip).map(String::from).collect()
}

/// Dense feature matrix (rows x features) with missing values imputed to 0
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Feature names (column headers)
    pub names: Vec<String>,
    /// Row data as feature vectors
    pub data: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Gather the named numeric columns, filling missing entries with 0
    ///
    /// # Errors
    /// Returns error if a name is absent or not numeric
    pub fn zero_filled(table: &Table, names: &[String]) -> Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let values = table
                .column(name)
                .ok_or_else(|| AnalysisError::ColumnNotFound(name.clone()))?
                .values()
                .ok_or(AnalysisError::NoNumericData)?;
            columns.push(values);
        }

        let data = (0..table.row_count())
            .map(|row| columns.iter().map(|col| col[row].unwrap_or(0.0)).collect())
            .collect();

        Ok(Self {
            names: names.to_vec(),
            data,
        })
    }

    /// Get number of samples (rows)
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.len()
    }

    /// Get number of features (columns)
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }
}

/// Zero-mean / unit-variance scaling fitted on a single matrix
///
/// Built fresh for every call; never shared between datasets.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and population standard deviations per feature
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(features: &FeatureMatrix) -> Self {
        let n = features.n_samples().max(1) as f64;
        let p = features.n_features();

        let mut means = vec![0.0; p];
        for row in &features.data {
            for (m, &v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut scales = vec![0.0; p];
        for row in &features.data {
            for ((s, &v), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut scales {
            let std = (*s / n).sqrt();
            // Constant column
            *s = if std > 0.0 { std } else { 1.0 };
        }

        Self { means, scales }
    }

    /// Scale a matrix with the fitted parameters
    #[must_use]
    pub fn transform(&self, features: &FeatureMatrix) -> ScaledFeatures {
        let data = features
            .data
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(&v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect();

        ScaledFeatures {
            names: features.names.clone(),
            data,
        }
    }

    /// Map a point from scaled space back to original units
    #[must_use]
    pub fn inverse_transform(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(&v, (m, s))| v * s + m)
            .collect()
    }
}

/// Standardized feature matrix
#[derive(Debug, Clone)]
pub struct ScaledFeatures {
    pub names: Vec<String>,
    pub data: Vec<Vec<f64>>,
}

impl ScaledFeatures {
    /// Get number of samples
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.data.len()
    }

    /// Get number of features
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Convert to flat `Vec<f64>` (row-major)
    #[must_use]
    pub fn to_flat(&self) -> Vec<f64> {
        self.data.iter().flatten().copied().collect()
    }
}
