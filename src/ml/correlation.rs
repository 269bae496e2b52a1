//! Correlation matrix computation

use crate::ml::stats::{correlation, rank};
use crate::structs::{AnalysisError, CorrelationMatrix, Result, Table};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Correlation coefficient to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    /// Pearson over average ranks
    Spearman,
}

impl FromStr for CorrelationMethod {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pearson" => Ok(Self::Pearson),
            "spearman" => Ok(Self::Spearman),
            other => Err(AnalysisError::UnsupportedMethod(format!(
                "{other}. Use 'pearson' or 'spearman'"
            ))),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pearson => write!(f, "pearson"),
            Self::Spearman => write!(f, "spearman"),
        }
    }
}

/// Compute the `NxN` correlation matrix between the named numeric columns
///
/// Each pair uses only rows where both values are present. Pairs with fewer
/// than two such rows, or with zero variance, get 0.0. The diagonal is 1.0.
///
/// # Errors
/// Returns error if a name is not a numeric column of the table
pub fn correlation_matrix(
    table: &Table,
    names: &[String],
    method: CorrelationMethod,
) -> Result<CorrelationMatrix> {
    let columns = names
        .iter()
        .map(|name| {
            table
                .column(name)
                .and_then(|c| c.values())
                .ok_or_else(|| AnalysisError::ColumnNotFound(name.clone()))
        })
        .collect::<Result<Vec<_>>>()?;

    let n = names.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pair_coefficient(columns[i], columns[j], method);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    let rows = names
        .iter()
        .zip(matrix)
        .map(|(name, row)| {
            let row = names.iter().cloned().zip(row).collect::<IndexMap<_, _>>();
            (name.clone(), row)
        })
        .collect();

    Ok(CorrelationMatrix(rows))
}

fn pair_coefficient(a: &[Option<f64>], b: &[Option<f64>], method: CorrelationMethod) -> f64 {
    let (x, y): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();

    let r = match method {
        CorrelationMethod::Pearson => correlation(&x, &y),
        CorrelationMethod::Spearman => correlation(&rank(&x), &rank(&y)),
    };
    r.unwrap_or(0.0)
}
