use crate::structs::{AnalysisError, ColumnStats, Result, StatsReport, Table};
use log::warn;

/// Statistics for each named column, skipping columns with no values
///
/// # Errors
/// Returns `NoNumericData` when there are no names or no rows, or a name
/// refers to a categorical column; `ColumnNotFound` for unknown names
pub fn describe(table: &Table, names: &[String]) -> Result<StatsReport> {
    if names.is_empty() || table.row_count() == 0 {
        return Err(AnalysisError::NoNumericData);
    }

    let mut report = StatsReport::new();
    for name in names {
        let column = table
            .column(name)
            .ok_or_else(|| AnalysisError::ColumnNotFound(name.clone()))?;
        if !column.is_numeric() {
            return Err(AnalysisError::NoNumericData);
        }

        let values = column.present_values();
        if values.is_empty() {
            warn!("Column {name} has no values; skipped");
            continue;
        }
        report.insert(
            name.clone(),
            ColumnStats::calculate(name, &values, column.missing_count())?,
        );
    }
    Ok(report)
}

impl ColumnStats {
    /// Calculate statistics for the non-missing values of a column
    ///
    /// `missing` is the count of missing entries in the original column.
    ///
    /// # Errors
    /// Returns error if values is empty
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate(name: &str, values: &[f64], missing: usize) -> Result<Self> {
        if values.is_empty() {
            return Err(AnalysisError::Ml(format!(
                "Cannot calculate stats for empty column {name}"
            )));
        }

        let count = values.len();
        let mean = mean(values);

        let std = if count > 1 {
            let ss = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let (skewness, kurtosis) = moments(values, mean);

        Ok(Self {
            name: name.to_string(),
            mean,
            median: percentile(&sorted, 50.0),
            std,
            min: sorted[0],
            max: sorted[count - 1],
            count,
            missing,
            q25: percentile(&sorted, 25.0),
            q75: percentile(&sorted, 75.0),
            skewness,
            kurtosis,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Biased skewness and excess kurtosis; both 0.0 when variance is zero
#[allow(clippy::cast_precision_loss)]
fn moments(values: &[f64], mean: f64) -> (f64, f64) {
    let n = values.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &v in values {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;

    // Relative tolerance so float noise in a constant column reads as zero
    if m2 <= f64::EPSILON * mean.abs().max(1.0).powi(2) {
        return (0.0, 0.0);
    }
    (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
}

/// Calculate percentile using linear interpolation
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let k = (p / 100.0) * (sorted.len() - 1) as f64;
    let f = k.floor() as usize;
    let c = k.ceil() as usize;

    if f == c {
        sorted[f]
    } else {
        let d0 = sorted[f] * (c as f64 - k);
        let d1 = sorted[c] * (k - f as f64);
        d0 + d1
    }
}

/// Average ranks (1-based); ties share the mean of their positions
#[allow(clippy::cast_precision_loss)]
pub(crate) fn rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

/// Calculate Pearson correlation coefficient between two variables
///
/// Undefined coefficients (zero variance) come back as 0.0.
///
/// # Errors
/// Returns error if vectors have different lengths or fewer than 2 values
#[allow(clippy::cast_precision_loss)]
pub fn correlation(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(AnalysisError::Ml("Vectors must have same length".into()));
    }
    if x.len() < 2 {
        return Err(AnalysisError::Ml(
            "Need at least 2 values for correlation".into(),
        ));
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Ok(0.0);
    }

    Ok((cov / denom).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_column_stats() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let stats = ColumnStats::calculate("test", &values, 2).expect("calculate stats");

        assert_eq!(stats.count, 10);
        assert_eq!(stats.missing, 2);
        assert_abs_diff_eq!(stats.mean, 5.5, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.median, 5.5, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.std, 3.027_650_354, epsilon = 1e-8);
        assert_abs_diff_eq!(stats.q25, 3.25, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.q75, 7.75, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.min, 1.0);
        assert_abs_diff_eq!(stats.max, 10.0);
        assert_abs_diff_eq!(stats.skewness, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.kurtosis, -1.224_242_424, epsilon = 1e-8);
    }

    #[test]
    fn test_skewed_column() {
        let stats = ColumnStats::calculate("s", &[1.0, 1.0, 1.0, 10.0], 0).expect("stats");
        // m2 = 15.1875, m3 = 68.34375
        assert_abs_diff_eq!(stats.skewness, 1.154_700_538, epsilon = 1e-8);
        assert_abs_diff_eq!(stats.kurtosis, -0.666_666_667, epsilon = 1e-8);
    }

    #[test]
    fn test_single_value_and_constant() {
        let one = ColumnStats::calculate("one", &[4.2], 0).expect("stats");
        assert_abs_diff_eq!(one.std, 0.0);
        assert_abs_diff_eq!(one.q75, 4.2);

        let flat = ColumnStats::calculate("flat", &[3.0, 3.0, 3.0], 0).expect("stats");
        assert_abs_diff_eq!(flat.skewness, 0.0);
        assert_abs_diff_eq!(flat.kurtosis, 0.0);
    }

    #[test]
    fn test_empty_column_errors() {
        assert!(ColumnStats::calculate("empty", &[], 3).is_err());
    }

    #[test]
    fn test_describe_counts_against_full_length() {
        let source = crate::structs::InlineSource::new(
            "d.csv",
            "name,a,b,empty\nw,1,,\nx,2,4,\ny,,6,\nz,4,8,",
        );
        let table = Table::load(&source).expect("parse");
        let names = vec!["a".to_string(), "b".to_string(), "empty".to_string()];
        let report = describe(&table, &names).expect("describe");

        assert_eq!(report.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        for stats in report.values() {
            assert_eq!(stats.count + stats.missing, 4);
        }
        assert_abs_diff_eq!(report.get("b").unwrap().mean, 6.0);
    }

    #[test]
    fn test_describe_rejects_bad_columns() {
        let table = Table::load(&crate::structs::InlineSource::new("d.csv", "name,a\nw,1"))
            .expect("parse");

        assert!(matches!(
            describe(&table, &["zzz".to_string()]),
            Err(AnalysisError::ColumnNotFound(_))
        ));
        assert!(matches!(
            describe(&table, &["name".to_string()]),
            Err(AnalysisError::NoNumericData)
        ));
        assert!(matches!(describe(&table, &[]), Err(AnalysisError::NoNumericData)));
    }

    #[test]
    fn test_rank_ties() {
        assert_eq!(rank(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn test_correlation() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let corr = correlation(&x, &y).expect("calculate correlation");
        assert_abs_diff_eq!(corr, 1.0, epsilon = 1e-12);

        let flat = correlation(&x, &[1.0; 5]).expect("calculate correlation");
        assert_abs_diff_eq!(flat, 0.0);
    }
}
