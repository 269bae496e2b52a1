//! Two-condition differential expression
//!
//! The comparison runs in one of two modes, picked by scanning column names:
//!
//! * **real**: the first column whose name contains `condition`, `group` or
//!   `treatment` (case-insensitive) splits the rows into two groups, and each
//!   feature gets a two-sample Student's t-test and a log2 fold change.
//! * **simulated**: no such column exists, so up to 20 features receive
//!   synthetic fold changes (`N(0, 1.5)`) and p-values (`Beta(2, 10)`). The
//!   result is tagged `mode: "simulated"` and carries no biological meaning.

use crate::ml::stats::mean;
use crate::structs::{
    AnalysisError, DifferentialMode, DifferentialResult, GeneRecord, Result, Table,
};
use log::{info, warn};
use rand::Rng;
use rand_distr::{Beta, Distribution, Normal};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Substrings that mark a column as the experimental condition
pub const CONDITION_KEYWORDS: [&str; 3] = ["condition", "group", "treatment"];

/// Features drawn in simulated mode
pub const SIMULATED_FEATURES: usize = 20;

/// Records kept in real mode, lowest p-values first
pub const TOP_GENES: usize = 50;

/// Parameters for a differential comparison
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialParams {
    pub condition1: String,
    pub condition2: String,
    pub p_threshold: f64,
}

impl DifferentialParams {
    #[must_use]
    pub fn new(condition1: impl Into<String>, condition2: impl Into<String>) -> Self {
        Self {
            condition1: condition1.into(),
            condition2: condition2.into(),
            p_threshold: 0.05,
        }
    }

    #[must_use]
    pub const fn with_p_threshold(mut self, p_threshold: f64) -> Self {
        self.p_threshold = p_threshold;
        self
    }

    /// # Errors
    /// Returns error if the threshold is outside (0, 1]
    pub fn validate(&self) -> Result<()> {
        if !(self.p_threshold > 0.0 && self.p_threshold <= 1.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "p-value threshold must be in (0, 1], got {}",
                self.p_threshold
            )));
        }
        Ok(())
    }
}

/// First column whose name contains a condition keyword; first match wins
#[must_use]
pub fn find_condition_column(table: &Table) -> Option<&str> {
    table
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .find(|name| {
            let lower = name.to_lowercase();
            CONDITION_KEYWORDS.iter().any(|k| lower.contains(k))
        })
}

/// Run the comparison in whichever mode the table supports
///
/// # Errors
/// Returns `InsufficientData` in simulated mode with fewer than 2 features,
/// `NoGroupData` in real mode when a condition matches no rows
pub fn differential<R: Rng + ?Sized>(
    table: &Table,
    features: &[String],
    params: &DifferentialParams,
    rng: &mut R,
) -> Result<DifferentialResult> {
    params.validate()?;

    match find_condition_column(table) {
        Some(condition_column) => {
            info!("Differential analysis grouped by column '{condition_column}'");
            compare_groups(table, condition_column, features, params)
        }
        None => {
            info!("No condition column found; simulating differential results");
            simulate(features, params, rng)
        }
    }
}

/// Synthetic results for tables without grouping information
///
/// # Errors
/// Returns error if fewer than 2 features are available
pub fn simulate<R: Rng + ?Sized>(
    features: &[String],
    params: &DifferentialParams,
    rng: &mut R,
) -> Result<DifferentialResult> {
    if features.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "{} numeric feature(s), need at least 2",
            features.len()
        )));
    }

    let fold_change = Normal::new(0.0, 1.5)
        .map_err(|e| AnalysisError::Ml(format!("Invalid normal distribution: {e}")))?;
    let p_value = Beta::new(2.0, 10.0)
        .map_err(|e| AnalysisError::Ml(format!("Invalid beta distribution: {e}")))?;

    let records = features
        .iter()
        .take(SIMULATED_FEATURES)
        .map(|gene| {
            let log2fc = fold_change.sample(&mut *rng);
            let pvalue = p_value.sample(&mut *rng);
            GeneRecord {
                gene: gene.clone(),
                log2fc,
                pvalue,
                significant: pvalue < params.p_threshold,
            }
        })
        .collect();

    Ok(summarize(
        params,
        features.len(),
        records,
        None,
        DifferentialMode::Simulated,
    ))
}

/// Per-feature t-tests between the two named groups
///
/// # Errors
/// Returns error if either condition matches no rows
pub fn compare_groups(
    table: &Table,
    condition_column: &str,
    features: &[String],
    params: &DifferentialParams,
) -> Result<DifferentialResult> {
    let labels = &table
        .column(condition_column)
        .ok_or_else(|| AnalysisError::ColumnNotFound(condition_column.to_string()))?
        .cells;

    let rows_matching = |condition: &str| -> Vec<usize> {
        labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.as_str() == condition)
            .map(|(i, _)| i)
            .collect()
    };
    let group1 = rows_matching(&params.condition1);
    let group2 = rows_matching(&params.condition2);

    if group1.is_empty() || group2.is_empty() {
        return Err(AnalysisError::NoGroupData(
            params.condition1.clone(),
            params.condition2.clone(),
        ));
    }

    let mut records = Vec::new();
    for gene in features {
        let Some(values) = table.column(gene).and_then(|c| c.values()) else {
            continue;
        };
        let pick =
            |rows: &[usize]| -> Vec<f64> { rows.iter().filter_map(|&r| values[r]).collect() };
        let (x, y) = (pick(&group1), pick(&group2));

        if x.len() < 2 || y.len() < 2 {
            continue;
        }

        match t_test(&x, &y) {
            Ok(pvalue) => records.push(GeneRecord {
                gene: gene.clone(),
                log2fc: log2_fold_change(mean(&x), mean(&y)),
                pvalue,
                significant: pvalue < params.p_threshold,
            }),
            Err(e) => warn!("Skipping {gene}: {e}"),
        }
    }

    Ok(summarize(
        params,
        features.len(),
        records,
        Some(TOP_GENES),
        DifferentialMode::Real,
    ))
}

/// `log2(mean2 / mean1)` when both means are positive, else `mean2 - mean1`
#[must_use]
pub fn log2_fold_change(mean1: f64, mean2: f64) -> f64 {
    if mean1 > 0.0 && mean2 > 0.0 {
        (mean2 / mean1).log2()
    } else {
        mean2 - mean1
    }
}

/// Two-sided Student's t-test with pooled variance
///
/// # Errors
/// Returns error if either sample has fewer than 2 values or the pooled
/// variance is zero
#[allow(clippy::cast_precision_loss)]
pub fn t_test(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() < 2 || y.len() < 2 {
        return Err(AnalysisError::Ml(
            "t-test needs at least 2 values per group".into(),
        ));
    }

    let (n1, n2) = (x.len() as f64, y.len() as f64);
    let (mean1, mean2) = (mean(x), mean(y));
    let ss1 = x.iter().map(|v| (v - mean1).powi(2)).sum::<f64>();
    let ss2 = y.iter().map(|v| (v - mean2).powi(2)).sum::<f64>();

    let df = n1 + n2 - 2.0;
    let pooled_var = (ss1 + ss2) / df;
    let std_err = (pooled_var * (1.0 / n1 + 1.0 / n2)).sqrt();
    if !(std_err > 0.0 && std_err.is_finite()) {
        return Err(AnalysisError::Ml("t-test undefined for zero variance".into()));
    }

    let t = (mean1 - mean2) / std_err;
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::Ml(format!("Invalid t distribution: {e}")))?;

    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Count significant/up/down, sort by p-value and truncate
fn summarize(
    params: &DifferentialParams,
    total_genes: usize,
    mut records: Vec<GeneRecord>,
    keep: Option<usize>,
    mode: DifferentialMode,
) -> DifferentialResult {
    let significant: Vec<&GeneRecord> = records.iter().filter(|r| r.significant).collect();
    let upregulated = significant.iter().filter(|r| r.log2fc > 0.0).count();
    let significant_genes = significant.len();

    records.sort_by(|a, b| a.pvalue.total_cmp(&b.pvalue));
    if let Some(keep) = keep {
        records.truncate(keep);
    }

    DifferentialResult {
        condition1: params.condition1.clone(),
        condition2: params.condition2.clone(),
        p_value_threshold: params.p_threshold,
        total_genes,
        significant_genes,
        upregulated,
        downregulated: significant_genes - upregulated,
        top_genes: records,
        mode,
    }
}
