//! Tests on categorical data: contingency tables, McNemar, Cochran's Q.

use statrs::distribution::{Binomial, DiscreteCDF};

use super::{chi2_upper, TestStatistic};
use crate::error::{AnalysisError, Result};

/// Cross-tabulated counts of two categorical variables.
///
/// Levels are the distinct observed values, sorted ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    pub row_levels: Vec<f64>,
    pub col_levels: Vec<f64>,
    pub counts: Vec<Vec<u64>>,
}

fn levels(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v.dedup();
    v
}

fn level_index(levels: &[f64], value: f64) -> usize {
    levels
        .binary_search_by(|probe| probe.total_cmp(&value))
        .unwrap_or_default()
}

impl ContingencyTable {
    /// Counts each `(rows[i], cols[i])` pair.
    pub fn cross_tabulate(rows: &[f64], cols: &[f64]) -> Result<Self> {
        Self::check_lengths(rows, cols)?;
        Ok(Self::tabulate(rows, cols, levels(rows), levels(cols)))
    }

    /// Counts `(before[i], after[i])` pairs over the levels seen in either
    /// variable, so the table is square even when one side never changes.
    pub fn cross_tabulate_paired(before: &[f64], after: &[f64]) -> Result<Self> {
        Self::check_lengths(before, after)?;
        let shared: Vec<f64> = levels(&[before, after].concat());
        Ok(Self::tabulate(before, after, shared.clone(), shared))
    }

    fn check_lengths(rows: &[f64], cols: &[f64]) -> Result<()> {
        if rows.len() != cols.len() {
            return Err(AnalysisError::shape(
                "contingency table",
                format!("variables differ in length ({} vs {})", rows.len(), cols.len()),
            ));
        }
        if rows.is_empty() {
            return Err(AnalysisError::insufficient("contingency table", 1, 0));
        }
        Ok(())
    }

    fn tabulate(rows: &[f64], cols: &[f64], row_levels: Vec<f64>, col_levels: Vec<f64>) -> Self {
        let mut counts = vec![vec![0_u64; col_levels.len()]; row_levels.len()];
        for (&r, &c) in rows.iter().zip(cols) {
            counts[level_index(&row_levels, r)][level_index(&col_levels, c)] += 1;
        }

        Self {
            row_levels,
            col_levels,
            counts,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.row_levels.len(), self.col_levels.len())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

/// Pearson chi-square test of independence.
///
/// Yates' continuity correction is applied when the table has one degree of
/// freedom. A table with a single row or column has no degrees of freedom and
/// yields `statistic = 0, p = 1`.
pub fn chi_square_independence(table: &ContingencyTable) -> Result<TestStatistic> {
    let (r, c) = table.shape();
    let dof = r.saturating_sub(1) * c.saturating_sub(1);
    if dof == 0 {
        return Ok(TestStatistic::new(0.0, 1.0));
    }

    let total = table.total() as f64;
    let row_totals: Vec<f64> = table
        .counts
        .iter()
        .map(|row| row.iter().sum::<u64>() as f64)
        .collect();
    let col_totals: Vec<f64> = (0..c)
        .map(|j| table.counts.iter().map(|row| row[j]).sum::<u64>() as f64)
        .collect();

    let mut statistic = 0.0;
    for (i, row) in table.counts.iter().enumerate() {
        for (j, &observed) in row.iter().enumerate() {
            let expected = row_totals[i] * col_totals[j] / total;
            let mut diff = (observed as f64 - expected).abs();
            if dof == 1 {
                diff -= diff.min(0.5);
            }
            statistic += diff * diff / expected;
        }
    }

    let p = chi2_upper(statistic, dof as f64)?;
    Ok(TestStatistic::new(statistic, p))
}

/// Exact McNemar test on a 2x2 table of paired binary outcomes.
///
/// The statistic is the smaller discordant count; the p-value is the two-sided
/// binomial probability under `p = 0.5`. A 1x1 table (every pair at the same
/// single level) has no discordant pairs and yields `statistic = 0, p = 1`.
pub fn mcnemar(table: &ContingencyTable) -> Result<TestStatistic> {
    if table.shape() == (1, 1) {
        return Ok(TestStatistic::new(0.0, 1.0));
    }
    if table.shape() != (2, 2) {
        let (r, c) = table.shape();
        return Err(AnalysisError::shape(
            "McNemar Test",
            format!("needs a 2x2 table, got {r}x{c}"),
        ));
    }

    let b = table.counts[0][1];
    let c = table.counts[1][0];
    let smaller = b.min(c);
    let n = b + c;
    if n == 0 {
        return Ok(TestStatistic::new(0.0, 1.0));
    }

    let dist = Binomial::new(0.5, n).map_err(|e| AnalysisError::Degenerate(e.to_string()))?;
    let p = 2.0 * dist.cdf(smaller);
    Ok(TestStatistic::new(smaller as f64, p))
}

/// Cochran's Q test. Each slice is one treatment of binary outcomes; row `i`
/// of every slice is subject `i`.
///
/// Any two category codes are accepted: the lower one counts as failure (0),
/// the higher as success (1).
pub fn cochran_q(treatments: &[&[f64]]) -> Result<TestStatistic> {
    let k = treatments.len();
    if k < 2 {
        return Err(AnalysisError::shape(
            "Cochran's Q Test",
            format!("needs at least 2 treatments, got {k}"),
        ));
    }
    let n = treatments[0].len();
    if treatments.iter().any(|t| t.len() != n) {
        return Err(AnalysisError::shape(
            "Cochran's Q Test",
            "every treatment needs one outcome per subject",
        ));
    }
    let outcome_levels = levels(&treatments.concat());
    if outcome_levels.len() > 2 {
        return Err(AnalysisError::shape(
            "Cochran's Q Test",
            format!(
                "outcomes must be binary, found {} levels: {outcome_levels:?}",
                outcome_levels.len()
            ),
        ));
    }
    let indicator = |v: f64| level_index(&outcome_levels, v) as f64;

    let kf = k as f64;
    let column_totals: Vec<f64> = treatments
        .iter()
        .map(|t| t.iter().map(|&v| indicator(v)).sum())
        .collect();
    let row_totals: Vec<f64> = (0..n)
        .map(|i| treatments.iter().map(|t| indicator(t[i])).sum())
        .collect();
    let grand: f64 = column_totals.iter().sum();

    let denominator = kf * grand - row_totals.iter().map(|l| l * l).sum::<f64>();
    if denominator <= 0.0 {
        return Err(AnalysisError::Degenerate(
            "Cochran's Q Test is undefined: every subject has identical outcomes".to_string(),
        ));
    }
    let numerator =
        (kf - 1.0) * (kf * column_totals.iter().map(|t| t * t).sum::<f64>() - grand * grand);
    let q = numerator / denominator;
    let p = chi2_upper(q, kf - 1.0)?;
    Ok(TestStatistic::new(q, p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cross_tabulate() {
        let t = ContingencyTable::cross_tabulate(&[0.0, 0.0, 1.0, 1.0, 1.0], &[2.0, 3.0, 2.0, 2.0, 3.0])
            .unwrap();
        assert_eq!(t.row_levels, vec![0.0, 1.0]);
        assert_eq!(t.col_levels, vec![2.0, 3.0]);
        assert_eq!(t.counts, vec![vec![1, 1], vec![2, 1]]);
    }

    #[test]
    fn test_chi_square_balanced_table() {
        let t = ContingencyTable::cross_tabulate(&[0.0, 0.0, 1.0, 1.0], &[0.0, 1.0, 0.0, 1.0]).unwrap();
        let r = chi_square_independence(&t).unwrap();
        assert!(r.statistic.abs() < f64::EPSILON);
        assert!((r.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_chi_square_strong_association() {
        let mut rows = vec![0.0; 30];
        rows.extend(vec![1.0; 30]);
        let mut cols = vec![0.0; 28];
        cols.extend(vec![1.0; 2]);
        cols.extend(vec![0.0; 3]);
        cols.extend(vec![1.0; 27]);
        let t = ContingencyTable::cross_tabulate(&rows, &cols).unwrap();
        let r = chi_square_independence(&t).unwrap();
        assert!(r.p_value < 0.001);
    }

    #[test]
    fn test_chi_square_single_level() {
        let t = ContingencyTable::cross_tabulate(&[1.0, 1.0], &[0.0, 1.0]).unwrap();
        let r = chi_square_independence(&t).unwrap();
        assert!((r.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mcnemar_discordant() {
        let mut before = vec![0.0; 10];
        let mut after = vec![1.0; 10];
        before.extend([0.0; 5]);
        after.extend([0.0; 5]);
        before.extend([1.0; 5]);
        after.extend([1.0; 5]);
        let t = ContingencyTable::cross_tabulate(&before, &after).unwrap();
        let r = mcnemar(&t).unwrap();
        assert!(r.statistic.abs() < f64::EPSILON);
        assert!((r.p_value - 2.0 / 1024.0).abs() < 1e-9);
    }

    #[test]
    fn test_mcnemar_no_discordant_pairs() {
        let t = ContingencyTable::cross_tabulate(&[0.0, 1.0], &[0.0, 1.0]).unwrap();
        let r = mcnemar(&t).unwrap();
        assert!((r.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mcnemar_one_side_constant() {
        let before = [0.0; 10];
        let after = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        let t = ContingencyTable::cross_tabulate_paired(&before, &after).unwrap();
        assert_eq!(t.shape(), (2, 2));
        assert_eq!(t.counts, vec![vec![1, 9], vec![0, 0]]);
        let r = mcnemar(&t).unwrap();
        assert!(r.statistic.abs() < f64::EPSILON);
        assert!((r.p_value - 2.0 / 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_mcnemar_single_shared_level() {
        let t = ContingencyTable::cross_tabulate_paired(&[1.0, 1.0], &[1.0, 1.0]).unwrap();
        let r = mcnemar(&t).unwrap();
        assert!((r.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mcnemar_requires_two_by_two() {
        let t = ContingencyTable::cross_tabulate(&[0.0, 1.0, 2.0], &[0.0, 1.0, 1.0]).unwrap();
        assert!(matches!(mcnemar(&t), Err(AnalysisError::InputShape { .. })));
    }

    #[test]
    fn test_cochran_q_known_value() {
        let a = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let b = [1.0, 1.0, 1.0, 1.0, 0.0, 0.0];
        let c = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let r = cochran_q(&[&a, &b, &c]).unwrap();
        assert!((r.statistic - 112.0 / 12.0).abs() < 1e-9);
        assert!(r.p_value < 0.01);
    }

    #[test]
    fn test_cochran_q_arbitrary_codes() {
        let a = [2.0, 2.0, 2.0, 2.0, 2.0, 2.0];
        let b = [2.0, 2.0, 2.0, 2.0, 1.0, 1.0];
        let c = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let r = cochran_q(&[&a, &b, &c]).unwrap();
        assert!((r.statistic - 112.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_cochran_q_rejects_non_binary() {
        let a = [1.0, 2.0];
        let b = [0.0, 1.0];
        assert!(matches!(
            cochran_q(&[&a, &b]),
            Err(AnalysisError::InputShape { .. })
        ));
    }
}
