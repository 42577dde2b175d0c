//! Dispatches a selected test to its numerical routine.

use serde::Serialize;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::matrix::DataMatrix;
use crate::selector::TestIdentifier;
use crate::stats::categorical::{chi_square_independence, cochran_q, mcnemar, ContingencyTable};
use crate::stats::nonparametric::{friedman, kruskal_wallis, mann_whitney_u, wilcoxon_signed_rank};
use crate::stats::parametric::{
    independent_t, one_sample_t, one_way_anova, paired_t, repeated_measures_anova,
};
use crate::stats::TestStatistic;

/// Reference mean for the one-sample t-test.
pub const ONE_SAMPLE_REFERENCE: f64 = 0.0;

/// Statistic and p-value of an executed test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub test: TestIdentifier,
    pub statistic: f64,
    pub p_value: f64,
}

impl TestResult {
    const fn from_statistic(test: TestIdentifier, stat: TestStatistic) -> Self {
        Self {
            test,
            statistic: stat.statistic,
            p_value: stat.p_value,
        }
    }
}

/// Runs `test` on `matrix`.
pub fn run_test(test: TestIdentifier, matrix: &DataMatrix) -> Result<TestResult> {
    let stat = match test {
        TestIdentifier::OneSampleTTest => {
            one_sample_t(first_column(test, matrix)?, ONE_SAMPLE_REFERENCE)?
        }
        TestIdentifier::PairedTTest => {
            let (a, b) = two_columns(test, matrix)?;
            paired_t(a, b)?
        }
        TestIdentifier::IndependentTTest => {
            let (a, b) = two_columns(test, matrix)?;
            independent_t(a, b)?
        }
        TestIdentifier::WilcoxonSignedRank => {
            let (a, b) = two_columns(test, matrix)?;
            wilcoxon_signed_rank(a, b)?
        }
        TestIdentifier::MannWhitneyU => {
            let (a, b) = two_columns(test, matrix)?;
            mann_whitney_u(a, b)?
        }
        TestIdentifier::RepeatedMeasuresAnova => {
            repeated_measures_anova(&all_columns(test, matrix, 2)?)?
        }
        TestIdentifier::OneWayAnova => one_way_anova(&all_columns(test, matrix, 2)?)?,
        TestIdentifier::Friedman => friedman(&all_columns(test, matrix, 3)?)?,
        TestIdentifier::KruskalWallis => kruskal_wallis(&all_columns(test, matrix, 2)?)?,
        TestIdentifier::ChiSquare => chi_square_independence(&contingency(test, matrix)?)?,
        TestIdentifier::McNemar => {
            let (before, after) = two_columns(test, matrix)?;
            mcnemar(&ContingencyTable::cross_tabulate_paired(before, after)?)?
        }
        TestIdentifier::CochranQ => cochran_q(&all_columns(test, matrix, 2)?)?,
    };

    debug!(
        test = %test,
        statistic = stat.statistic,
        p_value = stat.p_value,
        "test executed"
    );
    Ok(TestResult::from_statistic(test, stat))
}

/// One-sample t-test of column 0 against an arbitrary reference mean.
pub fn run_one_sample(matrix: &DataMatrix, popmean: f64) -> Result<TestResult> {
    let test = TestIdentifier::OneSampleTTest;
    let stat = one_sample_t(first_column(test, matrix)?, popmean)?;
    Ok(TestResult::from_statistic(test, stat))
}

fn require_columns(test: TestIdentifier, matrix: &DataMatrix, needed: usize) -> Result<()> {
    let found = matrix.column_count();
    if found < needed {
        return Err(AnalysisError::shape(
            test.name(),
            format!("needs at least {needed} columns, found {found}"),
        ));
    }
    Ok(())
}

fn first_column(test: TestIdentifier, matrix: &DataMatrix) -> Result<&[f64]> {
    matrix
        .column(0)
        .ok_or_else(|| AnalysisError::shape(test.name(), "needs at least 1 column, found 0"))
}

fn two_columns(test: TestIdentifier, matrix: &DataMatrix) -> Result<(&[f64], &[f64])> {
    require_columns(test, matrix, 2)?;
    match (matrix.column(0), matrix.column(1)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(AnalysisError::shape(test.name(), "needs at least 2 columns")),
    }
}

fn all_columns(test: TestIdentifier, matrix: &DataMatrix, needed: usize) -> Result<Vec<&[f64]>> {
    require_columns(test, matrix, needed)?;
    Ok(matrix.samples())
}

fn contingency(test: TestIdentifier, matrix: &DataMatrix) -> Result<ContingencyTable> {
    let (a, b) = two_columns(test, matrix)?;
    ContingencyTable::cross_tabulate(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn matrix(columns: Vec<Vec<f64>>) -> DataMatrix {
        DataMatrix::from_columns(
            columns
                .into_iter()
                .enumerate()
                .map(|(i, v)| (format!("Group {}", i + 1), v))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_paired_identical_columns_no_difference() {
        let values = vec![12.1, 11.4, 13.8, 12.9, 12.2];
        let m = matrix(vec![values.clone(), values]);
        let r = run_test(TestIdentifier::PairedTTest, &m).unwrap();
        assert_eq!(r.test, TestIdentifier::PairedTTest);
        assert!((r.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_independent_clearly_different() {
        let m = matrix(vec![vec![1.0, 2.0, 3.0], vec![101.0, 102.0, 103.0]]);
        let r = run_test(TestIdentifier::IndependentTTest, &m).unwrap();
        assert!(r.p_value < 0.05);
    }

    #[test]
    fn test_binary_tests_need_two_columns() {
        let m = matrix(vec![vec![1.0, 2.0, 3.0]]);
        for test in [
            TestIdentifier::PairedTTest,
            TestIdentifier::IndependentTTest,
            TestIdentifier::WilcoxonSignedRank,
            TestIdentifier::MannWhitneyU,
            TestIdentifier::ChiSquare,
            TestIdentifier::McNemar,
        ] {
            let err = run_test(test, &m).unwrap_err();
            assert!(
                matches!(err, AnalysisError::InputShape { .. }),
                "{test}: {err}"
            );
        }
    }

    #[test]
    fn test_one_sample_uses_zero_reference() {
        let m = matrix(vec![vec![-2.0, -1.0, 1.0, 2.0]]);
        let r = run_test(TestIdentifier::OneSampleTTest, &m).unwrap();
        assert!(r.statistic.abs() < 1e-12);

        let shifted = run_one_sample(&m, 5.0).unwrap();
        assert!(shifted.statistic < 0.0);
        assert!(shifted.p_value < 0.05);
    }

    #[test]
    fn test_chi_square_balanced() {
        let m = matrix(vec![vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 1.0, 0.0, 1.0]]);
        let r = run_test(TestIdentifier::ChiSquare, &m).unwrap();
        assert!((r.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_n_ary_tests_use_every_column() {
        let m = matrix(vec![
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
            vec![6.0, 7.0, 8.0, 9.0, 10.0],
            vec![11.0, 12.0, 13.0, 14.0, 15.0],
        ]);
        let kw = run_test(TestIdentifier::KruskalWallis, &m).unwrap();
        assert!((kw.statistic - 12.5).abs() < 1e-9);
        let fr = run_test(TestIdentifier::Friedman, &m).unwrap();
        assert!((fr.statistic - 10.0).abs() < 1e-9);
        let anova = run_test(TestIdentifier::OneWayAnova, &m).unwrap();
        assert!(anova.p_value < 0.001);
    }

    #[test]
    fn test_friedman_single_column_is_shape_error() {
        let m = matrix(vec![vec![1.0, 2.0, 3.0]]);
        assert!(matches!(
            run_test(TestIdentifier::Friedman, &m),
            Err(AnalysisError::InputShape { .. })
        ));
    }

    #[test]
    fn test_mcnemar_when_baseline_never_varies() {
        let m = matrix(vec![
            vec![0.0; 10],
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0],
        ]);
        let r = run_test(TestIdentifier::McNemar, &m).unwrap();
        assert!((r.p_value - 2.0 / 512.0).abs() < 1e-9);
    }

    #[test]
    fn test_cochran_q_over_all_columns() {
        let m = matrix(vec![
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ]);
        let r = run_test(TestIdentifier::CochranQ, &m).unwrap();
        assert!((r.statistic - 28.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_every_identifier_dispatches() {
        // Binary 0/1 data with enough structure for all twelve routines.
        let m = matrix(vec![
            vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0],
        ]);
        for test in TestIdentifier::ALL {
            let r = run_test(test, &m).unwrap_or_else(|e| panic!("{test}: {e}"));
            assert!((0.0..=1.0).contains(&r.p_value), "{test}");
        }
    }
}
