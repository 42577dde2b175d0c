//! Assumption checks that decide between parametric and non-parametric tests.
//!
//! Per column: Shapiro-Wilk normality and a z-score outlier screen. Across
//! columns: Levene's test for equal variances. Independence cannot be tested
//! from the data and is taken from the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::matrix::DataMatrix;
use crate::selector::Classification;
use crate::stats::compute_stats;
use crate::stats::normality::{levene, shapiro_wilk};

/// Which assumption a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Normality,
    Outliers,
    Homogeneity,
    Independence,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normality => "Normality (Shapiro-Wilk)",
            Self::Outliers => "Outliers (|z| > 3)",
            Self::Homogeneity => "Homogeneity of variance (Levene)",
            Self::Independence => "Independence (asserted)",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    const fn from_pass(pass: bool) -> Self {
        if pass {
            Self::Pass
        } else {
            Self::Fail
        }
    }

    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// One assumption check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub check: CheckKind,
    /// Column the check applies to; `None` for checks over the whole matrix.
    pub column: Option<String>,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub outcome: Outcome,
    /// Why the check could not be computed, when it failed for that reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Decision thresholds for the checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckThresholds {
    /// Normality passes when the Shapiro-Wilk p-value exceeds this.
    pub normality_alpha: f64,
    /// Homogeneity passes when the Levene p-value exceeds this.
    pub homogeneity_alpha: f64,
    /// A value is an outlier when its |z| exceeds this.
    pub outlier_z: f64,
}

impl Default for CheckThresholds {
    fn default() -> Self {
        Self {
            normality_alpha: 0.05,
            homogeneity_alpha: 0.05,
            outlier_z: 3.0,
        }
    }
}

/// All assumption results for one matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssumptionReport {
    pub normality: Vec<CheckResult>,
    pub outliers: Vec<CheckResult>,
    /// Present only with two or more columns.
    pub homogeneity: Option<CheckResult>,
    pub independence: CheckResult,
}

impl AssumptionReport {
    /// Every individual result, in report order.
    pub fn results(&self) -> impl Iterator<Item = &CheckResult> {
        self.normality
            .iter()
            .chain(&self.outliers)
            .chain(&self.homogeneity)
            .chain(std::iter::once(&self.independence))
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results().filter(|r| !r.outcome.is_pass())
    }

    /// Parametric iff every result passed.
    pub fn classification(&self) -> Classification {
        if self.results().all(|r| r.outcome.is_pass()) {
            Classification::Parametric
        } else {
            Classification::NonParametric
        }
    }
}

/// Runs all checks with default thresholds.
///
/// Checks that cannot be computed (too few values, zero range) are recorded as
/// failures with a note rather than aborting the report.
pub fn check_assumptions(matrix: &DataMatrix, independence_asserted: bool) -> AssumptionReport {
    check_assumptions_with(matrix, independence_asserted, &CheckThresholds::default())
}

/// Runs all checks with explicit thresholds.
pub fn check_assumptions_with(
    matrix: &DataMatrix,
    independence_asserted: bool,
    thresholds: &CheckThresholds,
) -> AssumptionReport {
    let normality = matrix
        .columns()
        .iter()
        .map(|col| {
            let result = shapiro_wilk(&col.values);
            if let Err(e) = &result {
                warn!(column = %col.name, error = %e, "normality check not computable");
            }
            p_value_check(
                CheckKind::Normality,
                Some(col.name.clone()),
                result,
                thresholds.normality_alpha,
            )
        })
        .collect();

    let outliers = matrix
        .columns()
        .iter()
        .map(|col| outlier_check(&col.name, &col.values, thresholds.outlier_z))
        .collect();

    let homogeneity = (matrix.column_count() >= 2).then(|| {
        let result = levene(&matrix.samples());
        if let Err(e) = &result {
            warn!(error = %e, "homogeneity check not computable");
        }
        p_value_check(CheckKind::Homogeneity, None, result, thresholds.homogeneity_alpha)
    });

    let independence = CheckResult {
        check: CheckKind::Independence,
        column: None,
        statistic: None,
        p_value: None,
        outcome: Outcome::from_pass(independence_asserted),
        note: None,
    };

    let report = AssumptionReport {
        normality,
        outliers,
        homogeneity,
        independence,
    };
    debug!(
        classification = %report.classification(),
        failures = report.failures().count(),
        "assumption checks complete"
    );
    report
}

/// Like [`check_assumptions_with`], but a check that cannot be computed is an
/// error instead of a recorded failure.
pub fn check_assumptions_strict(
    matrix: &DataMatrix,
    independence_asserted: bool,
    thresholds: &CheckThresholds,
) -> Result<AssumptionReport> {
    for col in matrix.columns() {
        shapiro_wilk(&col.values)?;
    }
    if matrix.column_count() >= 2 {
        levene(&matrix.samples())?;
    }
    Ok(check_assumptions_with(matrix, independence_asserted, thresholds))
}

fn p_value_check(
    check: CheckKind,
    column: Option<String>,
    result: Result<crate::stats::TestStatistic>,
    alpha: f64,
) -> CheckResult {
    match result {
        Ok(stat) => CheckResult {
            check,
            column,
            statistic: Some(stat.statistic),
            p_value: Some(stat.p_value),
            outcome: Outcome::from_pass(stat.p_value > alpha),
            note: None,
        },
        Err(e) => CheckResult {
            check,
            column,
            statistic: None,
            p_value: None,
            outcome: Outcome::Fail,
            note: Some(e.to_string()),
        },
    }
}

/// Flags the column when any value lies more than `limit` population standard
/// deviations from the column mean.
fn outlier_check(name: &str, values: &[f64], limit: f64) -> CheckResult {
    let (mean, std) = compute_stats(values);
    let max_z = if std > 0.0 {
        values
            .iter()
            .map(|v| ((v - mean) / std).abs())
            .fold(0.0, f64::max)
    } else {
        0.0
    };

    CheckResult {
        check: CheckKind::Outliers,
        column: Some(name.to_string()),
        statistic: Some(max_z),
        p_value: None,
        outcome: Outcome::from_pass(max_z <= limit),
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn matrix(columns: Vec<(&str, Vec<f64>)>) -> DataMatrix {
        DataMatrix::from_columns(columns).unwrap()
    }

    /// Twelve ordinary values and one extreme one.
    fn with_outlier() -> Vec<f64> {
        let mut v: Vec<f64> = (0..12).map(|i| 10.0 + f64::from(i % 3) * 0.1).collect();
        v.push(100.0);
        v
    }

    #[test]
    fn test_one_result_per_column() {
        let m = matrix(vec![
            ("a", vec![1.0, 2.0, 3.0, 4.0]),
            ("b", vec![2.0, 3.0, 4.0, 6.0]),
            ("c", vec![5.0, 1.0, 2.0, 2.5]),
        ]);
        let report = check_assumptions(&m, true);
        assert_eq!(report.normality.len(), 3);
        assert_eq!(report.outliers.len(), 3);
        assert!(report.homogeneity.is_some());
        assert_eq!(report.results().count(), 3 + 3 + 1 + 1);
    }

    #[test]
    fn test_single_column_has_no_homogeneity() {
        let report = check_assumptions(&matrix(vec![("a", vec![1.0, 2.0, 3.0])]), true);
        assert!(report.homogeneity.is_none());
    }

    #[test]
    fn test_clean_data_is_parametric() {
        let m = matrix(vec![("a", vec![1.0, 2.0, 3.0]), ("b", vec![101.0, 102.0, 103.0])]);
        let report = check_assumptions(&m, true);
        assert_eq!(report.classification(), Classification::Parametric);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_independence_flag_alone_forces_non_parametric() {
        let m = matrix(vec![("a", vec![1.0, 2.0, 3.0]), ("b", vec![101.0, 102.0, 103.0])]);
        let report = check_assumptions(&m, false);
        assert_eq!(report.classification(), Classification::NonParametric);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.independence.outcome, Outcome::Fail);
    }

    #[test]
    fn test_any_single_failure_forces_non_parametric() {
        let m = matrix(vec![("a", vec![1.0, 2.0, 3.0]), ("b", vec![101.0, 102.0, 103.0])]);
        let base = check_assumptions(&m, true);
        assert_eq!(base.classification(), Classification::Parametric);

        let slots = base.results().count();
        for slot in 0..slots {
            let mut report = base.clone();
            let target = report
                .normality
                .iter_mut()
                .chain(report.outliers.iter_mut())
                .chain(report.homogeneity.iter_mut())
                .chain(std::iter::once(&mut report.independence))
                .nth(slot)
                .unwrap();
            target.outcome = Outcome::Fail;
            assert_eq!(report.classification(), Classification::NonParametric);
        }
    }

    #[test]
    fn test_outlier_detected() {
        let report = check_assumptions(&matrix(vec![("a", with_outlier())]), true);
        assert_eq!(report.outliers[0].outcome, Outcome::Fail);
        assert!(report.outliers[0].statistic.unwrap() > 3.0);
    }

    #[test]
    fn test_constant_column_has_no_outliers() {
        let report = check_assumptions(&matrix(vec![("a", vec![5.0; 6])]), true);
        assert_eq!(report.outliers[0].outcome, Outcome::Pass);
        // Zero range: normality cannot be computed.
        assert_eq!(report.normality[0].outcome, Outcome::Fail);
        assert!(report.normality[0].note.is_some());
    }

    #[test]
    fn test_small_column_recorded_not_raised() {
        let report = check_assumptions(&matrix(vec![("a", vec![1.0, 2.0])]), true);
        let normality = &report.normality[0];
        assert_eq!(normality.outcome, Outcome::Fail);
        assert_eq!(normality.p_value, None);
        assert_eq!(
            normality.note.as_deref(),
            Some("Shapiro-Wilk needs at least 3 values, got 2")
        );
    }

    #[test]
    fn test_strict_mode_propagates() {
        let m = matrix(vec![("a", vec![1.0, 2.0])]);
        let err = check_assumptions_strict(&m, true, &CheckThresholds::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::AnalysisError::InsufficientSample { needed: 3, given: 2, .. }
        ));
    }

    #[test]
    fn test_unequal_variances_fail_homogeneity() {
        let m = matrix(vec![
            ("a", vec![10.0, 10.1, 9.9, 10.0, 10.1, 9.9, 10.0, 10.05]),
            ("b", vec![0.0, 20.0, 5.0, 15.0, -3.0, 23.0, 8.0, 12.0]),
        ]);
        let report = check_assumptions(&m, true);
        assert_eq!(report.homogeneity.as_ref().unwrap().outcome, Outcome::Fail);
        assert_eq!(report.classification(), Classification::NonParametric);
    }
}
