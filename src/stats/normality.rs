//! Normality and variance-homogeneity tests.
//!
//! Shapiro-Wilk is delegated to the `normality` crate (valid for
//! 3 <= n <= 5000); Levene is computed here.

use normality::Error as NormalityError;

use super::{f_upper, mean, median, TestStatistic};
use crate::error::{AnalysisError, Result};

/// Shapiro-Wilk test of the null hypothesis that `sample` is normal.
///
/// Statistic is `W`; the p-value is the probability of a `W` this small under
/// normality.
pub fn shapiro_wilk(sample: &[f64]) -> Result<TestStatistic> {
    let computation = normality::shapiro_wilk(sample.iter().copied()).map_err(|e| match e {
        NormalityError::InsufficientSampleSize { given, needed } => {
            AnalysisError::insufficient("Shapiro-Wilk", needed, given)
        }
        NormalityError::ExcessiveSampleSize { given, needed } => AnalysisError::Degenerate(
            format!("Shapiro-Wilk supports at most {needed} values, got {given}"),
        ),
        NormalityError::ZeroRange => AnalysisError::Degenerate(
            "Shapiro-Wilk is undefined for a sample with zero range".to_string(),
        ),
        other => AnalysisError::Degenerate(format!("Shapiro-Wilk failed: {other:?}")),
    })?;

    Ok(TestStatistic::new(computation.statistic, computation.p_value))
}

/// Levene's test for equal variances, centered on group medians
/// (the Brown-Forsythe variant).
pub fn levene(groups: &[&[f64]]) -> Result<TestStatistic> {
    let k = groups.len();
    if k < 2 {
        return Err(AnalysisError::shape("Levene", format!("needs at least 2 groups, got {k}")));
    }
    if let Some(empty) = groups.iter().position(|g| g.is_empty()) {
        return Err(AnalysisError::insufficient(format!("Levene group {}", empty + 1), 1, 0));
    }

    let deviations: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| {
            let center = median(g);
            g.iter().map(|v| (v - center).abs()).collect()
        })
        .collect();

    let total: usize = groups.iter().map(|g| g.len()).sum();
    if total <= k {
        return Err(AnalysisError::insufficient("Levene", k + 1, total));
    }

    let group_means: Vec<f64> = deviations.iter().map(|d| mean(d)).collect();
    let grand = deviations.iter().flatten().sum::<f64>() / total as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.len() as f64 * (m - grand).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(d, m)| d.iter().map(|z| (z - m).powi(2)).sum::<f64>())
        .sum();

    let df1 = (k - 1) as f64;
    let df2 = (total - k) as f64;
    let tol = f64::EPSILON * 64.0 * (between + within).max(1.0);

    let statistic = if within > tol {
        (df2 / df1) * between / within
    } else if between > tol {
        f64::INFINITY
    } else {
        0.0
    };

    let p = f_upper(statistic, df1, df2)?;
    Ok(TestStatistic::new(statistic, p))
}
