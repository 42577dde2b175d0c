//! Numerical routines behind the test runner.
//!
//! Each routine returns a [`TestStatistic`]. Distribution tails come from
//! `statrs`; the test statistics themselves follow the standard textbook
//! definitions (two-sided alternatives throughout).

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod categorical;
pub mod nonparametric;
pub mod normality;
pub mod parametric;

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

use crate::error::{AnalysisError, Result};

/// Statistic and two-sided p-value produced by a routine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestStatistic {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestStatistic {
    pub(crate) fn new(statistic: f64, p_value: f64) -> Self {
        Self {
            statistic,
            p_value: clamp_p(p_value),
        }
    }
}

/// Clamps a probability into `[0, 1]`; `NaN` becomes 1.
#[inline]
#[must_use]
pub fn clamp_p(p: f64) -> f64 {
    if p.is_nan() {
        1.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Mean and population standard deviation of a sample.
#[must_use]
pub fn compute_stats(sample: &[f64]) -> (f64, f64) {
    if sample.is_empty() {
        return (0.0, 0.0);
    }

    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    (mean, std)
}

#[must_use]
pub fn mean(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    sample.iter().sum::<f64>() / sample.len() as f64
}

/// Unbiased (n - 1) variance.
#[must_use]
pub fn sample_variance(sample: &[f64]) -> f64 {
    let n = sample.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(sample);
    sample.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

#[must_use]
pub fn median(sample: &[f64]) -> f64 {
    if sample.is_empty() {
        return f64::NAN;
    }
    let sorted = sorted(sample);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub(crate) fn sorted(sample: &[f64]) -> Vec<f64> {
    let mut v = sample.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Average ranks (1-based) with ties sharing the mean rank.
///
/// Also returns the tie term `sum(t^3 - t)` over all tie groups.
#[must_use]
pub fn rank_with_ties(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut start = 0;

    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end share ranks start+1 ..= end.
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        let t = (end - start) as f64;
        tie_term += t.powi(3) - t;
        start = end;
    }

    (ranks, tie_term)
}

/// Two-sided p-value of a Student t statistic.
pub(crate) fn t_two_sided(t: f64, df: f64) -> Result<f64> {
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::Degenerate(format!("Student t with {df} dof: {e}")))?;
    Ok(2.0 * dist.sf(t.abs()))
}

/// Upper-tail p-value of an F statistic.
pub(crate) fn f_upper(f: f64, df1: f64, df2: f64) -> Result<f64> {
    if f.is_infinite() {
        return Ok(0.0);
    }
    let dist = FisherSnedecor::new(df1, df2)
        .map_err(|e| AnalysisError::Degenerate(format!("F({df1}, {df2}): {e}")))?;
    Ok(dist.sf(f.max(0.0)))
}

/// Upper-tail p-value of a chi-squared statistic.
pub(crate) fn chi2_upper(x: f64, df: f64) -> Result<f64> {
    if x.is_infinite() {
        return Ok(0.0);
    }
    let dist = ChiSquared::new(df)
        .map_err(|e| AnalysisError::Degenerate(format!("chi-squared with {df} dof: {e}")))?;
    Ok(dist.sf(x.max(0.0)))
}

/// Two-sided p-value of a standard normal statistic.
pub(crate) fn normal_two_sided(z: f64) -> f64 {
    // N(0, 1) parameters are always valid.
    Normal::new(0.0, 1.0).map_or(1.0, |n| 2.0 * n.sf(z.abs()))
}

/// Ratio of mean squares with explicit handling of a zero denominator.
pub(crate) fn f_ratio(ms_effect: f64, ms_error: f64, scale: f64, what: &str) -> Result<f64> {
    let tol = f64::EPSILON * scale.max(1.0) * 64.0;
    if ms_error > tol {
        Ok(ms_effect / ms_error)
    } else if ms_effect > tol {
        Ok(f64::INFINITY)
    } else {
        Err(AnalysisError::Degenerate(format!(
            "{what} is undefined: every observation is identical"
        )))
    }
}
