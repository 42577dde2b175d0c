//! t-tests and analysis of variance.

use super::{f_ratio, f_upper, mean, sample_variance, t_two_sided, TestStatistic};
use crate::error::{AnalysisError, Result};

/// Turns a mean difference and its standard error into a t statistic.
///
/// A zero standard error gives `t = 0, p = 1` when the difference is also
/// zero, and an infinite statistic with `p = 0` otherwise.
fn t_from_difference(diff: f64, se: f64, df: f64) -> Result<TestStatistic> {
    let scale = diff.abs().max(1.0) * f64::EPSILON * 64.0;
    if se > scale {
        let t = diff / se;
        return Ok(TestStatistic::new(t, t_two_sided(t, df)?));
    }
    if diff.abs() <= scale {
        Ok(TestStatistic::new(0.0, 1.0))
    } else {
        Ok(TestStatistic::new(diff.signum() * f64::INFINITY, 0.0))
    }
}

/// One-sample t-test of `mean(sample) == popmean`.
pub fn one_sample_t(sample: &[f64], popmean: f64) -> Result<TestStatistic> {
    let n = sample.len();
    if n < 2 {
        return Err(AnalysisError::insufficient("One Sample T-Test", 2, n));
    }
    let nf = n as f64;
    let se = (sample_variance(sample) / nf).sqrt();
    t_from_difference(mean(sample) - popmean, se, nf - 1.0)
}

/// Paired t-test on matched observations.
pub fn paired_t(a: &[f64], b: &[f64]) -> Result<TestStatistic> {
    if a.len() != b.len() {
        return Err(AnalysisError::shape(
            "Paired T-Test",
            format!("samples differ in length ({} vs {})", a.len(), b.len()),
        ));
    }
    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    one_sample_t(&diffs, 0.0)
}

/// Independent two-sample t-test with pooled variance.
pub fn independent_t(a: &[f64], b: &[f64]) -> Result<TestStatistic> {
    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 || n1 + n2 < 3 {
        return Err(AnalysisError::insufficient(
            "Independent T-Test",
            3,
            n1 + n2,
        ));
    }
    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let df = n1f + n2f - 2.0;

    let ss = |s: &[f64]| {
        let m = mean(s);
        s.iter().map(|v| (v - m).powi(2)).sum::<f64>()
    };
    let pooled = (ss(a) + ss(b)) / df;
    let se = (pooled * (1.0 / n1f + 1.0 / n2f)).sqrt();

    t_from_difference(mean(a) - mean(b), se, df)
}

/// One-way ANOVA across independent groups.
pub fn one_way_anova(groups: &[&[f64]]) -> Result<TestStatistic> {
    let k = groups.len();
    if k < 2 {
        return Err(AnalysisError::shape(
            "One-Way ANOVA",
            format!("needs at least 2 groups, got {k}"),
        ));
    }
    let total: usize = groups.iter().map(|g| g.len()).sum();
    if groups.iter().any(|g| g.is_empty()) || total <= k {
        return Err(AnalysisError::insufficient("One-Way ANOVA", k + 1, total));
    }

    let grand = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / total as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in groups {
        let m = mean(g);
        ss_between += g.len() as f64 * (m - grand).powi(2);
        ss_within += g.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }

    let df_between = (k - 1) as f64;
    let df_within = (total - k) as f64;
    let f = f_ratio(
        ss_between / df_between,
        ss_within / df_within,
        ss_between + ss_within,
        "One-Way ANOVA",
    )?;
    Ok(TestStatistic::new(f, f_upper(f, df_between, df_within)?))
}

/// Repeated measures ANOVA. Each slice is one condition; row `i` of every
/// slice belongs to subject `i`.
pub fn repeated_measures_anova(conditions: &[&[f64]]) -> Result<TestStatistic> {
    let k = conditions.len();
    if k < 2 {
        return Err(AnalysisError::shape(
            "Repeated Measures ANOVA",
            format!("needs at least 2 conditions, got {k}"),
        ));
    }
    let n = conditions[0].len();
    if conditions.iter().any(|c| c.len() != n) {
        return Err(AnalysisError::shape(
            "Repeated Measures ANOVA",
            "every condition needs one value per subject",
        ));
    }
    if n < 2 {
        return Err(AnalysisError::insufficient("Repeated Measures ANOVA subjects", 2, n));
    }

    let (kf, nf) = (k as f64, n as f64);
    let grand = conditions.iter().flat_map(|c| c.iter()).sum::<f64>() / (kf * nf);

    let ss_total: f64 = conditions
        .iter()
        .flat_map(|c| c.iter())
        .map(|v| (v - grand).powi(2))
        .sum();
    let ss_conditions: f64 = conditions
        .iter()
        .map(|c| nf * (mean(c) - grand).powi(2))
        .sum();
    let ss_subjects: f64 = (0..n)
        .map(|i| {
            let subject_mean = conditions.iter().map(|c| c[i]).sum::<f64>() / kf;
            kf * (subject_mean - grand).powi(2)
        })
        .sum();
    let ss_error = (ss_total - ss_conditions - ss_subjects).max(0.0);

    let df_conditions = kf - 1.0;
    let df_error = (kf - 1.0) * (nf - 1.0);
    let f = f_ratio(
        ss_conditions / df_conditions,
        ss_error / df_error,
        ss_total,
        "Repeated Measures ANOVA",
    )?;
    Ok(TestStatistic::new(f, f_upper(f, df_conditions, df_error)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_identical_columns() {
        let a = [5.1, 4.8, 6.2, 5.5, 5.0];
        let r = paired_t(&a, &a).unwrap();
        assert!(r.statistic.abs() < f64::EPSILON);
        assert!((r.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_paired_known_value() {
        // Differences 1, 2, 3: mean 2, sd 1, t = 2 * sqrt(3).
        let r = paired_t(&[2.0, 4.0, 6.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!((r.statistic - 2.0 * 3.0_f64.sqrt()).abs() < 1e-12);
        assert!(r.p_value > 0.05 && r.p_value < 0.1);
    }

    #[test]
    fn test_independent_clearly_different() {
        let r = independent_t(&[1.0, 2.0, 3.0], &[101.0, 102.0, 103.0]).unwrap();
        assert!((r.statistic + 100.0 / (2.0_f64 / 3.0).sqrt()).abs() < 1e-9);
        assert!(r.p_value < 0.05);
    }

    #[test]
    fn test_independent_constant_but_different() {
        let r = independent_t(&[1.0, 1.0], &[2.0, 2.0]).unwrap();
        assert!(r.statistic.is_infinite());
        assert!(r.p_value.abs() < f64::EPSILON);
    }

    #[test]
    fn test_one_sample_against_zero() {
        let r = one_sample_t(&[-1.0, 0.0, 1.0], 0.0).unwrap();
        assert!(r.statistic.abs() < 1e-12);
        assert!((r.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_sample_too_small() {
        assert!(matches!(
            one_sample_t(&[1.0], 0.0),
            Err(AnalysisError::InsufficientSample { .. })
        ));
    }

    #[test]
    fn test_one_way_anova_known_value() {
        let r = one_way_anova(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]).unwrap();
        assert!((r.statistic - 27.0).abs() < 1e-9);
        assert!(r.p_value < 0.01);
    }

    #[test]
    fn test_one_way_anova_all_identical() {
        let g = [3.0, 3.0];
        assert!(matches!(
            one_way_anova(&[&g, &g]),
            Err(AnalysisError::Degenerate(_))
        ));
    }

    #[test]
    fn test_repeated_measures_known_value() {
        // Subject effects are additive except for one cell, so error is small.
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 3.0, 4.0, 5.0];
        let c = [3.0, 4.0, 5.0, 7.0];
        let r = repeated_measures_anova(&[&a, &b, &c]).unwrap();
        assert!(r.statistic > 10.0);
        assert!(r.p_value < 0.01);
    }

    #[test]
    fn test_repeated_measures_no_condition_effect() {
        let a = [1.0, 5.0, 3.0];
        let b = [2.0, 4.0, 3.0];
        let c = [1.5, 4.5, 3.0];
        let r = repeated_measures_anova(&[&a, &b, &c]).unwrap();
        assert!(r.statistic.abs() < 1e-9);
        assert!((r.p_value - 1.0).abs() < 1e-9);
    }
}
