//! Rank-based tests.
//!
//! Wilcoxon and Mann-Whitney use exact null distributions for small samples
//! without ties and a tie-corrected normal approximation otherwise.

use super::{chi2_upper, normal_two_sided, rank_with_ties, TestStatistic};
use crate::error::{AnalysisError, Result};

/// Largest number of non-zero differences for the exact Wilcoxon distribution.
const WILCOXON_EXACT_MAX: usize = 50;
/// Both Mann-Whitney samples must be smaller than this for the exact test.
const MANN_WHITNEY_EXACT_LIMIT: usize = 8;

/// Wilcoxon signed-rank test on paired samples.
///
/// Zero differences are discarded. The statistic is the smaller of the
/// positive and negative rank sums.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Result<TestStatistic> {
    if a.len() != b.len() {
        return Err(AnalysisError::shape(
            "Wilcoxon Signed Rank Test",
            format!("samples differ in length ({} vs {})", a.len(), b.len()),
        ));
    }

    let diffs: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(x, y)| x - y)
        .filter(|d| *d != 0.0)
        .collect();
    let n = diffs.len();
    if n == 0 {
        return Ok(TestStatistic::new(0.0, 1.0));
    }

    let magnitudes: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, tie_term) = rank_with_ties(&magnitudes);
    let r_plus: f64 = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let nf = n as f64;
    let r_minus = nf * (nf + 1.0) / 2.0 - r_plus;
    let statistic = r_plus.min(r_minus);

    if n <= WILCOXON_EXACT_MAX && tie_term == 0.0 {
        let p = 2.0 * signed_rank_cdf(n, statistic);
        return Ok(TestStatistic::new(statistic, p));
    }

    let mu = nf * (nf + 1.0) / 4.0;
    let var = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term / 48.0;
    if var <= 0.0 {
        return Ok(TestStatistic::new(statistic, 1.0));
    }
    let z = (statistic - mu) / var.sqrt();
    Ok(TestStatistic::new(statistic, normal_two_sided(z)))
}

/// `P(T <= t)` for the signed-rank statistic with `n` untied ranks.
fn signed_rank_cdf(n: usize, t: f64) -> f64 {
    let max_sum = n * (n + 1) / 2;
    // counts[s] = number of subsets of {1..n} with rank sum s
    let mut counts = vec![0.0_f64; max_sum + 1];
    counts[0] = 1.0;
    for rank in 1..=n {
        for s in (rank..=max_sum).rev() {
            counts[s] += counts[s - rank];
        }
    }
    let total = 2.0_f64.powi(i32::try_from(n).unwrap_or(i32::MAX));
    let limit = t.floor() as usize;
    counts.iter().take(limit + 1).sum::<f64>() / total
}

/// Mann-Whitney U test on two independent samples.
///
/// The reported statistic is `U` for the first sample.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<TestStatistic> {
    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 {
        return Err(AnalysisError::insufficient("Mann-Whitney U Test", 1, n1.min(n2)));
    }

    let combined: Vec<f64> = a.iter().chain(b).copied().collect();
    let (ranks, tie_term) = rank_with_ties(&combined);
    let r1: f64 = ranks[..n1].iter().sum();

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let u1 = r1 - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;

    if n1 < MANN_WHITNEY_EXACT_LIMIT && n2 < MANN_WHITNEY_EXACT_LIMIT && tie_term == 0.0 {
        let p = 2.0 * mann_whitney_cdf(n1, n2, u1.min(u2));
        return Ok(TestStatistic::new(u1, p));
    }

    let n = n1f + n2f;
    let mu = n1f * n2f / 2.0;
    let var = n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
    if var <= 0.0 {
        return Ok(TestStatistic::new(u1, 1.0));
    }
    // Continuity correction toward the mean.
    let z = (u1.max(u2) - mu - 0.5) / var.sqrt();
    Ok(TestStatistic::new(u1, normal_two_sided(z)))
}

/// `P(U <= u)` for samples of size `n1` and `n2` without ties.
fn mann_whitney_cdf(n1: usize, n2: usize, u: f64) -> f64 {
    let max_u = n1 * n2;
    // freq[j][s]: arrangements of i first-sample and j second-sample values
    // with U = s, built up over i.
    let mut freq: Vec<Vec<f64>> = (0..=n2)
        .map(|_| {
            let mut row = vec![0.0; max_u + 1];
            row[0] = 1.0;
            row
        })
        .collect();

    for _ in 1..=n1 {
        let mut next = vec![vec![0.0; max_u + 1]; n2 + 1];
        next[0][0] = 1.0;
        for j in 1..=n2 {
            for s in 0..=max_u {
                // Largest value from the first sample: it beats all j others.
                let from_first = if s >= j { freq[j][s - j] } else { 0.0 };
                // Largest value from the second sample.
                let from_second = next[j - 1][s];
                next[j][s] = from_first + from_second;
            }
        }
        freq = next;
    }

    let total: f64 = freq[n2].iter().sum();
    let limit = u.floor() as usize;
    freq[n2].iter().take(limit + 1).sum::<f64>() / total
}

/// Kruskal-Wallis H test across independent groups, tie corrected.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Result<TestStatistic> {
    let k = groups.len();
    if k < 2 {
        return Err(AnalysisError::shape(
            "Kruskal Wallis Test",
            format!("needs at least 2 groups, got {k}"),
        ));
    }
    if let Some(empty) = groups.iter().position(|g| g.is_empty()) {
        return Err(AnalysisError::insufficient(
            format!("Kruskal Wallis group {}", empty + 1),
            1,
            0,
        ));
    }

    let combined: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = combined.len() as f64;
    let (ranks, tie_term) = rank_with_ties(&combined);

    let mut offset = 0;
    let mut rank_term = 0.0;
    for g in groups {
        let sum: f64 = ranks[offset..offset + g.len()].iter().sum();
        rank_term += sum * sum / g.len() as f64;
        offset += g.len();
    }

    let correction = 1.0 - tie_term / (n.powi(3) - n);
    if correction <= 0.0 {
        return Err(AnalysisError::Degenerate(
            "Kruskal Wallis Test is undefined: every observation is identical".to_string(),
        ));
    }
    let h = (12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0)) / correction;
    let p = chi2_upper(h, (k - 1) as f64)?;
    Ok(TestStatistic::new(h, p))
}

/// Friedman test for repeated measures. Each slice is one treatment; row `i`
/// of every slice is block `i`.
pub fn friedman(treatments: &[&[f64]]) -> Result<TestStatistic> {
    let k = treatments.len();
    if k < 3 {
        return Err(AnalysisError::shape(
            "Friedman Test",
            format!("needs at least 3 treatments, got {k}"),
        ));
    }
    let n = treatments[0].len();
    if treatments.iter().any(|t| t.len() != n) {
        return Err(AnalysisError::shape(
            "Friedman Test",
            "every treatment needs one value per block",
        ));
    }
    if n == 0 {
        return Err(AnalysisError::insufficient("Friedman Test blocks", 1, 0));
    }

    let mut rank_sums = vec![0.0; k];
    let mut tie_term = 0.0;
    for i in 0..n {
        let block: Vec<f64> = treatments.iter().map(|t| t[i]).collect();
        let (ranks, ties) = rank_with_ties(&block);
        for (sum, r) in rank_sums.iter_mut().zip(ranks) {
            *sum += r;
        }
        tie_term += ties;
    }

    let (kf, nf) = (k as f64, n as f64);
    let correction = 1.0 - tie_term / (nf * kf * (kf * kf - 1.0));
    if correction <= 0.0 {
        return Err(AnalysisError::Degenerate(
            "Friedman Test is undefined: every block is constant".to_string(),
        ));
    }
    let ssbn: f64 = rank_sums.iter().map(|r| r * r).sum();
    let chi2 = (12.0 / (nf * kf * (kf + 1.0)) * ssbn - 3.0 * nf * (kf + 1.0)) / correction;
    let p = chi2_upper(chi2, kf - 1.0)?;
    Ok(TestStatistic::new(chi2, p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_rank_cdf_small() {
        // n = 3: sums 0..6 with counts 1,1,1,2,1,1,1 over 8 subsets.
        assert!((signed_rank_cdf(3, 0.0) - 0.125).abs() < 1e-12);
        assert!((signed_rank_cdf(3, 3.0) - 0.625).abs() < 1e-12);
        assert!((signed_rank_cdf(3, 6.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_wilcoxon_all_positive() {
        let a = [11.0, 12.5, 13.0, 14.2, 15.1, 16.3, 17.7, 18.4];
        let b = [10.0, 10.5, 10.0, 10.2, 10.1, 10.3, 10.7, 10.4];
        let r = wilcoxon_signed_rank(&a, &b).unwrap();
        assert!(r.statistic.abs() < f64::EPSILON);
        // 2 / 2^8
        assert!((r.p_value - 0.007_812_5).abs() < 1e-12);
    }

    #[test]
    fn test_wilcoxon_identical_samples() {
        let a = [1.0, 2.0, 3.0];
        let r = wilcoxon_signed_rank(&a, &a).unwrap();
        assert!((r.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wilcoxon_tied_uses_normal_approximation() {
        let a = [2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let b = [1.0, 2.0, 3.0, 4.0, 5.0, 8.0];
        let r = wilcoxon_signed_rank(&a, &b).unwrap();
        assert!(r.p_value > 0.05 && r.p_value < 1.0);
    }

    #[test]
    fn test_mann_whitney_exact_separated() {
        let r = mann_whitney_u(&[1.0, 2.0, 3.0, 4.0, 5.0], &[6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
        assert!(r.statistic.abs() < f64::EPSILON);
        // 2 / C(10, 5)
        assert!((r.p_value - 2.0 / 252.0).abs() < 1e-12);
    }

    #[test]
    fn test_mann_whitney_cdf_total() {
        assert!((mann_whitney_cdf(3, 4, 12.0) - 1.0).abs() < 1e-12);
        // Only one arrangement has U = 0.
        assert!((mann_whitney_cdf(3, 4, 0.0) - 1.0 / 35.0).abs() < 1e-12);
    }

    #[test]
    fn test_mann_whitney_large_overlapping() {
        let a: Vec<f64> = (0..20).map(f64::from).collect();
        let b: Vec<f64> = (0..20).map(|i| f64::from(i) + 0.5).collect();
        let r = mann_whitney_u(&a, &b).unwrap();
        assert!(r.p_value > 0.5);
    }

    #[test]
    fn test_kruskal_wallis_known_value() {
        let r = kruskal_wallis(&[
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[6.0, 7.0, 8.0, 9.0, 10.0],
            &[11.0, 12.0, 13.0, 14.0, 15.0],
        ])
        .unwrap();
        assert!((r.statistic - 12.5).abs() < 1e-9);
        assert!((r.p_value - (-6.25_f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_kruskal_wallis_all_tied() {
        let g = [1.0, 1.0];
        assert!(matches!(
            kruskal_wallis(&[&g, &g]),
            Err(AnalysisError::Degenerate(_))
        ));
    }

    #[test]
    fn test_friedman_consistent_ordering() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 3.0, 4.0, 5.0, 6.0];
        let c = [3.0, 4.0, 5.0, 6.0, 7.0];
        let r = friedman(&[&a, &b, &c]).unwrap();
        assert!((r.statistic - 10.0).abs() < 1e-9);
        assert!((r.p_value - (-5.0_f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_friedman_needs_three_treatments() {
        let a = [1.0, 2.0];
        assert!(matches!(
            friedman(&[&a, &a]),
            Err(AnalysisError::InputShape { .. })
        ));
    }
}
