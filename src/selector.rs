//! Test selection.
//!
//! A pure decision table from data type, pairing, group count and the
//! parametric classification to exactly one [`TestIdentifier`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Measurement level of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Numerical,
    Categorical,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Numerical => "numerical",
            Self::Categorical => "categorical",
        })
    }
}

/// Whether groups are matched observations on the same units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pairing {
    Paired,
    Unpaired,
}

impl fmt::Display for Pairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paired => "paired",
            Self::Unpaired => "unpaired",
        })
    }
}

/// Outcome of the assumption checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Parametric,
    NonParametric,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parametric => "Parametric",
            Self::NonParametric => "Non-Parametric",
        })
    }
}

/// The twelve supported hypothesis tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestIdentifier {
    OneSampleTTest,
    PairedTTest,
    RepeatedMeasuresAnova,
    IndependentTTest,
    OneWayAnova,
    WilcoxonSignedRank,
    Friedman,
    MannWhitneyU,
    KruskalWallis,
    McNemar,
    CochranQ,
    ChiSquare,
}

impl TestIdentifier {
    pub const ALL: [Self; 12] = [
        Self::OneSampleTTest,
        Self::PairedTTest,
        Self::RepeatedMeasuresAnova,
        Self::IndependentTTest,
        Self::OneWayAnova,
        Self::WilcoxonSignedRank,
        Self::Friedman,
        Self::MannWhitneyU,
        Self::KruskalWallis,
        Self::McNemar,
        Self::CochranQ,
        Self::ChiSquare,
    ];

    /// Human-readable test name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::OneSampleTTest => "One Sample T-Test",
            Self::PairedTTest => "Paired T-Test",
            Self::RepeatedMeasuresAnova => "Repeated Measures ANOVA",
            Self::IndependentTTest => "Independent T-Test",
            Self::OneWayAnova => "One-Way ANOVA",
            Self::WilcoxonSignedRank => "Wilcoxon Signed Rank Test",
            Self::Friedman => "Friedman Test",
            Self::MannWhitneyU => "Mann-Whitney U Test",
            Self::KruskalWallis => "Kruskal Wallis Test",
            Self::McNemar => "McNemar Test",
            Self::CochranQ => "Cochran's Q Test",
            Self::ChiSquare => "Chi-Square Test",
        }
    }

    /// Name used in scenario files and JSON output.
    pub const fn key(self) -> &'static str {
        match self {
            Self::OneSampleTTest => "one_sample_t_test",
            Self::PairedTTest => "paired_t_test",
            Self::RepeatedMeasuresAnova => "repeated_measures_anova",
            Self::IndependentTTest => "independent_t_test",
            Self::OneWayAnova => "one_way_anova",
            Self::WilcoxonSignedRank => "wilcoxon_signed_rank",
            Self::Friedman => "friedman",
            Self::MannWhitneyU => "mann_whitney_u",
            Self::KruskalWallis => "kruskal_wallis",
            Self::McNemar => "mc_nemar",
            Self::CochranQ => "cochran_q",
            Self::ChiSquare => "chi_square",
        }
    }
}

impl fmt::Display for TestIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestIdentifier {
    type Err = String;

    /// Accepts either the display name or the snake_case key, ignoring case.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(wanted) || t.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown test: {wanted}"))
    }
}

/// Inputs to [`select_test`].
///
/// `classification` only matters for numerical data; categorical requests
/// ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub data_type: DataType,
    pub pairing: Pairing,
    pub groups: usize,
    pub classification: Classification,
}

impl AnalysisRequest {
    pub const fn numerical(pairing: Pairing, groups: usize, classification: Classification) -> Self {
        Self {
            data_type: DataType::Numerical,
            pairing,
            groups,
            classification,
        }
    }

    pub const fn categorical(pairing: Pairing, groups: usize) -> Self {
        Self {
            data_type: DataType::Categorical,
            pairing,
            groups,
            classification: Classification::NonParametric,
        }
    }
}

/// Maps a request to the one test the decision table prescribes.
pub fn select_test(request: &AnalysisRequest) -> Result<TestIdentifier> {
    use Classification::{NonParametric, Parametric};
    use DataType::{Categorical, Numerical};
    use Pairing::{Paired, Unpaired};

    let AnalysisRequest {
        data_type,
        pairing,
        groups,
        classification,
    } = *request;

    if groups == 0 {
        return Err(AnalysisError::UnsupportedCombination {
            data_type,
            pairing,
            groups,
        });
    }

    let test = match (data_type, classification, pairing, groups) {
        (Numerical, Parametric, Paired, 1) => TestIdentifier::OneSampleTTest,
        (Numerical, Parametric, Paired, 2) => TestIdentifier::PairedTTest,
        (Numerical, Parametric, Paired, _) => TestIdentifier::RepeatedMeasuresAnova,
        (Numerical, Parametric, Unpaired, 2) => TestIdentifier::IndependentTTest,
        (Numerical, Parametric, Unpaired, _) => TestIdentifier::OneWayAnova,
        (Numerical, NonParametric, Paired, 2) => TestIdentifier::WilcoxonSignedRank,
        (Numerical, NonParametric, Paired, _) => TestIdentifier::Friedman,
        (Numerical, NonParametric, Unpaired, 2) => TestIdentifier::MannWhitneyU,
        (Numerical, NonParametric, Unpaired, _) => TestIdentifier::KruskalWallis,
        (Categorical, _, Paired, 2) => TestIdentifier::McNemar,
        (Categorical, _, Paired, _) => TestIdentifier::CochranQ,
        (Categorical, _, Unpaired, _) => TestIdentifier::ChiSquare,
    };

    Ok(test)
}
