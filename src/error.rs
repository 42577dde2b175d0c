//! Error types for the analysis pipeline.
//!
//! Every variant is local to a single analysis run; callers may fix the
//! input and try again.

use thiserror::Error;

use crate::selector::{DataType, Pairing};

/// Errors raised while building a matrix or running an analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The matrix has the wrong number or layout of columns for a test.
    #[error("{test}: {detail}")]
    InputShape { test: String, detail: String },

    /// A cell or manual entry token could not be read as a number.
    #[error("non-numeric value {token:?} in {column}, row {row}")]
    NonNumericInput {
        column: String,
        row: usize,
        token: String,
    },

    /// A column has too few values for the requested computation.
    #[error("{context} needs at least {needed} values, got {given}")]
    InsufficientSample {
        context: String,
        needed: usize,
        given: usize,
    },

    /// The request falls outside the decision table.
    #[error("no test defined for {data_type} data, {pairing}, {groups} group(s)")]
    UnsupportedCombination {
        data_type: DataType,
        pairing: Pairing,
        groups: usize,
    },

    /// The declared group count disagrees with the matrix.
    #[error("declared {declared} group(s) but the data has {actual} column(s)")]
    GroupCountMismatch { declared: usize, actual: usize },

    /// The statistic is undefined for this data (e.g. every value identical).
    #[error("{0}")]
    Degenerate(String),

    /// Significance level outside (0, 1).
    #[error("significance level must lie in (0, 1), got {0}")]
    InvalidAlpha(f64),

    /// No usable columns were supplied.
    #[error("data contains no groups")]
    NoColumns,
}

impl AnalysisError {
    pub(crate) fn shape(test: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InputShape {
            test: test.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn insufficient(context: impl Into<String>, needed: usize, given: usize) -> Self {
        Self::InsufficientSample {
            context: context.into(),
            needed,
            given,
        }
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, AnalysisError>;
