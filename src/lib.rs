//! hypotest: assumption-driven hypothesis testing.
//!
//! Checks normality, outliers, variance homogeneity and asserted
//! independence, selects one of twelve classical tests from a fixed decision
//! table, runs it, and reports a significance verdict.

pub mod assumptions;
pub mod error;
pub mod interpret;
pub mod matrix;
pub mod pipeline;
pub mod runner;
pub mod selector;
pub mod stats;
pub mod types;

pub use assumptions::{check_assumptions, AssumptionReport};
pub use error::{AnalysisError, Result};
pub use interpret::{interpret, Verdict};
pub use matrix::DataMatrix;
pub use pipeline::{Analysis, AnalysisOutcome};
pub use runner::{run_test, TestResult};
pub use selector::{select_test, AnalysisRequest, TestIdentifier};
