//! End-to-end analysis.
//!
//! Threads each stage's output into the next: matrix → assumption report →
//! request → selected test → result → interpretation. Nothing is shared
//! between runs.

use serde::Serialize;
use tracing::{debug, info};

use crate::assumptions::{check_assumptions_with, AssumptionReport, CheckThresholds};
use crate::error::{AnalysisError, Result};
use crate::interpret::{interpret, Interpretation, DEFAULT_ALPHA};
use crate::matrix::DataMatrix;
use crate::runner::{run_test, TestResult};
use crate::selector::{select_test, AnalysisRequest, Classification, DataType, Pairing};

/// Everything produced by one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub request: AnalysisRequest,
    /// Absent for categorical data, which skips the checks.
    pub assumptions: Option<AssumptionReport>,
    pub result: TestResult,
    pub interpretation: Interpretation,
}

/// Builder for a single analysis.
#[derive(Debug, Clone)]
pub struct Analysis<'a> {
    matrix: &'a DataMatrix,
    data_type: DataType,
    pairing: Pairing,
    groups: Option<usize>,
    independence: bool,
    alpha: f64,
    thresholds: CheckThresholds,
}

impl<'a> Analysis<'a> {
    /// Numerical, unpaired, independence asserted, alpha 0.05, group count
    /// taken from the matrix.
    pub fn new(matrix: &'a DataMatrix) -> Self {
        Self {
            matrix,
            data_type: DataType::Numerical,
            pairing: Pairing::Unpaired,
            groups: None,
            independence: true,
            alpha: DEFAULT_ALPHA,
            thresholds: CheckThresholds::default(),
        }
    }

    #[must_use]
    pub const fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    #[must_use]
    pub const fn pairing(mut self, pairing: Pairing) -> Self {
        self.pairing = pairing;
        self
    }

    /// Declares the group count. It must match the matrix column count.
    #[must_use]
    pub const fn groups(mut self, groups: usize) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Whether the analyst attests that observations are independent.
    #[must_use]
    pub const fn independence(mut self, asserted: bool) -> Self {
        self.independence = asserted;
        self
    }

    #[must_use]
    pub const fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    #[must_use]
    pub const fn thresholds(mut self, thresholds: CheckThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    fn resolve_groups(&self) -> Result<usize> {
        let actual = self.matrix.column_count();
        match self.groups {
            Some(declared) if declared != actual => {
                Err(AnalysisError::GroupCountMismatch { declared, actual })
            }
            _ => Ok(actual),
        }
    }

    pub fn run(&self) -> Result<AnalysisOutcome> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AnalysisError::InvalidAlpha(self.alpha));
        }
        let groups = self.resolve_groups()?;

        let (request, assumptions) = match self.data_type {
            DataType::Numerical => {
                let report = check_assumptions_with(self.matrix, self.independence, &self.thresholds);
                let classification = report.classification();
                (
                    AnalysisRequest::numerical(self.pairing, groups, classification),
                    Some(report),
                )
            }
            DataType::Categorical => (AnalysisRequest::categorical(self.pairing, groups), None),
        };
        debug!(?request, "analysis request built");

        let test = select_test(&request)?;
        let result = run_test(test, self.matrix)?;
        let interpretation = interpret(&result, self.alpha);

        info!(
            test = %test,
            p_value = result.p_value,
            verdict = %interpretation.verdict,
            "analysis complete"
        );

        Ok(AnalysisOutcome {
            request,
            assumptions,
            result,
            interpretation,
        })
    }
}

impl AnalysisOutcome {
    /// Classification used for selection; `None` for categorical data.
    pub fn classification(&self) -> Option<Classification> {
        self.assumptions.as_ref().map(AssumptionReport::classification)
    }
}
