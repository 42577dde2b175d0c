//! Significance verdicts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runner::TestResult;
use crate::selector::TestIdentifier;

/// Conventional significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Reject,
    FailToReject,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reject => "reject H0",
            Self::FailToReject => "fail to reject H0",
        })
    }
}

/// Reject iff `p_value < alpha`. A p-value equal to alpha is not significant.
#[inline]
pub fn verdict(p_value: f64, alpha: f64) -> Verdict {
    if p_value < alpha {
        Verdict::Reject
    } else {
        Verdict::FailToReject
    }
}

/// A test result together with its verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub test: TestIdentifier,
    pub statistic: f64,
    pub p_value: f64,
    pub alpha: f64,
    pub verdict: Verdict,
}

impl Interpretation {
    /// Plain-language summary of the outcome.
    pub fn summary(&self) -> String {
        match self.verdict {
            Verdict::Reject => format!(
                "{}: p = {:.4} < {}. The difference is statistically significant; \
                 the null hypothesis is rejected.",
                self.test, self.p_value, self.alpha
            ),
            Verdict::FailToReject => format!(
                "{}: p = {:.4} >= {}. The difference is not statistically significant; \
                 the null hypothesis cannot be rejected.",
                self.test, self.p_value, self.alpha
            ),
        }
    }
}

/// Applies the significance threshold to a test result.
pub fn interpret(result: &TestResult, alpha: f64) -> Interpretation {
    Interpretation {
        test: result.test,
        statistic: result.statistic,
        p_value: result.p_value,
        alpha,
        verdict: verdict(result.p_value, alpha),
    }
}
