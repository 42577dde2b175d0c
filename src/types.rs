//! Scenario files for batch runs.
//!
//! A scenario file names a set of analyses, each with inline data and the
//! test and verdict it is expected to produce.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::assumptions::CheckThresholds;
use crate::interpret::{Verdict, DEFAULT_ALPHA};
use crate::matrix::DataMatrix;
use crate::pipeline::Analysis;
use crate::selector::{DataType, Pairing, TestIdentifier};

/// One inline column.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub values: Vec<f64>,
}

/// Analysis specification.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSpec {
    /// Scenario name (populated from `HashMap` key).
    #[serde(default)]
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_pairing")]
    pub pairing: Pairing,
    /// Declared group count; derived from the data when absent.
    pub groups: Option<usize>,
    /// Whether independence is asserted.
    #[serde(default = "default_independence")]
    pub independence: bool,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Check thresholds.
    #[serde(default)]
    pub thresholds: Option<CheckThresholds>,
    /// Inline columns, in order.
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    /// Manual entry strings, one per group; used when `columns` is empty.
    #[serde(default)]
    pub manual: Vec<String>,
    /// Expected outcome.
    pub expect: Option<Expectation>,
    /// Reason to skip this scenario.
    pub skip: Option<String>,
}

const fn default_pairing() -> Pairing {
    Pairing::Unpaired
}

const fn default_independence() -> bool {
    true
}

const fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

/// Expected test and verdict.
#[derive(Debug, Clone, Deserialize)]
pub struct Expectation {
    pub test: Option<TestIdentifier>,
    pub verdict: Option<Verdict>,
    /// Expected error text fragment, for scenarios that must fail.
    pub error: Option<String>,
}

/// Result of running a scenario.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScenarioResult {
    /// Outcome matched the expectation.
    Pass { name: String, details: String },
    /// Outcome differed from the expectation.
    Fail { name: String, reason: String },
    /// Analysis could not run and no error was expected.
    Error { name: String, error: String },
    /// Scenario was skipped.
    Skip { name: String, reason: String },
}

impl ScenarioResult {
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass { .. })
    }

    pub const fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. } | Self::Error { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Pass { name, .. }
            | Self::Fail { name, .. }
            | Self::Error { name, .. }
            | Self::Skip { name, .. } => name,
        }
    }
}

/// Scenario file structure.
#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    /// Default significance level for analyses in this file.
    #[serde(rename = "_alpha")]
    pub alpha: Option<f64>,

    /// Analyses in this file.
    #[serde(default)]
    pub analyses: HashMap<String, serde_yaml_ng::Value>,
}

/// Loads analysis specs from a YAML scenario file, sorted by name.
pub fn load_scenarios(content: &str) -> anyhow::Result<Vec<AnalysisSpec>> {
    let file: ScenarioFile = serde_yaml_ng::from_str(content)?;
    let mut specs = Vec::new();

    for (name, raw) in file.analyses {
        let explicit_alpha = raw.get("alpha").is_some();
        let mut spec: AnalysisSpec = serde_yaml_ng::from_value(raw)
            .map_err(|e| anyhow::anyhow!("analysis {name}: {e}"))?;
        spec.name = name;
        if let (false, Some(alpha)) = (explicit_alpha, file.alpha) {
            spec.alpha = alpha;
        }
        specs.push(spec);
    }

    specs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(specs)
}

impl AnalysisSpec {
    fn matrix(&self) -> crate::error::Result<DataMatrix> {
        if self.columns.is_empty() {
            DataMatrix::from_manual_entry(&self.manual)
        } else {
            DataMatrix::from_columns(
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values.clone()))
                    .collect(),
            )
        }
    }

    /// Runs the analysis and compares it with the expectation.
    pub fn evaluate(&self) -> ScenarioResult {
        let name = self.name.clone();

        if let Some(reason) = &self.skip {
            return ScenarioResult::Skip {
                name,
                reason: reason.clone(),
            };
        }
        let Some(expect) = &self.expect else {
            return ScenarioResult::Skip {
                name,
                reason: "no expectation given".to_string(),
            };
        };

        let outcome = self.matrix().and_then(|matrix| {
            let mut analysis = Analysis::new(&matrix)
                .data_type(self.data_type)
                .pairing(self.pairing)
                .independence(self.independence)
                .alpha(self.alpha)
                .thresholds(self.thresholds.unwrap_or_default());
            if let Some(groups) = self.groups {
                analysis = analysis.groups(groups);
            }
            analysis.run()
        });

        let outcome = match (outcome, &expect.error) {
            (Ok(outcome), None) => outcome,
            (Ok(outcome), Some(fragment)) => {
                return ScenarioResult::Fail {
                    name,
                    reason: format!(
                        "expected error containing {fragment:?}, got {} (p={:.4})",
                        outcome.result.test, outcome.result.p_value
                    ),
                };
            }
            (Err(e), Some(fragment)) if e.to_string().contains(fragment.as_str()) => {
                return ScenarioResult::Pass {
                    name,
                    details: format!("failed as expected: {e}"),
                };
            }
            (Err(e), Some(fragment)) => {
                return ScenarioResult::Fail {
                    name,
                    reason: format!("expected error containing {fragment:?}, got: {e}"),
                };
            }
            (Err(e), None) => {
                return ScenarioResult::Error {
                    name,
                    error: e.to_string(),
                };
            }
        };

        let result = outcome.result;
        if let Some(test) = expect.test {
            if test != result.test {
                return ScenarioResult::Fail {
                    name,
                    reason: format!("Test mismatch: expected {test}, selected {}", result.test),
                };
            }
        }

        let verdict = outcome.interpretation.verdict;
        if let Some(expected) = expect.verdict {
            if expected != verdict {
                return ScenarioResult::Fail {
                    name,
                    reason: format!(
                        "Verdict mismatch: expected {expected}, got {verdict} (p={:.4})",
                        result.p_value
                    ),
                };
            }
        }

        ScenarioResult::Pass {
            name,
            details: format!(
                "{} statistic={:.4} p={:.4} ({verdict})",
                result.test, result.statistic, result.p_value
            ),
        }
    }
}
