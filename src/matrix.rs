//! Numeric data matrix with one column per group.
//!
//! Raw input may be ragged. Columns are right-padded with missing cells to the
//! longest group, then every row holding a missing cell is dropped, so the
//! resulting table is rectangular and fully finite.

use serde::Serialize;
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// A named group of observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Rectangular, read-only numeric table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataMatrix {
    columns: Vec<Column>,
    rows: usize,
}

impl DataMatrix {
    /// Builds a matrix from ragged columns of optional cells.
    ///
    /// `None` and `NaN` cells count as missing. Infinite values are rejected.
    pub fn from_cells<S: Into<String>>(raw: Vec<(S, Vec<Option<f64>>)>) -> Result<Self> {
        if raw.is_empty() {
            return Err(AnalysisError::NoColumns);
        }

        let raw: Vec<(String, Vec<Option<f64>>)> =
            raw.into_iter().map(|(name, cells)| (name.into(), cells)).collect();

        for (name, cells) in &raw {
            if let Some(row) = cells.iter().position(|c| c.is_some_and(f64::is_infinite)) {
                return Err(AnalysisError::NonNumericInput {
                    column: name.clone(),
                    row: row + 1,
                    token: "inf".to_string(),
                });
            }
        }

        let padded_len = raw.iter().map(|(_, cells)| cells.len()).max().unwrap_or(0);

        let complete_rows: Vec<usize> = (0..padded_len)
            .filter(|&row| raw.iter().all(|(_, cells)| cell(cells, row).is_some()))
            .collect();

        if complete_rows.is_empty() {
            return Err(AnalysisError::insufficient("complete rows", 1, 0));
        }

        let columns: Vec<Column> = raw
            .iter()
            .map(|(name, cells)| Column {
                name: name.clone(),
                values: complete_rows
                    .iter()
                    .filter_map(|&row| cell(cells, row))
                    .collect(),
            })
            .collect();

        debug!(
            columns = columns.len(),
            rows = complete_rows.len(),
            dropped = padded_len - complete_rows.len(),
            "built data matrix"
        );

        Ok(Self {
            rows: complete_rows.len(),
            columns,
        })
    }

    /// Builds a matrix from fully numeric columns. Ragged lengths are aligned.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self> {
        Self::from_cells(
            columns
                .into_iter()
                .map(|(name, values)| (name, values.into_iter().map(Some).collect()))
                .collect(),
        )
    }

    /// Parses manual entry: one comma-separated string per group.
    ///
    /// Groups are named `Group 1`, `Group 2`, ... by input position. Blank
    /// entries are skipped.
    pub fn from_manual_entry<S: AsRef<str>>(groups: &[S]) -> Result<Self> {
        let mut raw = Vec::new();

        for (index, entry) in groups.iter().enumerate() {
            let entry = entry.as_ref();
            if entry.trim().is_empty() {
                continue;
            }

            let name = format!("Group {}", index + 1);
            let values = entry
                .split(',')
                .enumerate()
                .map(|(row, token)| parse_number(token.trim(), &name, row + 1).map(Some))
                .collect::<Result<Vec<_>>>()?;
            raw.push((name, values));
        }

        Self::from_cells(raw)
    }

    /// Parses delimited text (one observation row per line).
    ///
    /// Empty cells are missing values. A first line without any numeric cell
    /// is taken as a header; otherwise columns are named `Group 1..n`.
    pub fn from_delimited(text: &str, delimiter: char) -> Result<Self> {
        let mut lines: Vec<Vec<&str>> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split(delimiter).map(str::trim).collect())
            .collect();

        if lines.is_empty() {
            return Err(AnalysisError::NoColumns);
        }

        let header: Option<Vec<String>> = if is_header(&lines[0]) {
            Some(lines.remove(0).into_iter().map(str::to_string).collect())
        } else {
            None
        };

        let width = lines
            .iter()
            .map(Vec::len)
            .chain(header.as_ref().map(Vec::len))
            .max()
            .unwrap_or(0);

        let names: Vec<String> = (0..width)
            .map(|i| {
                header
                    .as_ref()
                    .and_then(|h| h.get(i))
                    .filter(|n| !n.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("Group {}", i + 1))
            })
            .collect();

        let mut raw: Vec<(String, Vec<Option<f64>>)> = names
            .into_iter()
            .map(|name| (name, Vec::with_capacity(lines.len())))
            .collect();

        for (row, line) in lines.iter().enumerate() {
            for (col, (name, cells)) in raw.iter_mut().enumerate() {
                let value = match line.get(col) {
                    Some(token) if !token.is_empty() => Some(parse_number(token, name, row + 1)?),
                    _ => None,
                };
                cells.push(value);
            }
        }

        // Trailing delimiters produce columns with no data at all.
        raw.retain(|(_, cells)| cells.iter().any(Option::is_some));

        Self::from_cells(raw)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub const fn row_count(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Values of column `index`, if present.
    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(|c| c.values.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// All columns as slices, in order.
    pub fn samples(&self) -> Vec<&[f64]> {
        self.columns.iter().map(|c| c.values.as_slice()).collect()
    }
}

/// Value at `row`, treating out-of-range and `NaN` cells as missing.
fn cell(cells: &[Option<f64>], row: usize) -> Option<f64> {
    cells.get(row).copied().flatten().filter(|v| !v.is_nan())
}

fn is_header(cells: &[&str]) -> bool {
    cells.iter().any(|c| !c.is_empty()) && cells.iter().all(|c| c.parse::<f64>().is_err())
}

fn parse_number(token: &str, column: &str, row: usize) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| AnalysisError::NonNumericInput {
            column: column.to_string(),
            row,
            token: token.to_string(),
        })
}
