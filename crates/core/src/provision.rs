//! Real-provision derivation from the two input files.
//!
//! Each numeric column header is a denomination and each cell a count, so
//! a row's weighted sum is `sum(denomination * count)`. The cumulative sum
//! of `lending - recovery` per row is the real trajectory and its maximum
//! is the provision. The backend runs the same rule; the client uses it to
//! preview inputs before submitting.

use crate::error::CoreError;
use crate::schema::{split_header, CSV_DELIMITER};

/// Compute the weighted sum of every data row in `content`.
///
/// Columns whose header does not parse as a number (dates, interval labels)
/// are ignored, as are empty or non-numeric cells. Blank lines are skipped.
pub fn weighted_row_sums(content: &str) -> Result<Vec<f64>, CoreError> {
    let mut lines = content.lines();
    let header = lines
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| CoreError::Validation("CSV content has no header row".to_string()))?;

    let denominations: Vec<Option<f64>> = split_header(header)
        .iter()
        .map(|col| col.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect();

    if denominations.iter().all(Option::is_none) {
        return Err(CoreError::Validation(
            "CSV header has no numeric denomination columns".to_string(),
        ));
    }

    let sums = lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split(CSV_DELIMITER)
                .zip(&denominations)
                .filter_map(|(cell, denomination)| {
                    let denomination = (*denomination)?;
                    let count = cell.trim().parse::<f64>().ok()?;
                    Some(denomination * count)
                })
                .sum::<f64>()
        })
        .collect();

    Ok(sums)
}

/// Running sum of `lending[i] - recovery[i]` over the common prefix.
pub fn cumulative_difference(lending: &[f64], recovery: &[f64]) -> Vec<f64> {
    lending
        .iter()
        .zip(recovery)
        .scan(0.0, |acc, (l, r)| {
            *acc += l - r;
            Some(*acc)
        })
        .collect()
}

/// Maximum of a cumulative series, `None` when it is empty.
pub fn provision(cumulative: &[f64]) -> Option<f64> {
    cumulative.iter().copied().reduce(f64::max)
}

/// Summary of the real data computed from the two raw files.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProvisionPreview {
    pub rows: usize,
    pub real_cumulative: Vec<f64>,
    pub real_provision: Option<f64>,
}

/// Derive the real cumulative trajectory and provision from both files.
pub fn preview(lending_csv: &str, recovery_csv: &str) -> Result<ProvisionPreview, CoreError> {
    let lending = weighted_row_sums(lending_csv)?;
    let recovery = weighted_row_sums(recovery_csv)?;
    let real_cumulative = cumulative_difference(&lending, &recovery);

    Ok(ProvisionPreview {
        rows: real_cumulative.len(),
        real_provision: provision(&real_cumulative),
        real_cumulative,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
