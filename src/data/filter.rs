use std::collections::HashSet;

use super::error::{PipelineError, Result};
use super::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Filter predicate: one column, one value
// ---------------------------------------------------------------------------

/// Keep the rows whose `column` cell equals `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub column: String,
    pub value: CellValue,
}

impl FilterSpec {
    pub fn new(column: impl Into<String>, value: CellValue) -> Self {
        FilterSpec {
            column: column.into(),
            value,
        }
    }
}

/// Distinct values of a column in first-occurrence order (missing included).
pub fn distinct_values(dataset: &Dataset, column: &str) -> Result<Vec<CellValue>> {
    let col = dataset.column(column)?;
    let mut seen = HashSet::new();
    Ok(col
        .cells
        .iter()
        .filter(|v| seen.insert(*v))
        .cloned()
        .collect())
}

/// Return indices of rows whose cell in `spec.column` equals `spec.value`.
///
/// The value is checked against the column's distinct values first, so a
/// stale or mistyped selection is reported rather than yielding nothing.
pub fn filtered_indices(dataset: &Dataset, spec: &FilterSpec) -> Result<Vec<usize>> {
    let col = dataset.column(&spec.column)?;
    let wanted = spec.value.coerce_to(col.kind);

    if !col.cells.contains(&wanted) {
        return Err(PipelineError::ValueNotInColumn {
            column: spec.column.clone(),
            value: spec.value.clone(),
        });
    }

    Ok(col
        .cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| **cell == wanted)
        .map(|(i, _)| i)
        .collect())
}

/// Rows matching `spec`; every column is kept.
pub fn filter_rows(dataset: &Dataset, spec: &FilterSpec) -> Result<Dataset> {
    let indices = filtered_indices(dataset, spec)?;
    Ok(dataset.take_rows(&indices))
}
