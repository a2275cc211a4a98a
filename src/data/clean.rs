use std::collections::HashSet;

use super::error::{PipelineError, Result};
use super::model::{CellValue, Column, ColumnKind, Dataset};

/// What to do with a numeric column that has no values at all when filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyColumnPolicy {
    /// Leave the column missing and move on.
    #[default]
    Skip,
    /// Fail with [`PipelineError::EmptyNumericColumn`].
    Reject,
}

/// Drop rows equal (across every column) to an earlier row.
pub fn remove_duplicates(dataset: &Dataset) -> Dataset {
    let mut seen: HashSet<Vec<&CellValue>> = HashSet::with_capacity(dataset.len());
    let keep: Vec<usize> = (0..dataset.len())
        .filter(|&i| seen.insert(dataset.row(i)))
        .collect();

    if keep.len() < dataset.len() {
        log::debug!("removed {} duplicate rows", dataset.len() - keep.len());
    }
    dataset.take_rows(&keep)
}

/// Replace missing cells of every numeric column with that column's mean.
///
/// Means are taken before anything is replaced. Integer columns that receive
/// a fill become float columns.
pub fn fill_missing_numeric(dataset: &Dataset, policy: EmptyColumnPolicy) -> Result<Dataset> {
    let mut columns = Vec::with_capacity(dataset.width());

    for col in dataset.columns() {
        if !col.kind.is_numeric() || col.null_count() == 0 {
            columns.push(col.clone());
            continue;
        }

        let Some(mean) = column_mean(col) else {
            match policy {
                EmptyColumnPolicy::Skip => {
                    log::warn!("column '{}' has no values, left unfilled", col.name);
                    columns.push(col.clone());
                    continue;
                }
                EmptyColumnPolicy::Reject => {
                    return Err(PipelineError::EmptyNumericColumn(col.name.clone()));
                }
            }
        };

        let cells = col
            .cells
            .iter()
            .map(|cell| match cell.as_f64() {
                Some(v) => CellValue::Float(v),
                None => CellValue::Float(mean),
            })
            .collect();
        columns.push(Column::new(col.name.clone(), ColumnKind::Float, cells));
    }

    Dataset::with_row_count(columns, dataset.len())
}

/// Mean of the non-missing cells, `None` when there are none.
pub fn column_mean(col: &Column) -> Option<f64> {
    let values: Vec<f64> = col.cells.iter().filter_map(CellValue::as_f64).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
