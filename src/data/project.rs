use std::collections::HashSet;

use super::error::{PipelineError, Result};
use super::model::Dataset;

/// Keep exactly `names`, in that order. Rows are untouched; an empty list
/// gives a zero-column dataset with the original row count.
pub fn project<S: AsRef<str>>(dataset: &Dataset, names: &[S]) -> Result<Dataset> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        if !seen.insert(name) {
            return Err(PipelineError::InvalidDataset(format!(
                "column '{name}' selected twice"
            )));
        }
        columns.push(dataset.column(name)?.clone());
    }
    Dataset::with_row_count(columns, dataset.len())
}
