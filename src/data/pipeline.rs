use super::clean::{fill_missing_numeric, remove_duplicates, EmptyColumnPolicy};
use super::error::Result;
use super::filter::{filter_rows, FilterSpec};
use super::model::Dataset;
use super::project::project;

// ---------------------------------------------------------------------------
// Per-file request
// ---------------------------------------------------------------------------

/// Everything the user chose for one file's data. Stages run in a fixed
/// order: duplicates, fill, filter, projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingOptions {
    pub remove_duplicates: bool,
    pub fill_missing: bool,
    pub empty_columns: EmptyColumnPolicy,
    pub filter: Option<FilterSpec>,
    /// `None` keeps every column.
    pub columns: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Run the cleaning, filter and projection stages.
pub fn apply(dataset: &Dataset, options: &ProcessingOptions) -> Result<Dataset> {
    let mut current = dataset.clone();
    if options.remove_duplicates {
        current = remove_duplicates(&current);
    }
    if options.fill_missing {
        current = fill_missing_numeric(&current, options.empty_columns)?;
    }
    if let Some(spec) = &options.filter {
        current = filter_rows(&current, spec)?;
    }
    if let Some(columns) = &options.columns {
        current = project(&current, columns)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::PipelineError;
    use crate::data::export::export;
    use crate::data::loader::load;
    use crate::data::model::{CellValue, FileFormat};

    fn scores() -> Dataset {
        load(b"team,score\nred,1\nred,1\nblue,5\nred,\n", FileFormat::Csv).unwrap()
    }

    #[test]
    fn stages_run_in_order() {
        let options = ProcessingOptions {
            remove_duplicates: true,
            fill_missing: true,
            filter: Some(FilterSpec::new("team", CellValue::Text("red".into()))),
            columns: Some(vec!["score".into()]),
            ..Default::default()
        };

        let processed = apply(&scores(), &options).unwrap();
        let buffer = export(&processed, "scores.csv", FileFormat::Csv).unwrap();
        assert_eq!(buffer.name(), "scores.csv");
        let out = load(buffer.bytes(), FileFormat::Csv).unwrap();
        assert_eq!(out.column_names(), vec!["score"]);
        // Mean of {1, 5} after dedup fills the gap: 3.0.
        assert_eq!(
            out.column("score").unwrap().cells,
            vec![CellValue::Float(1.0), CellValue::Float(3.0)]
        );
    }

    #[test]
    fn default_options_pass_data_through() {
        let ds = load(b"a,b\n1,x\n1,x\n", FileFormat::Csv).unwrap();
        assert_eq!(apply(&ds, &ProcessingOptions::default()).unwrap(), ds);
    }

    #[test]
    fn failing_stage_stops_the_file() {
        let options = ProcessingOptions {
            columns: Some(vec!["points".into()]),
            ..Default::default()
        };
        assert!(matches!(
            apply(&scores(), &options),
            Err(PipelineError::ColumnNotFound(c)) if c == "points"
        ));

        let options = ProcessingOptions {
            filter: Some(FilterSpec::new("team", CellValue::Text("green".into()))),
            ..Default::default()
        };
        assert!(matches!(
            apply(&scores(), &options),
            Err(PipelineError::ValueNotInColumn { .. })
        ));
    }

    #[test]
    fn reject_policy_surfaces_empty_columns() {
        let ds = load(b"a,b\n1,\n2,\n", FileFormat::Csv).unwrap();
        let options = ProcessingOptions {
            fill_missing: true,
            empty_columns: EmptyColumnPolicy::Reject,
            ..Default::default()
        };
        assert!(matches!(
            apply(&ds, &options),
            Err(PipelineError::EmptyNumericColumn(c)) if c == "b"
        ));
    }
}
