use thiserror::Error;

use super::model::{CellValue, FileFormat};

/// Everything the pipeline can reject. All of these are per-file: the caller
/// reports the error, skips the file and carries on with the rest.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Value {value} does not occur in column '{column}'")]
    ValueNotInColumn { column: String, value: CellValue },

    #[error("Numeric column '{0}' has no values to take a mean from")]
    EmptyNumericColumn(String),

    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Cannot write {format}: {message}")]
    Serialization { format: FileFormat, message: String },

    #[error("No processed files to archive")]
    EmptyFileSet,

    #[error("Failed to build archive: {0}")]
    Archive(String),

    #[error("Failed to read {format} data: {message}")]
    Decode { format: FileFormat, message: String },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub(crate) fn decode(format: FileFormat, err: impl std::fmt::Display) -> Self {
        PipelineError::Decode {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn serialization(format: FileFormat, err: impl std::fmt::Display) -> Self {
        PipelineError::Serialization {
            format,
            message: err.to_string(),
        }
    }
}
