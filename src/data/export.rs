use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};

use super::error::{PipelineError, Result};
use super::model::{format_float, CellValue, Dataset, FileFormat};

/// Largest integer Excel can hold exactly (it stores every number as a double).
const XLSX_MAX_EXACT_INT: u64 = 1 << 53;

// ---------------------------------------------------------------------------
// ExportBuffer – a finished download
// ---------------------------------------------------------------------------

/// A named byte payload ready to download or archive. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBuffer {
    name: String,
    bytes: Vec<u8>,
    mime: &'static str,
}

impl ExportBuffer {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime: &'static str) -> Self {
        ExportBuffer {
            name: name.into(),
            bytes,
            mime,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Serialize `dataset` as `target`, named after `source_name`.
pub fn export(dataset: &Dataset, source_name: &str, target: FileFormat) -> Result<ExportBuffer> {
    let bytes = match target {
        FileFormat::Csv => write_csv(dataset)?,
        FileFormat::Xlsx => write_xlsx(dataset)?,
    };
    let name = export_name(source_name, target);
    log::info!("exported {name} ({} bytes)", bytes.len());
    Ok(ExportBuffer::new(name, bytes, target.mime_type()))
}

/// `sales.xlsx` → `sales.csv`; a name without extension gets one appended.
pub fn export_name(source_name: &str, target: FileFormat) -> String {
    Path::new(source_name)
        .with_extension(target.extension())
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

fn csv_field(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        CellValue::Float(v) => format_float(*v),
        other => other.to_string(),
    }
}

fn write_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    if dataset.width() == 0 {
        return Ok(Vec::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(dataset.columns().iter().map(|c| c.name.as_str()))
        .map_err(|e| PipelineError::serialization(FileFormat::Csv, e))?;

    for row in 0..dataset.len() {
        let fields = dataset.row(row).into_iter().map(csv_field);
        writer
            .write_record(fields)
            .map_err(|e| PipelineError::serialization(FileFormat::Csv, e))?;
    }

    writer
        .into_inner()
        .map_err(|e| PipelineError::serialization(FileFormat::Csv, e))
}

// ---------------------------------------------------------------------------
// XLSX writer
// ---------------------------------------------------------------------------

fn write_xlsx(dataset: &Dataset) -> Result<Vec<u8>> {
    let err = |e: rust_xlsxwriter::XlsxError| PipelineError::serialization(FileFormat::Xlsx, e);

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1").map_err(err)?;

    for (col_idx, column) in dataset.columns().iter().enumerate() {
        let col = u16::try_from(col_idx).map_err(|_| {
            PipelineError::serialization(FileFormat::Xlsx, "too many columns for a worksheet")
        })?;
        sheet
            .write_string_with_format(0, col, &column.name, &header)
            .map_err(err)?;

        for (row_idx, cell) in column.cells.iter().enumerate() {
            let row = u32::try_from(row_idx + 1).map_err(|_| {
                PipelineError::serialization(FileFormat::Xlsx, "too many rows for a worksheet")
            })?;
            match cell {
                CellValue::Null => {}
                CellValue::Integer(i) => {
                    if i.unsigned_abs() > XLSX_MAX_EXACT_INT {
                        return Err(PipelineError::serialization(
                            FileFormat::Xlsx,
                            format!("integer {i} in column '{}' exceeds Excel precision", column.name),
                        ));
                    }
                    sheet.write_number(row, col, *i as f64).map_err(err)?;
                }
                CellValue::Float(v) => {
                    if !v.is_finite() {
                        return Err(PipelineError::serialization(
                            FileFormat::Xlsx,
                            format!("non-finite number {v} in column '{}'", column.name),
                        ));
                    }
                    sheet.write_number(row, col, *v).map_err(err)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(row, col, *b).map_err(err)?;
                }
                CellValue::Text(s) => {
                    sheet.write_string(row, col, s).map_err(err)?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(err)
}
