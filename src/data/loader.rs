use std::collections::HashSet;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use chrono::{NaiveDateTime, Timelike};

use super::error::{PipelineError, Result};
use super::model::{CellValue, Column, ColumnKind, Dataset, FileFormat};

/// Tokens read as a missing cell, the usual NA spellings of tabular tools.
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_TOKENS: &[&str] = &["True", "TRUE", "true"];
const FALSE_TOKENS: &[&str] = &["False", "FALSE", "false"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Decode an uploaded byte stream into a [`Dataset`].
///
/// * `csv`  – comma separated, first row is the header
/// * `xlsx` – first worksheet, first row is the header
pub fn load(bytes: &[u8], format: FileFormat) -> Result<Dataset> {
    match format {
        FileFormat::Csv => load_csv(bytes),
        FileFormat::Xlsx => load_xlsx(bytes),
    }
}

/// Dispatch on the extension of `file_name`, then [`load`].
pub fn load_named(file_name: &str, bytes: &[u8]) -> Result<Dataset> {
    let format = FileFormat::from_file_name(file_name)?;
    load(bytes, format)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(bytes: &[u8]) -> Result<Dataset> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::decode(FileFormat::Csv, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if raw_headers.is_empty() {
        return Err(PipelineError::decode(
            FileFormat::Csv,
            "no columns to parse from file",
        ));
    }
    let headers = normalize_headers(raw_headers);

    let mut tokens: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| PipelineError::decode(FileFormat::Csv, e))?;
        if record.len() > headers.len() {
            return Err(PipelineError::decode(
                FileFormat::Csv,
                format!(
                    "row {}: expected {} fields, saw {}",
                    row_no + 1,
                    headers.len(),
                    record.len()
                ),
            ));
        }
        for (col_idx, column) in tokens.iter_mut().enumerate() {
            // Short rows are padded with missing cells.
            let token = record.get(col_idx).filter(|t| !NA_TOKENS.contains(t));
            column.push(token.map(str::to_string));
        }
    }

    let columns = headers
        .into_iter()
        .zip(tokens)
        .map(|(name, column)| text_column(name, column))
        .collect();
    Dataset::from_columns(columns)
}

/// Guess the column kind from its tokens and convert them.
///
/// Surrounding whitespace is ignored for numbers and booleans; text cells
/// keep their token as written.
fn text_column(name: String, tokens: Vec<Option<String>>) -> Column {
    let present = || tokens.iter().flatten().map(|t| t.trim());
    let is_bool = |t: &str| TRUE_TOKENS.contains(&t) || FALSE_TOKENS.contains(&t);

    let kind = if present().next().is_none() {
        ColumnKind::Float
    } else if present().all(|t| t.parse::<i64>().is_ok()) {
        ColumnKind::Integer
    } else if present().all(|t| t.parse::<f64>().is_ok()) {
        ColumnKind::Float
    } else if present().all(is_bool) {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    };

    let cells = tokens
        .into_iter()
        .map(|token| match token {
            None => CellValue::Null,
            Some(t) => {
                let trimmed = t.trim();
                match kind {
                    ColumnKind::Integer => trimmed.parse().map_or(CellValue::Null, CellValue::Integer),
                    ColumnKind::Float => trimmed.parse().map_or(CellValue::Null, CellValue::Float),
                    ColumnKind::Bool => CellValue::Bool(TRUE_TOKENS.contains(&trimmed)),
                    ColumnKind::Text => CellValue::Text(t),
                }
            }
        })
        .collect();

    Column::new(name, kind, cells)
}

/// Blank names become `Unnamed: {i}`, repeats become `name.1`, `name.2`, ...
fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {i}")
            } else {
                name
            };
            let mut candidate = base.clone();
            let mut suffix = 1;
            while seen.contains(&candidate) {
                candidate = format!("{base}.{suffix}");
                suffix += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

// ---------------------------------------------------------------------------
// XLSX loader
// ---------------------------------------------------------------------------

/// A worksheet cell reduced to what type inference cares about.
#[derive(Debug, Clone)]
enum SheetCell {
    Missing,
    Number(f64),
    Bool(bool),
    Text(String),
}

impl SheetCell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => SheetCell::Missing,
            Data::Int(i) => SheetCell::Number(*i as f64),
            Data::Float(f) => SheetCell::Number(*f),
            Data::Bool(b) => SheetCell::Bool(*b),
            Data::String(s) if NA_TOKENS.contains(&s.as_str()) => SheetCell::Missing,
            Data::String(s) => SheetCell::Text(s.clone()),
            Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
                Some(ts) => SheetCell::Text(format_timestamp(ts)),
                None => SheetCell::Text(data.to_string()),
            },
            Data::DateTimeIso(s) => SheetCell::Text(s.replacen('T', " ", 1)),
            other => SheetCell::Text(other.to_string()),
        }
    }

    fn display(&self) -> String {
        match self {
            SheetCell::Missing => String::new(),
            SheetCell::Number(f) if is_integral(*f) => format!("{}", *f as i64),
            SheetCell::Number(f) => f.to_string(),
            SheetCell::Bool(b) => CellValue::Bool(*b).to_string(),
            SheetCell::Text(s) => s.clone(),
        }
    }
}

/// `2024-01-15`, or `2024-01-15 13:30:00` when there is a time of day.
fn format_timestamp(ts: NaiveDateTime) -> String {
    let pattern = if ts.num_seconds_from_midnight() == 0 {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%d %H:%M:%S"
    };
    ts.format(pattern).to_string()
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < 9.2e18
}

fn load_xlsx(bytes: &[u8]) -> Result<Dataset> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::decode(FileFormat::Xlsx, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::decode(FileFormat::Xlsx, "workbook has no worksheets"))?
        .map_err(|e| PipelineError::decode(FileFormat::Xlsx, e))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Dataset::from_columns(Vec::new());
    };
    let headers = normalize_headers(
        header_row
            .iter()
            .map(|d| SheetCell::from_data(d).display())
            .collect(),
    );

    let mut cells: Vec<Vec<SheetCell>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (col_idx, column) in cells.iter_mut().enumerate() {
            let cell = row
                .get(col_idx)
                .map(SheetCell::from_data)
                .unwrap_or(SheetCell::Missing);
            column.push(cell);
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, column)| sheet_column(name, column))
        .collect();
    Dataset::from_columns(columns)
}

fn sheet_column(name: String, cells: Vec<SheetCell>) -> Column {
    let present = || cells.iter().filter(|c| !matches!(c, SheetCell::Missing));

    let all_numbers = present().all(|c| matches!(c, SheetCell::Number(_)));
    let kind = if present().next().is_none() {
        ColumnKind::Float
    } else if all_numbers
        && present().all(|c| matches!(c, SheetCell::Number(f) if is_integral(*f)))
    {
        ColumnKind::Integer
    } else if all_numbers {
        ColumnKind::Float
    } else if present().all(|c| matches!(c, SheetCell::Bool(_))) {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    };

    let values = cells
        .iter()
        .map(|cell| match (cell, kind) {
            (SheetCell::Missing, _) => CellValue::Null,
            (SheetCell::Number(f), ColumnKind::Integer) => CellValue::Integer(*f as i64),
            (SheetCell::Number(f), ColumnKind::Float) => CellValue::Float(*f),
            (SheetCell::Bool(b), ColumnKind::Bool) => CellValue::Bool(*b),
            (other, _) => CellValue::Text(other.display()),
        })
        .collect();

    Column::new(name, kind, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    #[test]
    fn csv_infers_column_kinds() {
        let ds = load(b"id,price,name,active\n1,2.5,apple,True\n2,3,pear,false\n", FileFormat::Csv)
            .unwrap();
        let kinds: Vec<ColumnKind> = ds.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Float,
                ColumnKind::Text,
                ColumnKind::Bool
            ]
        );
        assert_eq!(ds.column("price").unwrap().cells[1], CellValue::Float(3.0));
        assert_eq!(ds.column("active").unwrap().cells[1], CellValue::Bool(false));
    }

    #[test]
    fn csv_missing_tokens_become_null() {
        let ds = load(b"a,b\n1,NA\n,2\nnan,3\n", FileFormat::Csv).unwrap();
        let a = ds.column("a").unwrap();
        assert_eq!(a.kind, ColumnKind::Integer);
        assert_eq!(a.null_count(), 2);
        assert_eq!(ds.column("b").unwrap().cells[0], CellValue::Null);
    }

    #[test]
    fn csv_numbers_may_be_padded_with_spaces() {
        let ds = load(b"a,b,c,d\n 1, 2.5, x,True \n3,4,y , false\n", FileFormat::Csv).unwrap();
        let kinds: Vec<ColumnKind> = ds.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Float,
                ColumnKind::Text,
                ColumnKind::Bool
            ]
        );
        assert_eq!(ds.column("a").unwrap().cells[0], CellValue::Integer(1));
        assert_eq!(ds.column("b").unwrap().cells[0], CellValue::Float(2.5));
        assert_eq!(ds.column("c").unwrap().cells[0], CellValue::Text(" x".into()));
        assert_eq!(ds.column("d").unwrap().cells[1], CellValue::Bool(false));
    }

    #[test]
    fn csv_all_missing_column_is_float() {
        let ds = load(b"a,b\n1,\n2,\n", FileFormat::Csv).unwrap();
        assert_eq!(ds.column("b").unwrap().kind, ColumnKind::Float);
        assert_eq!(ds.column("b").unwrap().null_count(), 2);
    }

    #[test]
    fn csv_headers_are_normalized() {
        let ds = load(b"a,,a,a\n1,2,3,4\n", FileFormat::Csv).unwrap();
        assert_eq!(ds.column_names(), vec!["a", "Unnamed: 1", "a.1", "a.2"]);
    }

    #[test]
    fn csv_quoted_fields_keep_delimiters_and_newlines() {
        let ds = load(b"name,note\n\"Smith, J\",\"line one\nline two\"\n", FileFormat::Csv).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(
            ds.column("name").unwrap().cells[0],
            CellValue::Text("Smith, J".into())
        );
        assert_eq!(
            ds.column("note").unwrap().cells[0],
            CellValue::Text("line one\nline two".into())
        );
    }

    #[test]
    fn csv_short_rows_are_padded() {
        let ds = load(b"a,b,c\n1,2\n", FileFormat::Csv).unwrap();
        assert_eq!(ds.column("c").unwrap().cells, vec![CellValue::Null]);
    }

    #[test]
    fn csv_long_rows_are_rejected() {
        let err = load(b"a,b\n1,2,3\n", FileFormat::Csv).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { format: FileFormat::Csv, .. }));
    }

    #[test]
    fn csv_empty_input_is_rejected() {
        assert!(matches!(
            load(b"", FileFormat::Csv),
            Err(PipelineError::Decode { .. })
        ));
    }

    #[test]
    fn csv_byte_order_mark_is_ignored() {
        let ds = load(b"\xEF\xBB\xBFa,b\n1,2\n", FileFormat::Csv).unwrap();
        assert_eq!(ds.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn load_named_rejects_unknown_extensions() {
        match load_named("photo.png", b"") {
            Err(PipelineError::UnsupportedFormat(tag)) => assert_eq!(tag, "png"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    fn sample_workbook() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "city").unwrap();
        sheet.write_string(0, 1, "visits").unwrap();
        sheet.write_string(0, 2, "ratio").unwrap();
        sheet.write_string(1, 0, "Lyon").unwrap();
        sheet.write_number(1, 1, 3.0).unwrap();
        sheet.write_number(1, 2, 0.5).unwrap();
        sheet.write_string(2, 0, "Oslo").unwrap();
        sheet.write_number(2, 1, 7.0).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn xlsx_reads_first_sheet_with_header() {
        let ds = load(&sample_workbook(), FileFormat::Xlsx).unwrap();
        assert_eq!(ds.column_names(), vec!["city", "visits", "ratio"]);
        assert_eq!(ds.len(), 2);

        let visits = ds.column("visits").unwrap();
        assert_eq!(visits.kind, ColumnKind::Integer);
        assert_eq!(visits.cells, vec![CellValue::Integer(3), CellValue::Integer(7)]);

        let ratio = ds.column("ratio").unwrap();
        assert_eq!(ratio.kind, ColumnKind::Float);
        assert_eq!(ratio.cells, vec![CellValue::Float(0.5), CellValue::Null]);
    }

    fn workbook_with(build: impl FnOnce(&mut rust_xlsxwriter::Worksheet)) -> Vec<u8> {
        let mut workbook = Workbook::new();
        build(workbook.add_worksheet());
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn xlsx_dates_load_as_iso_text() {
        let bytes = workbook_with(|sheet| {
            let day = Format::new().set_num_format("yyyy-mm-dd");
            let stamp = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
            sheet.write_string(0, 0, "when").unwrap();
            let date = ExcelDateTime::from_ymd(2024, 1, 15).unwrap();
            sheet.write_datetime_with_format(1, 0, &date, &day).unwrap();
            let time = ExcelDateTime::from_ymd(2024, 1, 15)
                .unwrap()
                .and_hms(13, 30, 0)
                .unwrap();
            sheet.write_datetime_with_format(2, 0, &time, &stamp).unwrap();
        });

        let ds = load(&bytes, FileFormat::Xlsx).unwrap();
        let when = ds.column("when").unwrap();
        assert_eq!(when.kind, ColumnKind::Text);
        assert_eq!(
            when.cells,
            vec![
                CellValue::Text("2024-01-15".into()),
                CellValue::Text("2024-01-15 13:30:00".into())
            ]
        );
    }

    #[test]
    fn xlsx_bool_and_mixed_columns() {
        let bytes = workbook_with(|sheet| {
            sheet.write_string(0, 0, "flag").unwrap();
            sheet.write_string(0, 1, "code").unwrap();
            sheet.write_boolean(1, 0, true).unwrap();
            sheet.write_number(1, 1, 7.0).unwrap();
            sheet.write_boolean(2, 0, false).unwrap();
            sheet.write_string(2, 1, "x9").unwrap();
        });

        let ds = load(&bytes, FileFormat::Xlsx).unwrap();
        let flag = ds.column("flag").unwrap();
        assert_eq!(flag.kind, ColumnKind::Bool);
        assert_eq!(flag.cells, vec![CellValue::Bool(true), CellValue::Bool(false)]);

        let code = ds.column("code").unwrap();
        assert_eq!(code.kind, ColumnKind::Text);
        assert_eq!(
            code.cells,
            vec![CellValue::Text("7".into()), CellValue::Text("x9".into())]
        );
    }

    #[test]
    fn xlsx_headers_are_normalized() {
        let bytes = workbook_with(|sheet| {
            sheet.write_string(0, 0, "x").unwrap();
            sheet.write_string(0, 2, "x").unwrap();
            for col in 0..3 {
                sheet.write_number(1, col, 1.0).unwrap();
            }
        });
        let ds = load(&bytes, FileFormat::Xlsx).unwrap();
        assert_eq!(ds.column_names(), vec!["x", "Unnamed: 1", "x.1"]);
    }

    #[test]
    fn xlsx_empty_sheet_is_an_empty_dataset() {
        let ds = load(&workbook_with(|_| {}), FileFormat::Xlsx).unwrap();
        assert_eq!(ds.width(), 0);
        assert!(ds.is_empty());
    }

    #[test]
    fn xlsx_error_cells_are_missing() {
        assert!(matches!(
            SheetCell::from_data(&Data::Error(CellErrorType::Div0)),
            SheetCell::Missing
        ));
        let column = sheet_column(
            "v".into(),
            vec![
                SheetCell::from_data(&Data::Float(2.0)),
                SheetCell::from_data(&Data::Error(CellErrorType::NA)),
            ],
        );
        assert_eq!(column.kind, ColumnKind::Integer);
        assert_eq!(column.cells, vec![CellValue::Integer(2), CellValue::Null]);
    }

    #[test]
    fn xlsx_garbage_is_a_decode_error() {
        assert!(matches!(
            load(b"definitely not a zip", FileFormat::Xlsx),
            Err(PipelineError::Decode { format: FileFormat::Xlsx, .. })
        ));
    }
}
