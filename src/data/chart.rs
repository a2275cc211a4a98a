use std::collections::HashMap;

use super::error::{PipelineError, Result};
use super::model::{CellValue, Column, Dataset};

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Histogram,
    Scatter,
    Pie,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Histogram,
        ChartKind::Scatter,
        ChartKind::Pie,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Chart",
            ChartKind::Line => "Line Chart",
            ChartKind::Histogram => "Histogram",
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Pie => "Pie Chart",
        }
    }
}

/// One histogram bin, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl Bin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Names of the numeric columns, the only ones that can be charted.
pub fn numeric_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns()
        .iter()
        .filter(|c| c.kind.is_numeric())
        .map(|c| c.name.clone())
        .collect()
}

fn numeric_column<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column> {
    let col = dataset.column(name)?;
    if !col.kind.is_numeric() {
        return Err(PipelineError::NotNumeric(name.to_string()));
    }
    Ok(col)
}

/// `(row index, value)` for every present cell of a numeric column.
pub fn series(dataset: &Dataset, column: &str) -> Result<Vec<[f64; 2]>> {
    let col = numeric_column(dataset, column)?;
    Ok(col
        .cells
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.as_f64().map(|v| [i as f64, v]))
        .collect())
}

/// `(x, y)` for rows where both cells are present.
pub fn scatter(dataset: &Dataset, x: &str, y: &str) -> Result<Vec<[f64; 2]>> {
    let xs = numeric_column(dataset, x)?;
    let ys = numeric_column(dataset, y)?;
    Ok(xs
        .cells
        .iter()
        .zip(&ys.cells)
        .filter_map(|(a, b)| Some([a.as_f64()?, b.as_f64()?]))
        .collect())
}

/// Equal-width bins spanning `[min, max]`.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.abs() < f64::EPSILON {
        return vec![Bin {
            start: min - 0.5,
            end: max + 0.5,
            count: finite.len(),
        }];
    }

    let width = range / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            start: min + width * i as f64,
            end: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for v in finite {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Present values with their counts, most frequent first; ties keep the
/// order in which values first appear.
pub fn value_counts(dataset: &Dataset, column: &str) -> Result<Vec<(CellValue, usize)>> {
    let col = dataset.column(column)?;
    let mut order: Vec<&CellValue> = Vec::new();
    let mut counts: HashMap<&CellValue, usize> = HashMap::new();
    for cell in col.cells.iter().filter(|c| !c.is_null()) {
        let n = counts.entry(cell).or_insert(0);
        if *n == 0 {
            order.push(cell);
        }
        *n += 1;
    }

    let mut out: Vec<(CellValue, usize)> = order
        .into_iter()
        .map(|v| (v.clone(), counts[v]))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(out)
}

/// Pie slice label, e.g. `33.3%`.
pub fn percent_label(count: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", count as f64 * 100.0 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load;
    use crate::data::model::FileFormat;

    fn sample() -> Dataset {
        load(
            b"x,y,label\n1,10,a\n2,,b\n3,30,a\n,40,c\n",
            FileFormat::Csv,
        )
        .unwrap()
    }

    #[test]
    fn numeric_columns_exclude_text() {
        assert_eq!(numeric_columns(&sample()), vec!["x", "y"]);
    }

    #[test]
    fn series_skips_missing_and_keeps_row_positions() {
        let pts = series(&sample(), "y").unwrap();
        assert_eq!(pts, vec![[0.0, 10.0], [2.0, 30.0], [3.0, 40.0]]);
        assert!(matches!(
            series(&sample(), "label"),
            Err(PipelineError::NotNumeric(_))
        ));
    }

    #[test]
    fn scatter_needs_both_coordinates() {
        let pts = scatter(&sample(), "x", "y").unwrap();
        assert_eq!(pts, vec![[1.0, 10.0], [3.0, 30.0]]);
    }

    #[test]
    fn histogram_counts_every_value_once() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let bins = histogram(&values, DEFAULT_HISTOGRAM_BINS);
        assert_eq!(bins.len(), 20);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 100);
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[19].end, 99.0);
        // The maximum lands in the last (closed) bin.
        assert_eq!(bins[19].count, 5);
    }

    #[test]
    fn histogram_of_constant_series_is_one_bin() {
        let bins = histogram(&[4.0, 4.0, 4.0], 20);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
        assert!(histogram(&[], 20).is_empty());
    }

    #[test]
    fn value_counts_order_by_frequency_then_appearance() {
        let counts = value_counts(&sample(), "label").unwrap();
        assert_eq!(
            counts,
            vec![
                (CellValue::Text("a".into()), 2),
                (CellValue::Text("b".into()), 1),
                (CellValue::Text("c".into()), 1),
            ]
        );
        assert_eq!(percent_label(1, 3), "33.3%");
    }
}
