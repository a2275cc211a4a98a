use std::collections::HashMap;

use super::model::{CellValue, Column, Dataset};

/// Descriptive statistics for one column, shown next to the preview.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSummary {
    Numeric {
        name: String,
        stats: NumericStats,
    },
    Categorical {
        name: String,
        count: usize,
        unique: usize,
        /// Most frequent value and its frequency.
        top: Option<(CellValue, usize)>,
    },
}

impl ColumnSummary {
    pub fn name(&self) -> &str {
        match self {
            ColumnSummary::Numeric { name, .. } | ColumnSummary::Categorical { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericStats {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1).
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Summaries for every column, in column order.
pub fn summarize(dataset: &Dataset) -> Vec<ColumnSummary> {
    dataset.columns().iter().map(summarize_column).collect()
}

pub fn summarize_column(column: &Column) -> ColumnSummary {
    if column.kind.is_numeric() {
        let values: Vec<f64> = column.cells.iter().filter_map(CellValue::as_f64).collect();
        ColumnSummary::Numeric {
            name: column.name.clone(),
            stats: numeric_stats(&values),
        }
    } else {
        categorical(column)
    }
}

pub fn numeric_stats(values: &[f64]) -> NumericStats {
    let count = values.len();
    if count == 0 {
        return NumericStats::default();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    NumericStats {
        count,
        mean: Some(mean),
        std,
        min: sorted.first().copied(),
        q25: Some(quantile(&sorted, 0.25)),
        median: Some(quantile(&sorted, 0.5)),
        q75: Some(quantile(&sorted, 0.75)),
        max: sorted.last().copied(),
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn categorical(column: &Column) -> ColumnSummary {
    let mut counts: HashMap<&CellValue, (usize, usize)> = HashMap::new();
    for (pos, cell) in column.cells.iter().enumerate().filter(|(_, c)| !c.is_null()) {
        counts.entry(cell).or_insert((0, pos)).0 += 1;
    }

    // Highest count wins, earliest first appearance breaks ties.
    let top = counts
        .iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(value, (n, _))| ((*value).clone(), *n));

    ColumnSummary::Categorical {
        name: column.name.clone(),
        count: column.cells.len() - column.null_count(),
        unique: counts.len(),
        top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load;
    use crate::data::model::FileFormat;

    #[test]
    fn numeric_summary_matches_describe() {
        let stats = numeric_stats(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, Some(2.5));
        assert!((stats.std.unwrap() - 1.290_994_448_735_805_6).abs() < 1e-12);
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.q25, Some(1.75));
        assert_eq!(stats.median, Some(2.5));
        assert_eq!(stats.q75, Some(3.25));
        assert_eq!(stats.max, Some(4.0));
    }

    #[test]
    fn single_value_has_no_std() {
        let stats = numeric_stats(&[7.0]);
        assert_eq!(stats.std, None);
        assert_eq!(stats.median, Some(7.0));
    }

    #[test]
    fn summaries_skip_missing_cells() {
        let ds = load(b"v,city\n1,Oslo\n,Lyon\n3,Oslo\n4,\n", FileFormat::Csv).unwrap();
        let summaries = summarize(&ds);
        let names: Vec<&str> = summaries.iter().map(ColumnSummary::name).collect();
        assert_eq!(names, vec!["v", "city"]);

        match &summaries[0] {
            ColumnSummary::Numeric { name, stats } => {
                assert_eq!(name, "v");
                assert_eq!(stats.count, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(
            summaries[1],
            ColumnSummary::Categorical {
                name: "city".into(),
                count: 3,
                unique: 2,
                top: Some((CellValue::Text("Oslo".into()), 2)),
            }
        );
    }
}
