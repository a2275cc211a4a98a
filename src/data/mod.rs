/// Data layer: the file-processing pipeline and its supporting analyses.
///
/// Architecture:
/// ```text
///  .csv / .xlsx bytes ──► loader ──► Dataset (column kinds fixed here)
///                                      │
///      ┌───────────────────────────────┘
///      ▼
///   clean ──► filter ──► project ──► export ──► archive
///   dedup,    one col    ordered     csv/xlsx    ZIP of every
///   mean-fill == value   columns     buffer      buffer
/// ```
///
/// `pipeline::apply` runs the middle three stages in that order.
/// `summary` and `chart` read a dataset at any stage for display.

pub mod archive;
pub mod chart;
pub mod clean;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod project;
pub mod summary;
