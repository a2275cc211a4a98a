use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::ShellConfig;
use crate::data::archive::{archive, ProcessedFileSet};
use crate::data::chart::{numeric_columns, ChartKind};
use crate::data::export::{export, ExportBuffer};
use crate::data::filter::{distinct_values, FilterSpec};
use crate::data::loader::load_named;
use crate::data::model::{CellValue, Dataset, FileFormat};
use crate::data::pipeline::{apply, ProcessingOptions};
use crate::data::summary::{summarize, ColumnSummary};

// ---------------------------------------------------------------------------
// Per-file parameters (what the widgets for one file currently say)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FileParams {
    /// "Clean data" checkbox; the two cleaning actions only apply while set.
    pub cleaning: bool,
    pub remove_duplicates: bool,
    pub fill_missing: bool,
    pub filter_column: Option<String>,
    pub filter_value: Option<CellValue>,
    /// Columns the user unticked.
    pub dropped_columns: BTreeSet<String>,
    pub show_chart: bool,
    pub chart: ChartKind,
    pub chart_column: Option<String>,
    pub scatter_column: Option<String>,
    pub target: FileFormat,
}

impl Default for FileParams {
    fn default() -> Self {
        Self {
            cleaning: false,
            remove_duplicates: false,
            fill_missing: false,
            filter_column: None,
            filter_value: None,
            dropped_columns: BTreeSet::new(),
            show_chart: false,
            chart: ChartKind::default(),
            chart_column: None,
            scatter_column: None,
            target: FileFormat::Csv,
        }
    }
}

impl FileParams {
    fn cleaning_options(&self) -> ProcessingOptions {
        ProcessingOptions {
            remove_duplicates: self.cleaning && self.remove_duplicates,
            fill_missing: self.cleaning && self.fill_missing,
            ..Default::default()
        }
    }

    fn selection_options(&self, columns: &[String]) -> ProcessingOptions {
        let filter = match (&self.filter_column, &self.filter_value) {
            (Some(column), Some(value)) => Some(FilterSpec::new(column.clone(), value.clone())),
            _ => None,
        };
        let kept = columns
            .iter()
            .filter(|c| !self.dropped_columns.contains(*c))
            .cloned()
            .collect();
        ProcessingOptions {
            filter,
            columns: Some(kept),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// One opened file
// ---------------------------------------------------------------------------

pub struct FileSession {
    pub name: String,
    pub size_bytes: usize,
    /// Dataset exactly as loaded.
    pub source: Dataset,
    pub summary: Vec<ColumnSummary>,
    pub params: FileParams,

    /// Choices offered by the filter-value selector (after cleaning).
    pub filter_choices: Vec<CellValue>,
    /// Result of cleaning, filter and projection.
    pub processed: Option<Dataset>,
    pub numeric_columns: Vec<String>,
    pub export: Option<ExportBuffer>,
    pub error: Option<String>,
}

impl FileSession {
    pub fn new(name: String, size_bytes: usize, source: Dataset) -> Self {
        let summary = summarize(&source);
        let mut session = Self {
            name,
            size_bytes,
            source,
            summary,
            params: FileParams::default(),
            filter_choices: Vec::new(),
            processed: None,
            numeric_columns: Vec::new(),
            export: None,
            error: None,
        };
        session.refresh();
        session
    }

    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }

    /// Re-run the pipeline with the current parameters.
    pub fn refresh(&mut self) {
        log::debug!("recomputing {}", self.name);
        self.error = None;
        if let Err(e) = self.run_pipeline() {
            log::warn!("{}: {e}", self.name);
            self.error = Some(e.to_string());
            self.processed = None;
            self.export = None;
        }
    }

    fn run_pipeline(&mut self) -> crate::data::error::Result<()> {
        let cleaned = apply(&self.source, &self.params.cleaning_options())?;

        // Keep the filter selection valid for the cleaned data.
        self.filter_choices = match &self.params.filter_column {
            Some(column) => distinct_values(&cleaned, column)?,
            None => Vec::new(),
        };
        let value_still_offered = self
            .params
            .filter_value
            .as_ref()
            .is_some_and(|v| self.filter_choices.contains(v));
        if !value_still_offered {
            self.params.filter_value = self.filter_choices.first().cloned();
        }

        let selected = apply(
            &cleaned,
            &self.params.selection_options(&cleaned.column_names()),
        )?;

        self.numeric_columns = numeric_columns(&selected);
        for slot in [&mut self.params.chart_column, &mut self.params.scatter_column] {
            if !slot.as_ref().is_some_and(|c| self.numeric_columns.contains(c)) {
                *slot = self.numeric_columns.first().cloned();
            }
        }

        self.export = Some(export(&selected, &self.name, self.params.target)?);
        self.processed = Some(selected);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: ShellConfig,

    /// One session per opened file, in the order they were opened.
    pub sessions: Vec<FileSession>,

    /// Exports of every session, rebuilt whenever one changes.
    pub processed_files: ProcessedFileSet,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            sessions: Vec::new(),
            processed_files: ProcessedFileSet::new(),
            status_message: None,
        }
    }

    /// Read and load each path; files that fail are reported and skipped.
    pub fn open_files(&mut self, paths: &[std::path::PathBuf]) {
        let mut errors = Vec::new();
        for path in paths {
            if let Err(e) = self.open_file(path) {
                log::error!("{e:#}");
                errors.push(format!("{e:#}"));
            }
        }
        self.status_message = (!errors.is_empty()).then(|| errors.join("; "));
        self.rebuild_processed();
    }

    fn open_file(&mut self, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("file name is not valid UTF-8")?
            .to_string();
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        self.add_file(name, &bytes)
    }

    /// Load an uploaded file and start a session for it.
    pub fn add_file(&mut self, name: String, bytes: &[u8]) -> Result<()> {
        let dataset = load_named(&name, bytes).with_context(|| format!("loading {name}"))?;
        log::info!(
            "Loaded {name}: {} rows with columns {:?}",
            dataset.len(),
            dataset.column_names()
        );
        self.sessions.push(FileSession::new(name, bytes.len(), dataset));
        Ok(())
    }

    pub fn close(&mut self, index: usize) {
        if index < self.sessions.len() {
            let session = self.sessions.remove(index);
            log::info!("closed {}", session.name);
            self.rebuild_processed();
        }
    }

    /// Recompute one session after its parameters changed.
    pub fn refresh(&mut self, index: usize) {
        if let Some(session) = self.sessions.get_mut(index) {
            session.refresh();
            self.rebuild_processed();
        }
    }

    fn rebuild_processed(&mut self) {
        let mut files = ProcessedFileSet::new();
        for buffer in self.sessions.iter().filter_map(|s| s.export.clone()) {
            files.insert(buffer);
        }
        self.processed_files = files;
    }

    pub fn archive(&self) -> crate::data::error::Result<ExportBuffer> {
        archive(&self.processed_files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(files: &[(&str, &str)]) -> AppState {
        let mut state = AppState::new(ShellConfig::default());
        for (name, body) in files {
            state.add_file(name.to_string(), body.as_bytes()).unwrap();
        }
        state.rebuild_processed();
        state
    }

    #[test]
    fn each_file_gets_an_export() {
        let state = state_with(&[("a.csv", "x\n1\n"), ("b.csv", "y\n2\n")]);
        let names: Vec<&str> = state.processed_files.iter().map(ExportBuffer::name).collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        assert!(state.archive().is_ok());
    }

    #[test]
    fn unsupported_upload_is_rejected() {
        let mut state = AppState::new(ShellConfig::default());
        assert!(state.add_file("notes.txt".into(), b"hi").is_err());
        assert!(state.sessions.is_empty());
    }

    #[test]
    fn a_bad_file_does_not_stop_the_others() {
        let dir = std::env::temp_dir().join(format!("sweeper_open_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let good = dir.join("good.csv");
        let bad = dir.join("notes.txt");
        let later = dir.join("later.csv");
        std::fs::write(&good, "a\n1\n").unwrap();
        std::fs::write(&bad, "hello").unwrap();
        std::fs::write(&later, "b\n2\n").unwrap();

        let mut state = AppState::new(ShellConfig::default());
        state.open_files(&[good, bad, later, dir.join("missing.csv")]);
        std::fs::remove_dir_all(&dir).unwrap();

        let names: Vec<&str> = state.sessions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["good.csv", "later.csv"]);
        assert_eq!(state.processed_files.len(), 2);
        let status = state.status_message.unwrap();
        assert!(status.contains("notes.txt"));
        assert!(status.contains("missing.csv"));
    }

    #[test]
    fn choosing_a_filter_column_selects_its_first_value() {
        let mut state = state_with(&[("t.csv", "k,v\nb,1\na,2\nb,3\n")]);
        state.sessions[0].params.filter_column = Some("k".into());
        state.refresh(0);

        let session = &state.sessions[0];
        assert_eq!(session.params.filter_value, Some(CellValue::Text("b".into())));
        assert_eq!(session.processed.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn cleaning_actions_need_the_cleaning_toggle() {
        let mut state = state_with(&[("d.csv", "k\n1\n1\n")]);
        state.sessions[0].params.remove_duplicates = true;
        state.refresh(0);
        assert_eq!(state.sessions[0].processed.as_ref().unwrap().len(), 2);

        state.sessions[0].params.cleaning = true;
        state.refresh(0);
        assert_eq!(state.sessions[0].processed.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn default_params_ask_for_no_processing() {
        let params = FileParams::default();
        assert_eq!(params.cleaning_options(), ProcessingOptions::default());

        let columns = vec!["a".to_string(), "b".to_string()];
        let selection = params.selection_options(&columns);
        assert_eq!(selection.filter, None);
        assert_eq!(selection.columns, Some(columns));
        assert!(!selection.remove_duplicates && !selection.fill_missing);
    }

    #[test]
    fn switching_target_replaces_the_export() {
        let mut state = state_with(&[("d.csv", "k\n1\n")]);
        state.sessions[0].params.target = FileFormat::Xlsx;
        state.refresh(0);
        let names: Vec<&str> = state.processed_files.iter().map(ExportBuffer::name).collect();
        assert_eq!(names, vec!["d.xlsx"]);
    }

    #[test]
    fn closing_the_last_session_empties_the_archive() {
        let mut state = state_with(&[("d.csv", "k,v\n1,\n")]);
        state.sessions[0].params.cleaning = true;
        state.sessions[0].params.fill_missing = true;
        state.refresh(0);
        // Skip policy: an all-missing column is left alone, not an error.
        assert!(state.sessions[0].error.is_none());

        state.close(0);
        assert!(state.processed_files.is_empty());
        assert!(state.archive().is_err());
    }
}
