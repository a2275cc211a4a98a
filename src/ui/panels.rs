use anyhow::Context;
use eframe::egui::{self, Color32, ComboBox, RichText, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::config::ShellConfig;
use crate::data::chart::ChartKind;
use crate::data::export::ExportBuffer;
use crate::data::model::{CellValue, Dataset, FileFormat};
use crate::data::summary::ColumnSummary;
use crate::state::{AppState, FileParams, FileSession};
use crate::ui::plot::{self, ChartRequest};

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        ui.label(format!("{} file(s) open", state.sessions.len()));
        ui.separator();

        let ready = !state.processed_files.is_empty();
        if ui
            .add_enabled(ready, egui::Button::new("Download all as ZIP"))
            .clicked()
        {
            download_archive(state);
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File sections (one per opened file)
// ---------------------------------------------------------------------------

enum SectionAction {
    None,
    Changed,
    Download,
    Remove,
}

/// Render every open file, then apply what the widgets asked for.
pub fn file_sections(ui: &mut Ui, state: &mut AppState) {
    if state.sessions.is_empty() {
        ui.label("Open CSV or Excel files (File → Open…, or drop them here) to get started.");
        return;
    }

    let mut changed = Vec::new();
    let mut removed = None;
    let mut save_errors = Vec::new();

    for (index, session) in state.sessions.iter_mut().enumerate() {
        let action = ui
            .push_id(index, |ui: &mut Ui| file_section(ui, session, &state.config))
            .inner;
        match action {
            SectionAction::None => {}
            SectionAction::Changed => changed.push(index),
            SectionAction::Remove => removed = Some(index),
            SectionAction::Download => {
                if let Some(buffer) = &session.export {
                    if let Err(e) = save_buffer(buffer) {
                        log::error!("{e:#}");
                        save_errors.push(format!("Error: {e:#}"));
                    }
                }
            }
        }
        ui.separator();
    }

    for index in changed {
        state.refresh(index);
    }
    if let Some(index) = removed {
        state.close(index);
    }
    if !save_errors.is_empty() {
        state.status_message = Some(save_errors.join("; "));
    }

    if !state.processed_files.is_empty() {
        ui.label(RichText::new("All files processed ✅").color(Color32::DARK_GREEN));
    }
}

fn file_section(ui: &mut Ui, session: &mut FileSession, config: &ShellConfig) -> SectionAction {
    let mut action = SectionAction::None;
    let mut changed = false;

    ui.horizontal(|ui: &mut Ui| {
        ui.heading(&session.name);
        ui.label(format!("File size: {:.2} KB", session.size_kb()));
        if ui.small_button("Remove").clicked() {
            action = SectionAction::Remove;
        }
    });

    egui::CollapsingHeader::new("Preview")
        .id_salt("preview")
        .default_open(true)
        .show(ui, |ui: &mut Ui| preview_table(ui, &session.source, config.preview_rows));

    egui::CollapsingHeader::new("Summary statistics")
        .id_salt("summary")
        .show(ui, |ui: &mut Ui| summary_table(ui, &session.summary));

    // ---- Cleaning ----
    ui.strong("Data cleaning options");
    changed |= cleaning_controls(ui, &mut session.params, &session.name);

    // ---- Filter & columns ----
    ui.strong("Filter rows");
    let columns = session.source.column_names();
    changed |= filter_controls(ui, &mut session.params, &columns, &session.filter_choices);

    ui.strong("Select columns to keep");
    changed |= column_controls(ui, &mut session.params, &columns);

    if let Some(processed) = &session.processed {
        ui.label(format!(
            "{} rows × {} columns after processing",
            processed.len(),
            processed.width()
        ));
    }

    // ---- Visualization ----
    chart_controls(ui, &mut session.params, &session.numeric_columns);
    if session.params.show_chart {
        if let (Some(dataset), Some(column)) =
            (&session.processed, session.params.chart_column.as_deref())
        {
            let request = ChartRequest {
                kind: session.params.chart,
                column,
                other_column: session.params.scatter_column.as_deref(),
                bins: config.histogram_bins,
            };
            plot::chart(ui, &session.name, dataset, &request);
        }
    }

    // ---- Conversion & download ----
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("Convert {} to:", session.name));
        for format in FileFormat::ALL {
            changed |= ui
                .radio_value(&mut session.params.target, format, format.label())
                .changed();
        }
    });
    if let Some(buffer) = &session.export {
        let label = format!("Download {} as {}", buffer.name(), session.params.target.label());
        if ui.button(label).clicked() {
            action = SectionAction::Download;
        }
    }

    if let Some(err) = &session.error {
        ui.label(RichText::new(err).color(Color32::RED));
    }

    match action {
        SectionAction::None if changed => SectionAction::Changed,
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

fn cleaning_controls(ui: &mut Ui, params: &mut FileParams, name: &str) -> bool {
    let mut changed = ui
        .checkbox(&mut params.cleaning, format!("Clean data for {name}"))
        .changed();
    if !params.cleaning {
        return changed;
    }

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Remove duplicates").clicked() && !params.remove_duplicates {
            params.remove_duplicates = true;
            changed = true;
        }
        if ui.button("Fill missing values").clicked() && !params.fill_missing {
            params.fill_missing = true;
            changed = true;
        }
    });
    if params.remove_duplicates {
        ui.label("✅ Duplicates removed!");
    }
    if params.fill_missing {
        ui.label("✅ Missing values have been filled!");
    }
    changed
}

fn filter_controls(
    ui: &mut Ui,
    params: &mut FileParams,
    columns: &[String],
    choices: &[CellValue],
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        let current = params.filter_column.clone();
        ComboBox::from_id_salt("filter_column")
            .selected_text(current.as_deref().unwrap_or("(none)"))
            .show_ui(ui, |ui: &mut Ui| {
                if ui.selectable_label(current.is_none(), "(none)").clicked() {
                    params.filter_column = None;
                    params.filter_value = None;
                    changed = true;
                }
                for col in columns {
                    let is_current = current.as_deref() == Some(col.as_str());
                    if ui.selectable_label(is_current, col).clicked() && !is_current {
                        params.filter_column = Some(col.clone());
                        params.filter_value = None;
                        changed = true;
                    }
                }
            });

        // Value choices are recomputed on refresh, so wait for them.
        if params.filter_column.is_none() || changed {
            return;
        }
        let selected = params
            .filter_value
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        ComboBox::from_id_salt("filter_value")
            .selected_text(selected)
            .show_ui(ui, |ui: &mut Ui| {
                for value in choices {
                    let is_current = params.filter_value.as_ref() == Some(value);
                    if ui.selectable_label(is_current, value.to_string()).clicked() && !is_current {
                        params.filter_value = Some(value.clone());
                        changed = true;
                    }
                }
            });
    });
    changed
}

fn column_controls(ui: &mut Ui, params: &mut FileParams, columns: &[String]) -> bool {
    let mut changed = false;
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for col in columns {
            let mut keep = !params.dropped_columns.contains(col);
            if ui.checkbox(&mut keep, col).changed() {
                if keep {
                    params.dropped_columns.remove(col);
                } else {
                    params.dropped_columns.insert(col.clone());
                }
                changed = true;
            }
        }
    });
    changed
}

/// Chart settings only affect drawing, never the export.
fn chart_controls(ui: &mut Ui, params: &mut FileParams, numeric: &[String]) {
    ui.checkbox(&mut params.show_chart, "Show visualization");
    if !params.show_chart {
        return;
    }
    if numeric.is_empty() {
        ui.label(RichText::new("No numeric columns to chart.").color(Color32::YELLOW));
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        ComboBox::from_id_salt("chart_kind")
            .selected_text(params.chart.label())
            .show_ui(ui, |ui: &mut Ui| {
                for kind in ChartKind::ALL {
                    ui.selectable_value(&mut params.chart, kind, kind.label());
                }
            });
        column_combo(ui, "chart_column", &mut params.chart_column, numeric);
        if params.chart == ChartKind::Scatter {
            ui.label("vs");
            column_combo(ui, "scatter_column", &mut params.scatter_column, numeric);
        }
    });
}

fn column_combo(ui: &mut Ui, id: &str, slot: &mut Option<String>, columns: &[String]) {
    ComboBox::from_id_salt(id)
        .selected_text(slot.clone().unwrap_or_default())
        .show_ui(ui, |ui: &mut Ui| {
            for col in columns {
                if ui
                    .selectable_label(slot.as_deref() == Some(col.as_str()), col)
                    .clicked()
                {
                    *slot = Some(col.clone());
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn preview_table(ui: &mut Ui, dataset: &Dataset, rows: usize) {
    if dataset.width() == 0 {
        ui.label("No columns.");
        return;
    }
    let head = dataset.head(rows);
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .columns(TableColumn::auto().at_least(60.0), head.width())
        .header(2.0 * ROW_HEIGHT + 4.0, |mut header| {
            for column in head.columns() {
                header.col(|ui: &mut Ui| {
                    ui.vertical(|ui: &mut Ui| {
                        ui.strong(&column.name);
                        ui.weak(column.kind.label());
                    });
                });
            }
        })
        .body(|mut body| {
            for index in 0..head.len() {
                body.row(ROW_HEIGHT, |mut row| {
                    for cell in head.row(index) {
                        row.col(|ui: &mut Ui| {
                            ui.label(cell.to_string());
                        });
                    }
                });
            }
        });
}

fn summary_table(ui: &mut Ui, summary: &[ColumnSummary]) {
    let number = |v: Option<f64>| v.map(|x| format!("{x:.3}")).unwrap_or_default();

    egui::Grid::new("summary_grid")
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            for heading in [
                "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max", "unique",
                "top", "freq",
            ] {
                ui.strong(heading);
            }
            ui.end_row();

            for entry in summary {
                ui.label(entry.name());
                match entry {
                    ColumnSummary::Numeric { stats, .. } => {
                        ui.label(stats.count.to_string());
                        for v in [
                            stats.mean,
                            stats.std,
                            stats.min,
                            stats.q25,
                            stats.median,
                            stats.q75,
                            stats.max,
                        ] {
                            ui.label(number(v));
                        }
                        for _ in 0..3 {
                            ui.label("");
                        }
                    }
                    ColumnSummary::Categorical {
                        count, unique, top, ..
                    } => {
                        ui.label(count.to_string());
                        for _ in 0..7 {
                            ui.label("");
                        }
                        ui.label(unique.to_string());
                        match top {
                            Some((value, freq)) => {
                                ui.label(value.to_string());
                                ui.label(freq.to_string());
                            }
                            None => {
                                ui.label("");
                                ui.label("");
                            }
                        }
                    }
                }
                ui.end_row();
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let extensions: Vec<&str> = FileFormat::ALL.iter().map(|f| f.extension()).collect();
    let files = rfd::FileDialog::new()
        .set_title("Upload your files (CSV or Excel)")
        .add_filter("Supported files", extensions.as_slice())
        .add_filter("CSV", &["csv"])
        .add_filter("Excel", &["xlsx"])
        .pick_files();

    if let Some(paths) = files {
        state.open_files(&paths);
    }
}

fn download_archive(state: &mut AppState) {
    let result = state
        .archive()
        .context("building archive")
        .and_then(|buffer| save_buffer(&buffer));
    if let Err(e) = result {
        log::error!("{e:#}");
        state.status_message = Some(format!("Error: {e:#}"));
    }
}

/// Ask where to save `buffer` and write it there. Cancelling is not an error.
fn save_buffer(buffer: &ExportBuffer) -> anyhow::Result<()> {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Save processed file")
        .set_file_name(buffer.name())
        .save_file()
    else {
        return Ok(());
    };
    std::fs::write(&path, buffer.bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!(
        "saved {} ({} bytes, {})",
        path.display(),
        buffer.bytes().len(),
        buffer.mime()
    );
    Ok(())
}
