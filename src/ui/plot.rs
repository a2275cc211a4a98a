use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::{self, Align2, Color32, FontId, RichText, Sense, Shape, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

use crate::color::{slice_palette, SERIES_COLOR};
use crate::data::chart::{histogram, percent_label, scatter, series, value_counts, ChartKind};
use crate::data::error::Result;
use crate::data::model::{CellValue, Dataset};

const PLOT_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Chart for one file (inside its section)
// ---------------------------------------------------------------------------

pub struct ChartRequest<'a> {
    pub kind: ChartKind,
    pub column: &'a str,
    /// Second axis, scatter plots only.
    pub other_column: Option<&'a str>,
    pub bins: usize,
}

/// Render the chosen chart; data errors are shown in place of the plot.
pub fn chart(ui: &mut Ui, id: &str, dataset: &Dataset, request: &ChartRequest<'_>) {
    if let Err(e) = draw_chart(ui, id, dataset, request) {
        ui.label(RichText::new(format!("Cannot draw chart: {e}")).color(Color32::RED));
    }
}

fn draw_chart(ui: &mut Ui, id: &str, dataset: &Dataset, request: &ChartRequest<'_>) -> Result<()> {
    let column = request.column;
    let base_plot = |x_label: &str, y_label: &str| {
        Plot::new(format!("chart_{id}"))
            .legend(Legend::default())
            .x_axis_label(x_label.to_string())
            .y_axis_label(y_label.to_string())
            .height(PLOT_HEIGHT)
            .allow_scroll(false)
    };

    match request.kind {
        ChartKind::Bar => {
            let bars: Vec<Bar> = series(dataset, column)?
                .into_iter()
                .map(|[row, value]| Bar::new(row, value).width(0.8))
                .collect();
            base_plot("row", column).show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name(column).color(SERIES_COLOR));
            });
        }
        ChartKind::Line => {
            let points: PlotPoints = series(dataset, column)?.into_iter().collect();
            base_plot("row", column).show(ui, |plot_ui| {
                plot_ui.line(Line::new(points).name(column).color(SERIES_COLOR).width(1.5));
            });
        }
        ChartKind::Histogram => {
            let values: Vec<f64> = series(dataset, column)?.into_iter().map(|[_, v]| v).collect();
            let bars: Vec<Bar> = histogram(&values, request.bins)
                .iter()
                .map(|bin| {
                    Bar::new(bin.center(), bin.count as f64)
                        .width(bin.width())
                        .stroke(egui::Stroke::new(1.0, Color32::BLACK))
                })
                .collect();
            base_plot(column, "count").show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name(column).color(SERIES_COLOR));
            });
        }
        ChartKind::Scatter => {
            let other = request.other_column.unwrap_or(column);
            let points: PlotPoints = scatter(dataset, column, other)?.into_iter().collect();
            base_plot(column, other).show(ui, |plot_ui| {
                plot_ui.points(Points::new(points).radius(3.0).color(SERIES_COLOR));
            });
        }
        ChartKind::Pie => {
            let counts = value_counts(dataset, column)?;
            pie_chart(ui, &counts);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pie chart (egui_plot has none, so it is painted directly)
// ---------------------------------------------------------------------------

fn pie_chart(ui: &mut Ui, counts: &[(CellValue, usize)]) {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        ui.label("No values to chart.");
        return;
    }

    let colors = slice_palette(counts.len());
    let size = ui.available_width().min(PLOT_HEIGHT);
    let (rect, _) = ui.allocate_exact_size(egui::vec2(size, size), Sense::hover());
    let painter = ui.painter_at(rect);
    let center = rect.center();
    let radius = size * 0.45;
    let at = |angle: f32, r: f32| center + r * egui::vec2(angle.cos(), angle.sin());

    let mut start = -FRAC_PI_2;
    for ((_, n), color) in counts.iter().zip(&colors) {
        let sweep = TAU * *n as f32 / total as f32;
        // Triangle fan keeps every polygon convex.
        let steps = ((sweep / TAU) * 96.0).ceil().max(1.0) as usize;
        for s in 0..steps {
            let a0 = start + sweep * s as f32 / steps as f32;
            let a1 = start + sweep * (s + 1) as f32 / steps as f32;
            painter.add(Shape::convex_polygon(
                vec![center, at(a0, radius), at(a1, radius)],
                *color,
                egui::Stroke::NONE,
            ));
        }
        let mid = start + sweep / 2.0;
        painter.text(
            at(mid, radius * 0.65),
            Align2::CENTER_CENTER,
            percent_label(*n, total),
            FontId::proportional(12.0),
            Color32::BLACK,
        );
        start += sweep;
    }

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for ((value, _), color) in counts.iter().zip(&colors) {
            ui.label(RichText::new(format!("■ {value}")).color(*color));
        }
    });
}
