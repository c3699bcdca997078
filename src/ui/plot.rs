use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::DateTime;
use eframe::egui::{self, Color32, Ui};
use egui_plot::{GridMark, Legend, Plot, PlotPoint, PlotPoints, Points};

use crate::color::{Coloring, SeriesKey};
use crate::data::model::{Dataset, Record, Variable};
use crate::state::{AppState, PlotMode};

const PANEL_COLUMNS: usize = 2;
const MIN_PANEL_HEIGHT: f32 = 160.0;
const REJECTED_COLOR: Color32 = Color32::from_gray(110);

// ---------------------------------------------------------------------------
// Point extraction
// ---------------------------------------------------------------------------

/// Plot coordinates of one record in one panel, if it has the needed values.
///
/// Time series: `[closure time (unix seconds), value]`.
/// Profile:     `[value, -depth]` so depth grows downwards.
pub fn panel_point(record: &Record, variable: Variable, mode: PlotMode) -> Option<[f64; 2]> {
    let value = record.measurement(variable)?;
    match mode {
        PlotMode::TimeSeries => {
            let ts = record.timestamp?;
            Some([ts.timestamp_millis() as f64 / 1000.0, value])
        }
        PlotMode::Profile => Some([value, -record.depth?]),
    }
}

/// Group the points of `indices` into coloured series, ordered for the legend.
pub fn group_series(
    dataset: &Dataset,
    indices: &[usize],
    coloring: &Coloring,
    variable: Variable,
    mode: PlotMode,
) -> Vec<(SeriesKey, Vec<[f64; 2]>)> {
    let mut series: BTreeMap<(usize, String), (SeriesKey, Vec<[f64; 2]>)> = BTreeMap::new();
    for &i in indices {
        let record = &dataset.records[i];
        let Some(point) = panel_point(record, variable, mode) else {
            continue;
        };
        let key = coloring.series_for(record);
        series
            .entry((key.order, key.label.clone()))
            .or_insert_with(|| (key, Vec::new()))
            .1
            .push(point);
    }
    series.into_values().collect()
}

fn format_date(unix_seconds: f64) -> String {
    DateTime::from_timestamp(unix_seconds.floor() as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Scatter panels (central panel)
// ---------------------------------------------------------------------------

/// Render one scatter plot per selected variable in a grid.
pub fn scatter_panels(ui: &mut Ui, state: &AppState) {
    let (Some(output), Some(coloring)) = (&state.output, &state.coloring) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a discrete summary to plot samples  (File → Open…)");
        });
        return;
    };

    let variables: Vec<Variable> = state.panels.iter().copied().collect();
    if variables.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Select at least one variable in the side panel");
        });
        return;
    }

    let n_columns = PANEL_COLUMNS.min(variables.len());
    let n_rows = variables.len().div_ceil(n_columns);
    let panel_height = (ui.available_height() / n_rows as f32 - 24.0).max(MIN_PANEL_HEIGHT);

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.columns(n_columns, |columns| {
                for (i, variable) in variables.iter().enumerate() {
                    scatter_panel(
                        &mut columns[i % n_columns],
                        state,
                        &output.normalized,
                        coloring,
                        *variable,
                        panel_height,
                    );
                }
            });
        });
}

fn scatter_panel(
    ui: &mut Ui,
    state: &AppState,
    dataset: &Dataset,
    coloring: &Coloring,
    variable: Variable,
    height: f32,
) {
    let mode = state.plot_mode;
    let series = group_series(dataset, &state.visible_indices, coloring, variable, mode);
    let rejected: Vec<[f64; 2]> = if state.show_rejected {
        state
            .rejected_indices
            .iter()
            .filter_map(|&i| panel_point(&dataset.records[i], variable, mode))
            .collect()
    } else {
        Vec::new()
    };

    let n_points: usize = series.iter().map(|(_, pts)| pts.len()).sum();
    ui.strong(format!(
        "{variable}  ({n_points} samples, {} flag)",
        variable.tracked().label()
    ));

    let plot = Plot::new(("scatter", variable.column()))
        .height(height)
        .legend(Legend::default())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);

    let plot = match mode {
        PlotMode::TimeSeries => plot
            .x_axis_label("Closure time (UTC)")
            .y_axis_label(variable.to_string())
            .x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| {
                format_date(mark.value)
            })
            .label_formatter(|name: &str, value: &PlotPoint| {
                format!("{name}\n{}\n{:.3}", format_date(value.x), value.y)
            }),
        PlotMode::Profile => plot
            .x_axis_label(variable.to_string())
            .y_axis_label("Depth [m]")
            .y_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| {
                format!("{:.0}", -mark.value)
            }),
    };

    plot.show(ui, |plot_ui| {
        if !rejected.is_empty() {
            plot_ui.points(
                Points::new(PlotPoints::from(rejected))
                    .name("rejected")
                    .color(REJECTED_COLOR)
                    .radius(2.0),
            );
        }
        for (key, points) in series {
            plot_ui.points(
                Points::new(PlotPoints::from(points))
                    .name(&key.label)
                    .color(key.color)
                    .radius(2.5),
            );
        }
    });
    ui.add_space(8.0);
}
