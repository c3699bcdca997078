use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color::{ColorBy, Coloring};
use crate::config::Settings;
use crate::data::loader::DataSource;
use crate::data::model::{Category, TrackedVariable, Variable};
use crate::state::{AppState, PlotMode};

// ---------------------------------------------------------------------------
// Left side panel – QC summary and filter widgets
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Quality control");
    ui.separator();

    let Some(output) = &state.output else {
        ui.label("No dataset loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let report = output.report.clone();
    let reduction = output.qc.to_string();
    let categories: Vec<_> = Category::ALL
        .into_iter()
        .map(|c| (c, output.normalized.unique_values(c)))
        .collect();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- QC summary ----
            egui::Grid::new("qc_summary").striped(true).show(ui, |ui: &mut Ui| {
                ui.strong("Flag");
                ui.strong("Accepted");
                ui.strong("Other");
                ui.strong("Missing");
                ui.end_row();
                for tracked in TrackedVariable::ALL {
                    let tally = report.tally(tracked);
                    ui.label(tracked.label());
                    ui.label(tally.accepted.to_string());
                    ui.label((tally.unmatched + tally.coded).to_string());
                    ui.label(tally.missing.to_string());
                    ui.end_row();
                }
            });
            ui.label(format!("Flags relabeled: {}", report.total_accepted()));
            ui.label(format!("Records kept: {reduction}"));
            ui.separator();

            // ---- Which flags the filter consults ----
            ui.strong("Accept a sample if any of");
            for tracked in TrackedVariable::ALL {
                let mut checked = state.tracked.contains(&tracked);
                if ui.checkbox(&mut checked, tracked.label()).changed() {
                    state.toggle_tracked(tracked);
                }
            }
            ui.checkbox(&mut state.show_rejected, "Show rejected samples");
            ui.separator();

            // ---- Panels and layout ----
            ui.strong("Panels");
            for variable in Variable::ALL {
                let mut checked = state.panels.contains(&variable);
                if ui.checkbox(&mut checked, variable.to_string()).changed() {
                    if checked {
                        state.panels.insert(variable);
                    } else {
                        state.panels.remove(&variable);
                    }
                }
            }
            ui.horizontal(|ui: &mut Ui| {
                ui.radio_value(&mut state.plot_mode, PlotMode::TimeSeries, "Time series");
                ui.radio_value(&mut state.plot_mode, PlotMode::Profile, "Profile");
            });
            ui.separator();

            // ---- Colour-by selector ----
            ui.strong("Color by");
            let current = color_by_label(state.color_by);
            egui::ComboBox::from_id_salt("color_by")
                .selected_text(current)
                .show_ui(ui, |ui: &mut Ui| {
                    let mut options = vec![ColorBy::Depth];
                    options.extend(Category::ALL.into_iter().map(ColorBy::Category));
                    for option in options {
                        if ui
                            .selectable_label(state.color_by == option, color_by_label(option))
                            .clicked()
                        {
                            state.set_color_by(option);
                        }
                    }
                });
            ui.separator();

            // ---- Per-category filter widgets (collapsible) ----
            for (category, all_values) in &categories {
                let category = *category;
                let n_selected = state.filters.get(&category).map_or(0, |s| s.len());
                let header_text = format!(
                    "{}  ({n_selected}/{})",
                    category.column(),
                    all_values.len()
                );

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(category.column())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(category);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(category);
                            }
                        });

                        for value in all_values {
                            let is_selected = state
                                .filters
                                .get(&category)
                                .is_some_and(|s| s.contains(value));
                            let label = value.as_deref().unwrap_or("<blank>");

                            // Show colour swatch if this is the colour column
                            let mut text = RichText::new(label);
                            if let Some(Coloring::Category(cm)) = &state.coloring {
                                if cm.category == category {
                                    text = text.color(cm.color_for(value.as_deref()));
                                }
                            }

                            let mut checked = is_selected;
                            if ui.checkbox(&mut checked, text).changed() {
                                state.toggle_filter_value(category, value);
                            }
                        }
                    });
            }
        });
}

fn color_by_label(color_by: ColorBy) -> &'static str {
    match color_by {
        ColorBy::Depth => "Depth",
        ColorBy::Category(c) => c.column(),
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open file…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open URL…").clicked() {
                if state.url_input.is_empty() {
                    state.url_input = state.settings.last_source.clone().unwrap_or_default();
                }
                state.url_dialog_open = true;
                ui.close_menu();
            }
            ui.separator();
            let export = egui::Button::new("Export accepted samples…");
            if ui.add_enabled(state.output.is_some(), export).clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Load settings…").clicked() {
                load_settings_dialog(state);
                ui.close_menu();
            }
            if ui.button("Save settings…").clicked() {
                save_settings_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(output) = &state.output {
            ui.label(format!(
                "{} samples loaded, {} accepted, {} visible",
                output.normalized.len(),
                output.qc.kept(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Floating window asking for a URL.
pub fn url_dialog(ctx: &egui::Context, state: &mut AppState) {
    if !state.url_dialog_open {
        return;
    }
    let mut open = true;
    let mut submit = false;
    egui::Window::new("Open URL")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui: &mut Ui| {
            ui.label("CSV or Parquet discrete summary:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut state.url_input)
                    .desired_width(420.0)
                    .hint_text("https://…/discrete_summary.csv"),
            );
            let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Fetch").clicked() || entered {
                submit = true;
            }
        });

    if submit && !state.url_input.trim().is_empty() {
        let source = DataSource::parse(&state.url_input);
        state.open(source);
        open = false;
    }
    state.url_dialog_open = open;
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open discrete summary")
        .add_filter("Supported files", &["csv", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(DataSource::File(path));
    }
}

fn export_dialog(state: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export accepted samples")
        .add_filter("CSV", &["csv"])
        .set_file_name("accepted_samples.csv")
        .save_file()
    else {
        return;
    };
    let result = state.export_accepted(&path);
    report(state, result, "export");
}

fn load_settings_dialog(state: &mut AppState) {
    let Some(path) = settings_dialog().pick_file() else {
        return;
    };
    match Settings::load(&path) {
        Ok(settings) => {
            state.apply_settings(settings);
        }
        Err(e) => report(state, Err(e), "settings load"),
    }
}

fn save_settings_dialog(state: &mut AppState) {
    let Some(path) = settings_dialog()
        .set_file_name("rusty-niskin.json")
        .save_file()
    else {
        return;
    };
    let result = state.settings.save(&with_json_extension(path));
    report(state, result, "settings save");
}

fn settings_dialog() -> rfd::FileDialog {
    rfd::FileDialog::new()
        .set_title("Settings")
        .add_filter("JSON", &["json"])
}

fn with_json_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension("json")
    }
}

fn report(state: &mut AppState, result: anyhow::Result<()>, what: &str) {
    match result {
        Ok(()) => state.status_message = None,
        Err(e) => {
            log::error!("{what} failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
