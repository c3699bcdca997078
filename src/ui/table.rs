use eframe::egui::{RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::{FlagValue, TrackedVariable, Variable};
use crate::state::AppState;

const ROW_HEIGHT: f32 = 18.0;

// ---------------------------------------------------------------------------
// Sample table (bottom panel)
// ---------------------------------------------------------------------------

/// Tabular view of the visible (accepted) samples with their QC flags.
pub fn sample_table(ui: &mut Ui, state: &AppState) {
    let Some(output) = &state.output else {
        ui.label("No dataset loaded.");
        return;
    };
    let dataset = &output.normalized;
    let rows = &state.visible_indices;

    let measured = [Variable::Oxygen, Variable::Salinity, Variable::Nitrate];

    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .column(Column::auto().at_least(40.0))
        .column(Column::auto().at_least(80.0))
        .column(Column::auto().at_least(150.0))
        .column(Column::auto().at_least(60.0))
        .columns(Column::auto().at_least(70.0), measured.len())
        .columns(Column::remainder().at_least(90.0), TrackedVariable::ALL.len())
        .header(20.0, |mut header| {
            for title in ["Row", "Station", "Closure time", "Depth [m]"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
            for variable in measured {
                header.col(|ui: &mut Ui| {
                    ui.strong(variable.to_string());
                });
            }
            for tracked in TrackedVariable::ALL {
                header.col(|ui: &mut Ui| {
                    ui.strong(format!("{} flag", tracked.label()));
                });
            }
        })
        .body(|body| {
            body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                let record = &dataset.records[rows[row.index()]];
                row.col(|ui: &mut Ui| {
                    ui.label(record.row.to_string());
                });
                row.col(|ui: &mut Ui| {
                    ui.label(record.station.as_deref().unwrap_or(""));
                });
                row.col(|ui: &mut Ui| {
                    let text = record
                        .timestamp
                        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_default();
                    ui.label(text);
                });
                row.col(|ui: &mut Ui| {
                    ui.label(optional_number(record.depth));
                });
                for variable in measured {
                    row.col(|ui: &mut Ui| {
                        ui.label(optional_number(record.measurement(variable)));
                    });
                }
                for tracked in TrackedVariable::ALL {
                    row.col(|ui: &mut Ui| {
                        let flag = record.flag(tracked);
                        let text = RichText::new(flag.to_string()).monospace();
                        ui.label(match flag {
                            FlagValue::Code(1) => text.strong(),
                            _ => text.weak(),
                        });
                    });
                }
            });
        });
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_default()
}
