use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RustyNiskinApp {
    pub state: AppState,
}

impl eframe::App for RustyNiskinApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: QC summary and filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: sample table ----
        egui::TopBottomPanel::bottom("sample_table")
            .default_height(180.0)
            .resizable(true)
            .show(ctx, |ui| {
                table::sample_table(ui, &self.state);
            });

        // ---- Central panel: scatter panels ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::scatter_panels(ui, &self.state);
        });

        panels::url_dialog(ctx, &mut self.state);
    }
}
