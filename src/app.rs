use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SalaryPandaApp {
    pub state: AppState,
}

impl SalaryPandaApp {
    /// Wrap a state whose dataset has already been resolved.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for SalaryPandaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: title and status ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.state);
        });

        // ---- Left side panel: upload, filters, downloads ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: preview, charts, model ----
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.heading(format!("Data preview (first {} rows)", crate::state::PREVIEW_ROWS));
                    panels::preview_table(ui, &self.state);
                    ui.separator();

                    if self.state.loaded.is_some() {
                        plot::charts_section(ui, &mut self.state);
                        ui.separator();

                        ui.heading("Baseline model");
                        panels::model_section(ui, &mut self.state);
                    }
                });
        });
    }
}
