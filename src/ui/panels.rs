use std::borrow::Cow;
use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::loader::Upload;
use crate::data::model::Value;
use crate::state::{AppState, MultiFilter, DOWNLOAD_NAME};

// ---------------------------------------------------------------------------
// Left side panel – data source, filters, downloads
// ---------------------------------------------------------------------------

/// Render the left side panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Data");
            if ui.button("Upload CSV…").clicked() {
                upload_dialog(state);
            }
            if let Some(loaded) = &state.loaded {
                ui.label(format!("Source: {}", loaded.source.describe()));
            }
            ui.separator();

            ui.heading("Filters");
            if state.loaded.is_none() {
                ui.label("No dataset loaded.");
                return;
            }
            filter_widgets(ui, state);
            ui.separator();

            ui.heading("Downloads");
            if ui.button(format!("Download {DOWNLOAD_NAME}")).clicked() {
                save_csv_dialog(state);
            }
            if let Some(pdf) = state.report_pdf() {
                if ui.button("Download EDA PDF").clicked() {
                    save_pdf_dialog(state, &pdf);
                }
            }
            ui.separator();

            ui.heading("Report");
            if ui.button("Generate EDA report").clicked() {
                state.generate_report();
            }
            if let Some(msg) = &state.report_message {
                ui.label(msg);
            }
        });
}

fn filter_widgets(ui: &mut Ui, state: &mut AppState) {
    // Clone what we need so we can mutate state inside the loop.
    let options = state.options.clone();

    for filter in [MultiFilter::ExperienceLevel, MultiFilter::CompanySize] {
        let values = options.values(filter);
        if values.is_empty() {
            continue;
        }
        let n_selected = state.filters.selected(filter).len();
        let header_text = if n_selected == 0 {
            format!("{}  (any)", filter.label())
        } else {
            format!("{}  ({n_selected}/{})", filter.label(), values.len())
        };

        egui::CollapsingHeader::new(RichText::new(header_text).strong())
            .id_salt(filter.column())
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                if ui.small_button("Clear").clicked() {
                    state.clear_filter(filter);
                }
                for val in values {
                    let mut checked = state.filters.selected(filter).contains(val);
                    if ui.checkbox(&mut checked, val.to_string()).changed() {
                        state.toggle_filter_value(filter, val);
                    }
                }
            });
    }

    if options.job_titles.is_empty() {
        return;
    }
    ui.strong("Job title");
    let current = state.filters.job_title.clone();
    let mut chosen = current.clone();
    egui::ComboBox::from_id_salt("job_title")
        .selected_text(job_title_text(current.as_ref()))
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            ui.selectable_value(&mut chosen, None, job_title_text(None));
            for title in &options.job_titles {
                ui.selectable_value(&mut chosen, Some(title.clone()), title.to_string());
            }
        });
    if chosen != current {
        state.set_job_title(chosen);
    }
}

fn job_title_text(title: Option<&Value>) -> String {
    title.map_or_else(|| "(none)".to_string(), Value::to_string)
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the title bar with row counts and status.
pub fn top_bar(ui: &mut Ui, state: &AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Data Science Salaries – EDA Dashboard");
        ui.separator();

        if let Some(ds) = state.dataset() {
            ui.label(format!(
                "{} rows loaded, {} match the filters",
                ds.len(),
                state.visible_rows.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel – preview and model
// ---------------------------------------------------------------------------

/// First rows of the filtered view.
pub fn preview_table(ui: &mut Ui, state: &AppState) {
    let Some(ds) = state.dataset() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No data: upload a CSV or provide the default dataset");
        });
        return;
    };
    let rows = state.preview_rows();
    let columns = ds.columns();

    ScrollArea::horizontal()
        .id_salt("preview_scroll")
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(300.0)
                .columns(TableColumn::auto().at_least(60.0), columns.len())
                .header(20.0, |mut header| {
                    for col in columns {
                        header.col(|ui| {
                            ui.strong(&col.name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, rows.len(), |mut row| {
                        let idx = rows[row.index()];
                        for col in columns {
                            row.col(|ui| {
                                match &col.cells[idx] {
                                    Value::Null => ui.weak("NaN"),
                                    cell => ui.label(cell.to_string()),
                                };
                            });
                        }
                    });
                });
        });
}

/// The train button and the last outcome.
pub fn model_section(ui: &mut Ui, state: &mut AppState) {
    if ui.button("Train & show basic metrics").clicked() {
        state.train();
    }
    if let Some(outcome) = &state.train_outcome {
        ui.label(RichText::new(outcome.to_string()).monospace());
    }
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn upload_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Upload salary CSV")
        .add_filter("CSV", &["csv"])
        .pick_file();

    let Some(path) = file else {
        return;
    };
    match std::fs::read(&path) {
        Ok(bytes) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            state.load_active(Some(Upload { name, bytes }));
        }
        Err(e) => {
            log::error!("Failed to read {}: {e}", path.display());
            state.status_message = Some(format!("Error: cannot read {}: {e}", path.display()));
        }
    }
}

fn save_csv_dialog(state: &mut AppState) {
    let download = state.download_csv().map(|r| r.map(Cow::into_owned));
    let bytes = match download {
        Some(Ok(bytes)) => bytes,
        Some(Err(e)) => {
            state.status_message = Some(format!("Error: {e}"));
            return;
        }
        None => return,
    };
    let target = rfd::FileDialog::new()
        .set_title("Save CSV")
        .set_file_name(DOWNLOAD_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();
    if let Some(path) = target {
        write_download(state, &path, &bytes);
    }
}

fn save_pdf_dialog(state: &mut AppState, pdf: &Path) {
    let target = rfd::FileDialog::new()
        .set_title("Save EDA report")
        .set_file_name(crate::report::REPORT_FILE)
        .add_filter("PDF", &["pdf"])
        .save_file();
    let Some(path) = target else {
        return;
    };
    match std::fs::read(pdf) {
        Ok(bytes) => write_download(state, &path, &bytes),
        Err(e) => state.status_message = Some(format!("Error: cannot read {}: {e}", pdf.display())),
    }
}

fn write_download(state: &mut AppState, path: &Path, bytes: &[u8]) {
    match std::fs::write(path, bytes) {
        Ok(()) => log::info!("Saved {}", path.display()),
        Err(e) => {
            log::error!("Failed to save {}: {e}", path.display());
            state.status_message = Some(format!("Error: cannot write {}: {e}", path.display()));
        }
    }
}
