use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};
use quad_density::data::export::export_file;
use quad_density::data::sampler::SamplerKind;
use quad_density::solver::ConstantMode;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – solver parameters and channel table
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Solver");
            ui.separator();
            if solver_controls(ui, state) {
                state.resolve();
            }

            ui.add_space(8.0);
            ui.heading("Channels");
            ui.separator();
            channel_table(ui, state);

            ui.add_space(8.0);
            snapshots(ui, state);
        });
}

/// Parameter widgets.  Returns true when anything changed.
fn solver_controls(ui: &mut Ui, state: &mut AppState) -> bool {
    let config = &mut state.config;
    let mut changed = false;

    egui::Grid::new("solver_params")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui: &mut Ui| {
            for (label, value) in [
                ("Dominance", &mut config.dominance_threshold),
                ("Support", &mut config.support_threshold),
                ("Min share", &mut config.min_share_threshold),
            ] {
                ui.label(label);
                changed |= ui
                    .add(egui::DragValue::new(value).range(0.0..=1.0).speed(0.005).max_decimals(3))
                    .changed();
                ui.end_row();
            }

            ui.label("Epsilon");
            changed |= ui
                .add(
                    egui::DragValue::new(&mut config.epsilon)
                        .range(1e-12..=1e-2)
                        .speed(1e-7)
                        .custom_formatter(|v, _| format!("{v:.1e}")),
                )
                .changed();
            ui.end_row();

            ui.label("Max rounds");
            changed |= ui
                .add(egui::DragValue::new(&mut config.max_allocation_rounds).range(1..=64))
                .changed();
            ui.end_row();

            ui.label("Sampler");
            egui::ComboBox::from_id_salt("sampler")
                .selected_text(config.sampler.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for kind in SamplerKind::ALL {
                        changed |= ui.selectable_value(&mut config.sampler, kind, kind.label()).changed();
                    }
                });
            ui.end_row();

            ui.label("Constant");
            egui::ComboBox::from_id_salt("constant_mode")
                .selected_text(config.constant_mode.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for mode in ConstantMode::ALL {
                        changed |= ui.selectable_value(&mut config.constant_mode, mode, mode.label()).changed();
                    }
                });
            ui.end_row();
        });

    changed
}

fn channel_table(ui: &mut Ui, state: &mut AppState) {
    let Some(active) = state.report.as_ref().map(|r| r.active_channels.len()) else {
        ui.label("Load measurements and a .quad file.");
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{active} active, {} shown", state.selection.len()));
        if ui.small_button("All").clicked() {
            state.select_all();
        }
        if ui.small_button("None").clicked() {
            state.select_none();
        }
    });

    // Re-borrow after potential mutation from All/None
    let Some(report) = &state.report else {
        return;
    };
    let mut toggled: Option<String> = None;

    TableBuilder::new(ui)
        .id_salt("channel_table")
        .striped(true)
        .column(Column::auto())
        .column(Column::auto().at_least(56.0))
        .column(Column::auto().at_least(64.0))
        .column(Column::auto().at_least(64.0))
        .column(Column::remainder().at_least(64.0))
        .header(20.0, |mut header| {
            for title in ["", "Channel", "Constant %", "Cumulative", "Share %"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for summary in &report.channels {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        let mut shown = state.selection.contains(&summary.name);
                        if ui.checkbox(&mut shown, "").changed() {
                            toggled = Some(summary.name.clone());
                        }
                    });
                    row.col(|ui: &mut Ui| {
                        let color = state
                            .color_map
                            .as_ref()
                            .map_or(Color32::LIGHT_BLUE, |cm| cm.color_for(&summary.name));
                        let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
                        ui.painter().rect_filled(rect, 2.0, color);
                        ui.label(&summary.name).on_hover_text(format!("{:?} evidence", summary.evidence));
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(format!("{:.2}", summary.density_constant * 100.0));
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(format!("{:.3}", summary.cumulative));
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(format!("{:.2}", summary.contribution_pct));
                    });
                });
            }
        });

    if let Some(name) = toggled {
        state.toggle_channel(&name);
    }
}

fn snapshots(ui: &mut Ui, state: &AppState) {
    let Some(report) = &state.report else {
        return;
    };

    egui::CollapsingHeader::new(RichText::new("Tone snapshots").strong())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            for snap in &report.snapshots {
                ui.label(RichText::new(format!("{} ({}%, ΔL {:.3})", snap.region, snap.input, snap.delta)).strong());
                for (name, share) in &snap.shares {
                    ui.label(format!("  {name}: {:.1}%", share * 100.0));
                }
            }
        });

    if let Some(absorber) = &report.absorber {
        ui.label(format!("Unclaimed density absorbed by {absorber}"));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open measurements…").clicked() {
                open_measurements_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open .quad…").clicked() {
                open_quad_dialog(state);
                ui.close_menu();
            }
            if ui.button("Load solver config…").clicked() {
                open_config_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui
                .add_enabled(state.report.is_some(), egui::Button::new("Export report…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(m) = &state.measurements {
            ui.label(format!(
                "{}: {} steps",
                m.source.as_deref().unwrap_or("measurements"),
                m.len()
            ));
        }
        if let Some(q) = &state.quad {
            ui.label(format!(
                "{}: {}",
                q.source.as_deref().unwrap_or("quad"),
                q.names().join(",")
            ));
        }
        if let Some(report) = &state.report {
            ui.label(format!("total density {:.3}", report.total_density));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn report_error(state: &mut AppState, what: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        log::error!("Failed to {what}: {e:#}");
        state.status_message = Some(format!("Error: {e:#}"));
    }
}

pub fn open_measurements_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open L* measurements")
        .add_filter("Supported files", &["txt", "tsv", "csv", "json"])
        .add_filter("Tab-delimited", &["txt", "tsv"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        let result = state.open_measurements(&path);
        report_error(state, "load measurements", result);
    }
}

pub fn open_quad_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open QuadToneRIP curve")
        .add_filter("QuadToneRIP", &["quad"])
        .pick_file();

    if let Some(path) = file {
        let result = state.open_quad(&path);
        report_error(state, "load .quad", result);
    }
}

pub fn open_config_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Load solver config")
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        let result = state.open_config(&path);
        report_error(state, "load solver config", result);
    }
}

pub fn export_dialog(state: &mut AppState) {
    let Some(report) = &state.report else {
        return;
    };
    let file: Option<PathBuf> = rfd::FileDialog::new()
        .set_title("Export density report")
        .set_file_name("density_report.json")
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .save_file();

    if let Some(path) = file {
        let result = export_file(report, &path);
        report_error(state, "export report", result);
    }
}
