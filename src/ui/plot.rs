use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, Plot, PlotUi, Points};
use quad_density::solver::DensityReport;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Central panel – L* ramp, channel shares, cumulative attribution
// ---------------------------------------------------------------------------

/// Render the three stacked plots in the central panel.
pub fn density_plots(ui: &mut Ui, state: &AppState) {
    let report = match &state.report {
        Some(r) if !r.is_empty() => r,
        _ => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open measurements and a .quad file  (File → Open…)");
            });
            return;
        }
    };

    let height = (ui.available_height() / 3.0 - 8.0).max(120.0);
    let visible = state.visible_channels();
    let color_of = |name: &str| {
        state
            .color_map
            .as_ref()
            .map_or(Color32::LIGHT_BLUE, |cm| cm.color_for(name))
    };

    lstar_plot(ui, report, height);

    show_plot(ui, "share_plot", "Share of ink draw", height, 1.0, |plot_ui| {
        let matrix = &report.channel_shares;
        for (ch, name) in matrix.names().iter().enumerate() {
            if !visible.contains(&name.as_str()) {
                continue;
            }
            let points = series(&report.inputs, matrix.row(ch));
            plot_ui.line(Line::new(points).name(name).color(color_of(name)).width(1.5));
        }
    });

    show_plot(ui, "attribution_plot", "Cumulative attribution (%)", height, 100.0, |plot_ui| {
        for running in &report.running_attribution {
            if !visible.contains(&running.name.as_str()) {
                continue;
            }
            let points = series(&report.inputs, &running.percent);
            plot_ui.line(
                Line::new(points)
                    .name(&running.name)
                    .color(color_of(&running.name))
                    .width(2.0),
            );
        }
    });
}

fn lstar_plot(ui: &mut Ui, report: &DensityReport, height: f32) {
    show_plot(ui, "lstar_plot", "L*", height, 100.0, |plot_ui| {
        plot_ui.line(
            Line::new(series(&report.inputs, &report.l_values))
                .name("L*")
                .color(Color32::WHITE)
                .width(1.5),
        );
        plot_ui.points(
            Points::new(series(&report.inputs, &report.l_values))
                .radius(2.5)
                .color(Color32::WHITE),
        );
        let fallback: Vec<[f64; 2]> = report
            .fallback_steps
            .iter()
            .map(|&step| [report.inputs[step], report.l_values[step]])
            .collect();
        plot_ui.points(
            Points::new(fallback)
                .name("fallback")
                .radius(4.0)
                .color(Color32::RED),
        );
    });
}

fn show_plot(ui: &mut Ui, id: &str, y_label: &str, height: f32, y_max: f64, add: impl FnOnce(&mut PlotUi)) {
    Plot::new(id)
        .legend(Legend::default())
        .height(height)
        .x_axis_label("Input %")
        .y_axis_label(y_label.to_string())
        .include_x(0.0)
        .include_x(100.0)
        .include_y(0.0)
        .include_y(y_max)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, add);
}

fn series(xs: &[f64], ys: &[f64]) -> Vec<[f64; 2]> {
    xs.iter().zip(ys).map(|(&x, &y)| [x, y]).collect()
}
