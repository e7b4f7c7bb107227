use std::path::Path;

use anyhow::Result;
use quad_density::data::filter::{ChannelSelection, carry_selection, init_selection, visible_channels};
use quad_density::data::loader::{load_measurements, load_quad};
use quad_density::data::model::{Measurements, QuadProfile};
use quad_density::solver::{DensityReport, SolverConfig, load_config, solve};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Measured L* ramp (None until the user loads one).
    pub measurements: Option<Measurements>,

    /// Channel draw curves of the loaded `.quad`.
    pub quad: Option<QuadProfile>,

    /// Solver tunables, edited from the side panel.
    pub config: SolverConfig,

    /// Latest solve; present once both inputs are loaded.
    pub report: Option<DensityReport>,

    /// Channels shown in plots.
    pub selection: ChannelSelection,

    /// Active colour map.
    pub color_map: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn set_measurements(&mut self, measurements: Measurements) {
        self.measurements = Some(measurements);
        self.status_message = None;
        self.resolve();
    }

    /// Ingest a newly loaded `.quad` and rebuild the channel colours.
    pub fn set_quad(&mut self, quad: QuadProfile) {
        self.color_map = Some(ColorMap::new(&quad.names()));
        self.quad = Some(quad);
        self.status_message = None;
        self.resolve();
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
        self.resolve();
    }

    pub fn open_measurements(&mut self, path: &Path) -> Result<()> {
        let measurements = load_measurements(path)?;
        self.set_measurements(measurements);
        Ok(())
    }

    pub fn open_quad(&mut self, path: &Path) -> Result<()> {
        let quad = load_quad(path)?;
        self.set_quad(quad);
        Ok(())
    }

    pub fn open_config(&mut self, path: &Path) -> Result<()> {
        let config = load_config(path)?;
        self.set_config(config);
        Ok(())
    }

    /// Re-run the solver after any input or parameter change.  Parameter
    /// edits are clamped back into range first.
    pub fn resolve(&mut self) {
        for warning in self.config.sanitize() {
            log::warn!("solver config: {warning}");
        }

        let (Some(measurements), Some(quad)) = (&self.measurements, &self.quad) else {
            return;
        };

        let report = solve(&measurements.samples, &quad.channels, &self.config);
        self.selection = match &self.report {
            Some(old) => carry_selection(&self.selection, &old.active_channels, &report),
            None => init_selection(&report),
        };
        if !report.fallback_steps.is_empty() {
            self.status_message = Some(format!(
                "{} step(s) attributed by fallback: {:?}",
                report.fallback_steps.len(),
                report.fallback_steps
            ));
        }
        self.report = Some(report);
    }

    pub fn toggle_channel(&mut self, name: &str) {
        if !self.selection.remove(name) {
            self.selection.insert(name.to_string());
        }
    }

    pub fn select_all(&mut self) {
        if let Some(report) = &self.report {
            self.selection = init_selection(report);
        }
    }

    pub fn select_none(&mut self) {
        self.selection.clear();
    }

    /// Selected active channels, in channel order.
    pub fn visible_channels(&self) -> Vec<&str> {
        match &self.report {
            Some(report) => visible_channels(report, &self.selection),
            None => Vec::new(),
        }
    }
}
