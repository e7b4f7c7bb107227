//! Channel density attribution solver.
//!
//! Data flows strictly forward; calibration completes before any step is
//! allocated:
//! ```text
//!  samples ──► delta ───┐
//!                       ├──► dominance ──► calibrate ──► allocate ──► aggregate
//!  curves ───► shares ──┘
//! ```
pub mod aggregate;
pub mod allocate;
pub mod calibrate;
pub mod config;
pub mod delta;
pub mod dominance;
pub mod shares;


use serde::Serialize;

use crate::data::model::{ChannelCurve, Sample};
use crate::data::sampler::DrawSampler;

pub use aggregate::{ChannelSummary, RunningAttribution, ToneSnapshot};
pub use allocate::DensityProfile;
pub use config::{ConstantMode, SolverConfig, load_config};
pub use dominance::Evidence;
pub use shares::ShareMatrix;

// ---------------------------------------------------------------------------
// DensityReport – everything one solve produces
// ---------------------------------------------------------------------------

/// One channel's place in the calibration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEntry {
    pub name: String,
    /// First step where the channel showed evidence.
    pub step: Option<usize>,
    pub evidence: Evidence,
}

/// Complete attribution of a measured ramp to its ink channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityReport {
    pub inputs: Vec<f64>,
    pub l_values: Vec<f64>,
    pub delta_l: Vec<f64>,
    pub total_density: f64,
    pub channel_shares: ShareMatrix,
    /// Active channel names in input order.
    pub active_channels: Vec<String>,
    pub calibration_order: Vec<OrderEntry>,
    /// Per-channel constants and contributions, in channel order.
    pub channels: Vec<ChannelSummary>,
    pub density_profiles: Vec<DensityProfile>,
    pub running_attribution: Vec<RunningAttribution>,
    pub snapshots: Vec<ToneSnapshot>,
    /// Channel that absorbed unclaimed density during calibration.
    pub absorber: Option<String>,
    /// Steps finished by the fail-open fallback.
    pub fallback_steps: Vec<usize>,
    pub config: SolverConfig,
}

impl DensityReport {
    pub fn channel(&self, name: &str) -> Option<&ChannelSummary> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Normalised density constant of a channel (0 when not active).
    pub fn density_constant(&self, name: &str) -> f64 {
        self.channel(name).map_or(0.0, |c| c.density_constant)
    }

    pub fn cumulative(&self, name: &str) -> f64 {
        self.channel(name).map_or(0.0, |c| c.cumulative)
    }

    pub fn contribution_pct(&self, name: &str) -> f64 {
        self.channel(name).map_or(0.0, |c| c.contribution_pct)
    }

    /// Absolute density attributed to a channel at one step.
    pub fn step_contribution(&self, step: usize, name: &str) -> f64 {
        self.density_profiles
            .get(step)
            .and_then(|p| p.shares.get(name).map(|share| share * p.density))
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Solve with the draw sampler named in the config.
pub fn solve(samples: &[Sample], channels: &[ChannelCurve], config: &SolverConfig) -> DensityReport {
    solve_with_sampler(samples, channels, &config.sampler, config)
}

/// Attribute a measured ramp to its ink channels.
///
/// `samples` must be sorted by input level.  Never fails: degenerate input
/// (no ink, one sample, flat ramp) yields a complete report with zeros.
pub fn solve_with_sampler<S: DrawSampler + ?Sized>(
    samples: &[Sample],
    channels: &[ChannelCurve],
    sampler: &S,
    config: &SolverConfig,
) -> DensityReport {
    let eps = config.epsilon;
    let inputs: Vec<f64> = samples.iter().map(|s| s.input).collect();
    let l_values: Vec<f64> = samples.iter().map(|s| s.lstar).collect();

    let deltas = delta::extract_deltas(samples);
    let total_density = delta::total_density(&deltas);
    let matrix = shares::compute_shares(samples, channels, sampler);
    let active = shares::active_channels(channels, eps);

    // calibrate fully before allocating anything
    let order = dominance::calibration_order(&active, &matrix, &deltas, config);
    let calibration = calibrate::calibrate(&order, &matrix, &deltas, total_density, config);

    let allocation = allocate::allocate(&inputs, &deltas, &matrix, &active, &calibration.constants, config);

    let summaries = aggregate::summarize(&matrix, &calibration, &allocation, total_density, eps);
    let running = aggregate::running_attribution(&matrix, &active, &allocation, total_density, eps);
    let snapshots = aggregate::tone_snapshots(&inputs, &deltas, &matrix, &active);

    log::info!(
        "solved {} steps, {} active channels, total density {total_density:.3}, {} fallback steps",
        samples.len(),
        active.len(),
        allocation.fallback_steps.len()
    );

    DensityReport {
        inputs,
        l_values,
        delta_l: deltas,
        total_density,
        active_channels: active.iter().map(|&ch| matrix.name(ch).to_string()).collect(),
        calibration_order: order
            .iter()
            .map(|e| OrderEntry {
                name: matrix.name(e.channel).to_string(),
                step: e.step,
                evidence: e.evidence,
            })
            .collect(),
        channels: summaries,
        density_profiles: allocation.profiles,
        running_attribution: running,
        snapshots,
        absorber: calibration.absorber.map(|ch| matrix.name(ch).to_string()),
        fallback_steps: allocation.fallback_steps,
        channel_shares: matrix,
        config: config.clone(),
    }
}
