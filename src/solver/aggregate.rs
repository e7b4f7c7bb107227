use std::collections::BTreeMap;

use serde::Serialize;

use super::allocate::Allocation;
use super::calibrate::Calibration;
use super::dominance::Evidence;
use super::shares::ShareMatrix;

/// Per-channel totals over the whole ramp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub name: String,
    /// Density constant as a fraction of total measured density.
    pub density_constant: f64,
    /// Density constant in absolute units.
    pub density_constant_abs: f64,
    /// Absolute density attributed across all steps.
    pub cumulative: f64,
    /// `cumulative / total × 100`.
    pub contribution_pct: f64,
    /// Position in the calibration order.
    pub calibration_rank: usize,
    pub evidence: Evidence,
}

/// Running cumulative attribution of one channel, in percent of total density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningAttribution {
    pub name: String,
    pub percent: Vec<f64>,
}

/// Shares at a representative step of a tone region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToneSnapshot {
    pub region: String,
    pub input: f64,
    pub delta: f64,
    pub shares: BTreeMap<String, f64>,
}

fn fraction_of(value: f64, total: f64, epsilon: f64) -> f64 {
    if total > epsilon {
        value / total
    } else {
        0.0
    }
}

/// Sum each active channel's contributions and express them against the
/// total density.  Entries follow channel order; `calibration_rank` keeps
/// each channel's place in the calibration order.
pub fn summarize(
    shares: &ShareMatrix,
    calibration: &Calibration,
    allocation: &Allocation,
    total_density: f64,
    epsilon: f64,
) -> Vec<ChannelSummary> {
    let mut ranked: Vec<_> = calibration.entries.iter().enumerate().collect();
    ranked.sort_by_key(|(_, entry)| entry.channel);

    ranked
        .into_iter()
        .map(|(rank, entry)| {
            let ch = entry.channel;
            let constant = calibration.constants[ch];
            let cumulative: f64 = allocation.contributions[ch].iter().sum();
            ChannelSummary {
                name: shares.name(ch).to_string(),
                density_constant: fraction_of(constant, total_density, epsilon),
                density_constant_abs: constant,
                cumulative,
                contribution_pct: fraction_of(cumulative * 100.0, total_density, epsilon),
                calibration_rank: rank,
                evidence: entry.evidence,
            }
        })
        .collect()
}

/// Running totals of every active channel's contributions.
pub fn running_attribution(
    shares: &ShareMatrix,
    active: &[usize],
    allocation: &Allocation,
    total_density: f64,
    epsilon: f64,
) -> Vec<RunningAttribution> {
    active
        .iter()
        .map(|&ch| {
            let mut partial = 0.0;
            let percent = allocation.contributions[ch]
                .iter()
                .map(|&amount| {
                    partial += amount;
                    fraction_of(partial * 100.0, total_density, epsilon)
                })
                .collect();
            RunningAttribution {
                name: shares.name(ch).to_string(),
                percent,
            }
        })
        .collect()
}

/// Highlight / midtone / shadow snapshots at 7.5 %, 35 % and 90 % input,
/// falling back to the first, middle and last steps when those levels were
/// not measured.
pub fn tone_snapshots(inputs: &[f64], deltas: &[f64], shares: &ShareMatrix, active: &[usize]) -> Vec<ToneSnapshot> {
    if inputs.is_empty() {
        return Vec::new();
    }
    let find = |level: f64, fallback: usize| inputs.iter().position(|&x| x == level).unwrap_or(fallback);

    [
        ("Highlight", find(7.5, 0)),
        ("Midtone", find(35.0, inputs.len() / 2)),
        ("Shadow", find(90.0, inputs.len() - 1)),
    ]
    .into_iter()
    .map(|(region, step)| ToneSnapshot {
        region: region.to_string(),
        input: inputs[step],
        delta: deltas[step],
        shares: active
            .iter()
            .map(|&ch| (shares.name(ch).to_string(), shares.share(ch, step)))
            .collect(),
    })
    .collect()
}
