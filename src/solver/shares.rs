use serde::Serialize;

use crate::data::model::{ChannelCurve, Sample};
use crate::data::sampler::DrawSampler;

/// Per-channel fraction of total ink draw at every measured step.
///
/// Channels keep their input order; index `c` in every method refers to the
/// same channel as `names()[c]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareMatrix {
    names: Vec<String>,
    /// `shares[c][i]`: channel `c` at step `i`.
    shares: Vec<Vec<f64>>,
    steps: usize,
}

impl ShareMatrix {
    /// Build directly from per-channel share rows (all the same length).
    pub fn from_rows(names: Vec<String>, shares: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(names.len(), shares.len());
        let steps = shares.first().map_or(0, Vec::len);
        debug_assert!(shares.iter().all(|row| row.len() == steps));
        Self { names, shares, steps }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, channel: usize) -> &str {
        &self.names[channel]
    }

    pub fn channels(&self) -> usize {
        self.names.len()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn share(&self, channel: usize, step: usize) -> f64 {
        self.shares[channel][step]
    }

    pub fn row(&self, channel: usize) -> &[f64] {
        &self.shares[channel]
    }
}

/// Sample every channel at each measured input level and normalise by the
/// total draw there.  Steps with no ink at all give every channel 0.
pub fn compute_shares<S: DrawSampler + ?Sized>(
    samples: &[Sample],
    channels: &[ChannelCurve],
    sampler: &S,
) -> ShareMatrix {
    let mut shares = vec![Vec::with_capacity(samples.len()); channels.len()];

    for sample in samples {
        let draws: Vec<f64> = channels
            .iter()
            .map(|ch| sampler.sample(&ch.draws, sample.input))
            .collect();
        let total: f64 = draws.iter().sum();
        for (row, draw) in shares.iter_mut().zip(&draws) {
            row.push(if total > 0.0 { draw / total } else { 0.0 });
        }
    }

    let names = channels.iter().map(|c| c.name.clone()).collect();
    ShareMatrix {
        names,
        shares,
        steps: samples.len(),
    }
}

/// Indices of channels with any draw above `epsilon`, in input order.
///
/// When nothing qualifies every channel is returned, so later stages always
/// have candidates.
pub fn active_channels(channels: &[ChannelCurve], epsilon: f64) -> Vec<usize> {
    let active: Vec<usize> = channels
        .iter()
        .enumerate()
        .filter(|(_, ch)| ch.draws.iter().any(|&v| v > epsilon))
        .map(|(i, _)| i)
        .collect();

    if active.is_empty() {
        log::debug!("no channel draws ink, treating all {} as active", channels.len());
        (0..channels.len()).collect()
    } else {
        active
    }
}
