use serde::Serialize;

use super::config::{ConstantMode, SolverConfig};
use super::dominance::{Evidence, ScanEntry};
use super::shares::ShareMatrix;

/// Calibration result for one channel, in calibration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelCalibration {
    pub channel: usize,
    pub evidence: Evidence,
    /// Share-weighted residual per unit share.
    pub rate: f64,
    /// Steps that contributed a positive residual.
    pub span: usize,
    /// Allocation budget in absolute density units, after clamping and any
    /// leftover absorption.
    pub constant: f64,
}

/// Density constants for every channel of a [`ShareMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Calibration {
    /// Absolute constants by channel index; 0 for channels never calibrated.
    pub constants: Vec<f64>,
    pub entries: Vec<ChannelCalibration>,
    /// Channel that took the unclaimed remainder, if any did.
    pub absorber: Option<usize>,
    /// Amount added to the absorber.
    pub absorbed: f64,
}

impl Calibration {
    pub fn total(&self) -> f64 {
        self.constants.iter().sum()
    }
}

/// Walk the calibration order, letting each channel claim the density left
/// unexplained by the channels before it.
///
/// At every step with density where the channel's share exceeds the minimum,
/// the residual is the step's delta minus what earlier channels already
/// explain there (`rate × share`).  The channel's rate is
/// `Σ residual / Σ share` over steps with a positive residual.  In
/// [`ConstantMode::EvidenceWindow`] only steps where the share reaches the
/// threshold behind the channel's evidence count, and the constant is
/// `Σ residual × share` over them; in [`ConstantMode::ResidualRate`] the
/// constant is the rate itself.  Constants are clamped to the density not yet
/// claimed.  Whatever remains at the end goes to the last channel in the
/// order that showed any evidence.
pub fn calibrate(
    order: &[ScanEntry],
    shares: &ShareMatrix,
    deltas: &[f64],
    total_density: f64,
    config: &SolverConfig,
) -> Calibration {
    let eps = config.epsilon;
    let mut constants = vec![0.0; shares.channels()];
    let mut rates = vec![0.0; shares.channels()];
    let mut calibrated: Vec<usize> = Vec::with_capacity(order.len());
    let mut claimed = 0.0;
    let mut entries = Vec::with_capacity(order.len());

    for entry in order {
        let channel = entry.channel;
        let window = evidence_window(entry.evidence, config);
        let mut residual_sum = 0.0;
        let mut weighted_sum = 0.0;
        let mut share_sum = 0.0;
        let mut span = 0usize;

        for (step, &delta) in deltas.iter().enumerate() {
            let share = shares.share(channel, step);
            if delta <= eps || share <= config.min_share_threshold {
                continue;
            }
            if config.constant_mode == ConstantMode::EvidenceWindow && share < window {
                continue;
            }
            let explained: f64 = calibrated
                .iter()
                .map(|&prev| rates[prev] * shares.share(prev, step))
                .sum();
            let residual = delta - explained;
            if residual <= eps {
                continue;
            }
            residual_sum += residual;
            weighted_sum += residual * share;
            share_sum += share;
            span += 1;
        }

        let rate = if share_sum > eps { residual_sum / share_sum } else { 0.0 };
        let raw = match config.constant_mode {
            ConstantMode::EvidenceWindow => weighted_sum,
            ConstantMode::ResidualRate => rate,
        };

        let unclaimed = (total_density - claimed).max(0.0);
        let constant = raw.min(unclaimed).max(0.0);
        log::debug!(
            "calibrated {}: rate {rate:.4} over {span} steps, constant {constant:.4} (raw {raw:.4}, unclaimed {unclaimed:.4})",
            shares.name(channel)
        );

        // later channels see this one's rate, scaled down by any clamping
        rates[channel] = match config.constant_mode {
            ConstantMode::EvidenceWindow if raw > eps => rate * constant / raw,
            ConstantMode::EvidenceWindow => 0.0,
            ConstantMode::ResidualRate => constant,
        };
        constants[channel] = constant;
        claimed += constant;
        calibrated.push(channel);
        entries.push(ChannelCalibration {
            channel,
            evidence: entry.evidence,
            rate,
            span,
            constant,
        });
    }

    let leftover = (total_density - constants.iter().sum::<f64>()).max(0.0);
    let absorber = order
        .iter()
        .rev()
        .find(|e| e.step.is_some())
        .map(|e| e.channel);

    let mut absorbed = 0.0;
    if leftover > eps {
        if let Some(channel) = absorber {
            log::debug!("{} absorbs leftover density {leftover:.4}", shares.name(channel));
            constants[channel] += leftover;
            absorbed = leftover;
            if let Some(e) = entries.iter_mut().find(|e| e.channel == channel) {
                e.constant = constants[channel];
            }
        } else {
            log::debug!("no channel shows evidence, {leftover:.4} density left unclaimed");
        }
    }

    Calibration {
        constants,
        entries,
        absorber: if absorbed > 0.0 { absorber } else { None },
        absorbed,
    }
}

/// Smallest share at which a step counts towards the channel's constant in
/// [`ConstantMode::EvidenceWindow`]: the threshold that earned its evidence.
fn evidence_window(evidence: Evidence, config: &SolverConfig) -> f64 {
    match evidence {
        Evidence::Solo => config.dominance_threshold,
        Evidence::Support => config.support_threshold,
        Evidence::Trace | Evidence::Absent => config.min_share_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::dominance::calibration_order;

    fn run(rows: Vec<Vec<f64>>, deltas: &[f64], config: &SolverConfig) -> Calibration {
        let names = (0..rows.len()).map(|i| format!("ch{i}")).collect();
        let shares = ShareMatrix::from_rows(names, rows);
        let active: Vec<usize> = (0..shares.channels()).collect();
        let order = calibration_order(&active, &shares, deltas, config);
        calibrate(&order, &shares, deltas, deltas.iter().sum(), config)
    }

    #[test]
    fn evidence_window_claims_each_channel_span() {
        let deltas = [0.0, 2.0, 2.0, 1.0, 1.0];
        let cal = run(
            vec![vec![1.0, 1.0, 1.0, 0.0, 0.0], vec![0.0, 0.0, 0.0, 1.0, 1.0]],
            &deltas,
            &SolverConfig::default(),
        );
        assert_eq!(cal.constants, vec![4.0, 2.0]);
        assert_eq!(cal.absorbed, 0.0);
        assert_eq!(cal.entries[0].span, 2);
        assert_eq!(cal.entries[0].rate, 2.0);
    }

    #[test]
    fn residual_rate_leaves_leftover_to_last_channel() {
        let config = SolverConfig {
            constant_mode: ConstantMode::ResidualRate,
            ..SolverConfig::default()
        };
        let deltas = [0.0, 2.0, 2.0, 1.0, 1.0];
        let cal = run(
            vec![vec![1.0, 1.0, 1.0, 0.0, 0.0], vec![0.0, 0.0, 0.0, 1.0, 1.0]],
            &deltas,
            &config,
        );
        // rates 2 and 1, leftover 6 - 3 = 3 goes to ch1
        assert_eq!(cal.constants, vec![2.0, 4.0]);
        assert_eq!(cal.absorber, Some(1));
        assert_eq!(cal.absorbed, 3.0);
    }

    #[test]
    fn later_channels_only_see_unexplained_density() {
        // ch1 only appears at the mixed step, after ch0 has claimed its part
        let deltas = [0.0, 2.0, 3.0];
        let cal = run(
            vec![vec![1.0, 1.0, 0.5], vec![0.0, 0.0, 0.5]],
            &deltas,
            &SolverConfig {
                constant_mode: ConstantMode::ResidualRate,
                ..SolverConfig::default()
            },
        );
        let ch0 = &cal.entries[0];
        assert_eq!(ch0.channel, 0);
        // (2 + 3) / (1 + 0.5)
        assert!((ch0.rate - 5.0 / 1.5).abs() < 1e-12);
        let ch1 = &cal.entries[1];
        // residual 3 - 3.333 × 0.5 = 1.333, per unit share 2.667
        assert!((ch1.rate - (3.0 - 5.0 / 3.0) / 0.5).abs() < 1e-12);
    }

    #[test]
    fn solo_window_ignores_shared_steps() {
        // ch0 prints alone at steps 1-2 and shares step 3 with ch1
        let deltas = [0.0, 2.0, 2.0, 2.0, 1.0];
        let cal = run(
            vec![vec![0.0, 1.0, 1.0, 0.5, 0.0], vec![0.0, 0.0, 0.0, 0.5, 1.0]],
            &deltas,
            &SolverConfig::default(),
        );
        assert_eq!(cal.entries[0].span, 2);
        // the shared step is left over and absorbed by ch1
        assert_eq!(cal.constants, vec![4.0, 3.0]);
        assert_eq!(cal.absorber, Some(1));
        assert_eq!(cal.absorbed, 2.0);
    }

    #[test]
    fn support_channel_claims_its_share_weighted_residual() {
        let deltas = [0.0, 1.0, 1.0, 1.0];
        let cal = run(
            vec![vec![0.0, 0.5, 0.5, 0.5], vec![0.0, 0.5, 0.5, 0.5]],
            &deltas,
            &SolverConfig::default(),
        );
        // ch0 takes half of each step, which explains everything at rate 2;
        // ch1 finds no residual and absorbs the other half
        assert_eq!(cal.entries[0].rate, 2.0);
        assert_eq!(cal.constants, vec![1.5, 1.5]);
        assert_eq!(cal.absorber, Some(1));
    }

    #[test]
    fn constants_never_exceed_total_density() {
        // a rate of 2 per unit share against 1 unit of measured density
        let config = SolverConfig {
            constant_mode: ConstantMode::ResidualRate,
            ..SolverConfig::default()
        };
        let cal = run(vec![vec![0.0, 0.5], vec![0.0, 0.5]], &[0.0, 1.0], &config);
        assert_eq!(cal.entries[0].rate, 2.0);
        assert_eq!(cal.constants, vec![1.0, 0.0]);
        assert!(cal.total() <= 1.0 + 1e-9);
        assert!(cal.constants.iter().all(|&c| c >= 0.0));
    }

    #[test]
    fn no_evidence_means_no_constants() {
        let deltas = [0.0, 1.0, 1.0];
        let cal = run(vec![vec![0.0; 3], vec![0.0; 3]], &deltas, &SolverConfig::default());
        assert_eq!(cal.constants, vec![0.0, 0.0]);
        assert_eq!(cal.absorber, None);
        assert_eq!(cal.absorbed, 0.0);
    }
}
