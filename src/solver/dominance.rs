use serde::Serialize;

use super::config::SolverConfig;
use super::shares::ShareMatrix;

/// Strength of the evidence that placed a channel in the calibration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// Share reached the dominance threshold.
    Solo,
    /// Share reached the support threshold.
    Support,
    /// Share only exceeded the minimum share.
    Trace,
    /// No qualifying step anywhere; sorted last.
    Absent,
}

/// One channel's position in the calibration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanEntry {
    /// Channel index into the [`ShareMatrix`].
    pub channel: usize,
    /// First qualifying step, `None` when the channel never qualified.
    pub step: Option<usize>,
    pub evidence: Evidence,
}

impl ScanEntry {
    /// Sort key: the found step, or one past any real step.
    fn key(&self, steps: usize) -> usize {
        self.step.unwrap_or(steps + 1)
    }
}

/// Order active channels by where they first show up in the tone scale.
///
/// Each channel is scanned over steps carrying density (`delta > epsilon`) in
/// three passes of falling strictness: solo, support, then trace share.  The
/// sort is stable, so channels with the same first step keep input order.
pub fn calibration_order(
    active: &[usize],
    shares: &ShareMatrix,
    deltas: &[f64],
    config: &SolverConfig,
) -> Vec<ScanEntry> {
    let mut entries: Vec<ScanEntry> = active
        .iter()
        .map(|&channel| scan_channel(channel, shares, deltas, config))
        .collect();

    entries.sort_by_key(|e| e.key(deltas.len()));

    log::debug!(
        "calibration order: {:?}",
        entries
            .iter()
            .map(|e| (shares.name(e.channel), e.step, e.evidence))
            .collect::<Vec<_>>()
    );
    entries
}

fn scan_channel(channel: usize, shares: &ShareMatrix, deltas: &[f64], config: &SolverConfig) -> ScanEntry {
    let row = shares.row(channel);
    let first_where = |pred: &dyn Fn(f64) -> bool| {
        deltas
            .iter()
            .zip(row)
            .position(|(&delta, &share)| delta > config.epsilon && pred(share))
    };

    first_where(&|s: f64| s >= config.dominance_threshold)
        .map(|step| (step, Evidence::Solo))
        .or_else(|| first_where(&|s: f64| s >= config.support_threshold).map(|step| (step, Evidence::Support)))
        .or_else(|| first_where(&|s: f64| s > config.min_share_threshold).map(|step| (step, Evidence::Trace)))
        .map_or(
            ScanEntry {
                channel,
                step: None,
                evidence: Evidence::Absent,
            },
            |(step, evidence)| ScanEntry {
                channel,
                step: Some(step),
                evidence,
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> ShareMatrix {
        let names = (0..rows.len()).map(|i| format!("ch{i}")).collect();
        ShareMatrix::from_rows(names, rows)
    }

    #[test]
    fn solo_evidence_wins_over_earlier_support() {
        let shares = matrix(vec![
            vec![0.0, 0.3, 0.3, 0.95],
            vec![0.0, 0.7, 0.7, 0.05],
        ]);
        let deltas = [0.0, 1.0, 1.0, 1.0];
        let order = calibration_order(&[0, 1], &shares, &deltas, &SolverConfig::default());
        // ch0 solo at 3, ch1 only support at 1 → ch1 sorts first
        assert_eq!(order[0], ScanEntry { channel: 1, step: Some(1), evidence: Evidence::Support });
        assert_eq!(order[1], ScanEntry { channel: 0, step: Some(3), evidence: Evidence::Solo });
    }

    #[test]
    fn steps_without_density_are_ignored() {
        let shares = matrix(vec![vec![1.0, 1.0, 0.5]]);
        let deltas = [0.0, 0.0, 2.0];
        let order = calibration_order(&[0], &shares, &deltas, &SolverConfig::default());
        assert_eq!(order[0].step, Some(2));
        assert_eq!(order[0].evidence, Evidence::Support);
    }

    #[test]
    fn trace_and_missing_evidence() {
        let shares = matrix(vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 0.05, 0.0],
            vec![0.0, 0.95, 1.0],
        ]);
        let deltas = [0.0, 1.0, 1.0];
        let order = calibration_order(&[0, 1, 2], &shares, &deltas, &SolverConfig::default());
        let summary: Vec<_> = order.iter().map(|e| (e.channel, e.evidence)).collect();
        assert_eq!(
            summary,
            vec![(1, Evidence::Trace), (2, Evidence::Solo), (0, Evidence::Absent)]
        );
    }

    #[test]
    fn ties_keep_input_order() {
        let shares = matrix(vec![vec![0.0, 0.5], vec![0.0, 0.5]]);
        let deltas = [0.0, 1.0];
        let order = calibration_order(&[1, 0], &shares, &deltas, &SolverConfig::default());
        assert_eq!(order.iter().map(|e| e.channel).collect::<Vec<_>>(), vec![1, 0]);
    }

    #[test]
    fn inactive_channels_are_not_scanned() {
        let shares = matrix(vec![vec![0.0, 1.0], vec![0.0, 0.0]]);
        let order = calibration_order(&[1], &shares, &[0.0, 1.0], &SolverConfig::default());
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].channel, 1);
    }
}
