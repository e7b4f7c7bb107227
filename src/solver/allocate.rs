use std::collections::BTreeMap;

use serde::Serialize;

use super::config::SolverConfig;
use super::shares::ShareMatrix;

/// Attribution of one measured step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityProfile {
    pub input: f64,
    /// The step's measured density decrement.
    pub density: f64,
    /// Channel name → fraction of `density` attributed to it.
    pub shares: BTreeMap<String, f64>,
}

impl DensityProfile {
    /// Sum of the attributed fractions (1 when fully allocated).
    pub fn allocated_fraction(&self) -> f64 {
        self.shares.values().sum()
    }
}

/// Output of the waterfilling pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub profiles: Vec<DensityProfile>,
    /// `contributions[channel][step]` in absolute density units.
    pub contributions: Vec<Vec<f64>>,
    /// Budget left per channel once every step is allocated.
    pub remaining: Vec<f64>,
    /// Steps whose density was finished by the fail-open fallback.
    pub fallback_steps: Vec<usize>,
}

/// Distribute every step's density over the channels drawing ink there.
///
/// Candidates at a step are active channels whose share exceeds the minimum
/// and whose remaining budget is positive.  Each round splits the
/// outstanding density in proportion to `constant × share` (or equally when
/// all weights are zero), capped by each channel's remaining budget.  Rounds
/// stop when the density is used up, the candidates run out, a round makes no
/// progress, or `max_allocation_rounds` is reached.
///
/// Anything still outstanding goes to the active channel with the largest
/// `remaining × share`, even past its budget; ties go to the channel first in
/// input order.
pub fn allocate(
    inputs: &[f64],
    deltas: &[f64],
    shares: &ShareMatrix,
    active: &[usize],
    constants: &[f64],
    config: &SolverConfig,
) -> Allocation {
    let eps = config.epsilon;
    let mut remaining = constants.to_vec();
    let mut contributions = vec![vec![0.0; deltas.len()]; shares.channels()];
    let mut profiles = Vec::with_capacity(deltas.len());
    let mut fallback_steps = Vec::new();

    for (step, &delta) in deltas.iter().enumerate() {
        let input = inputs.get(step).copied().unwrap_or(0.0);
        if delta <= eps {
            profiles.push(DensityProfile {
                input,
                density: delta,
                shares: BTreeMap::new(),
            });
            continue;
        }

        let is_candidate =
            |ch: usize, remaining: &[f64]| shares.share(ch, step) > config.min_share_threshold && remaining[ch] > eps;

        let mut amounts = vec![0.0; shares.channels()];
        let mut outstanding = delta;
        let mut candidates: Vec<usize> = active
            .iter()
            .copied()
            .filter(|&ch| is_candidate(ch, &remaining))
            .collect();

        for _round in 0..config.max_allocation_rounds {
            if outstanding <= eps || candidates.is_empty() {
                break;
            }

            let weights: Vec<f64> = candidates
                .iter()
                .map(|&ch| constants[ch] * shares.share(ch, step))
                .collect();
            let total_weight: f64 = weights.iter().sum();
            let equal = 1.0 / candidates.len() as f64;

            let mut consumed = 0.0;
            for (&ch, &weight) in candidates.iter().zip(&weights) {
                let fraction = if total_weight > eps { weight / total_weight } else { equal };
                let amount = (fraction * outstanding).min(remaining[ch]);
                if amount > eps {
                    amounts[ch] += amount;
                    remaining[ch] -= amount;
                    consumed += amount;
                }
            }

            if consumed <= eps {
                break;
            }
            outstanding -= consumed;
            candidates.retain(|&ch| is_candidate(ch, &remaining));
        }

        if outstanding > eps {
            if let Some(ch) = fallback_channel(active, shares, step, &remaining) {
                log::warn!(
                    "step {step} (input {input}): {outstanding:.4} density unallocated after waterfilling, assigned to {}",
                    shares.name(ch)
                );
                amounts[ch] += outstanding;
                remaining[ch] = (remaining[ch] - outstanding).max(0.0);
                fallback_steps.push(step);
            }
        }

        let mut step_shares = BTreeMap::new();
        for (ch, &amount) in amounts.iter().enumerate() {
            if amount > eps {
                contributions[ch][step] = amount;
                step_shares.insert(shares.name(ch).to_string(), amount / delta);
            }
        }
        profiles.push(DensityProfile {
            input,
            density: delta,
            shares: step_shares,
        });
    }

    Allocation {
        profiles,
        contributions,
        remaining,
        fallback_steps,
    }
}

/// Largest `remaining × share` wins; the first channel wins ties.
fn fallback_channel(active: &[usize], shares: &ShareMatrix, step: usize, remaining: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &ch in active {
        let score = remaining[ch] * shares.share(ch, step);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((ch, score)),
        }
    }
    best.map(|(ch, _)| ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> ShareMatrix {
        let names = (0..rows.len()).map(|i| format!("ch{i}")).collect();
        ShareMatrix::from_rows(names, rows)
    }

    fn inputs(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn proportional_split_by_weight() {
        let shares = matrix(vec![vec![0.0, 0.5], vec![0.0, 0.5]]);
        let deltas = [0.0, 4.0];
        let alloc = allocate(&inputs(2), &deltas, &shares, &[0, 1], &[3.0, 1.0], &SolverConfig::default());
        assert_eq!(alloc.contributions[0][1], 3.0);
        assert_eq!(alloc.contributions[1][1], 1.0);
        assert!(alloc.fallback_steps.is_empty());
        assert!((alloc.profiles[1].allocated_fraction() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn capped_channel_spills_into_later_rounds() {
        // weights 0.9 and 1.0: ch0 is offered 1.89 but only has 1 left,
        // the second round hands the rest to ch1
        let shares = matrix(vec![vec![0.0, 0.9], vec![0.0, 0.1]]);
        let deltas = [0.0, 4.0];
        let alloc = allocate(&inputs(2), &deltas, &shares, &[0, 1], &[1.0, 10.0], &SolverConfig::default());
        assert_eq!(alloc.contributions[0][1], 1.0);
        assert!((alloc.contributions[1][1] - 3.0).abs() < 1e-9);
        assert!(alloc.remaining[0].abs() < 1e-12);
        assert!(alloc.fallback_steps.is_empty());
    }

    #[test]
    fn zero_weights_split_equally() {
        // weights of 2.5e-7 each stay below epsilon, so the split is equal
        let shares = matrix(vec![vec![0.0, 0.05], vec![0.0, 0.05]]);
        let deltas = [0.0, 1.0];
        let alloc = allocate(&inputs(2), &deltas, &shares, &[0, 1], &[5e-6, 5e-6], &SolverConfig::default());
        assert_eq!(alloc.contributions[1][1], 5e-6);
        // both budgets exhausted, the fallback finishes the step on ch0
        assert_eq!(alloc.fallback_steps, vec![1]);
        assert!((alloc.contributions[0][1] - (1.0 - 5e-6)).abs() < 1e-12);
    }

    #[test]
    fn exhausted_budgets_fall_back_to_first_channel() {
        let shares = matrix(vec![vec![0.0, 0.5], vec![0.0, 0.5]]);
        let deltas = [0.0, 2.0];
        let alloc = allocate(&inputs(2), &deltas, &shares, &[0, 1], &[0.0, 0.0], &SolverConfig::default());
        assert_eq!(alloc.fallback_steps, vec![1]);
        assert_eq!(alloc.profiles[1].shares.get("ch0"), Some(&1.0));
        assert_eq!(alloc.profiles[1].shares.len(), 1);
    }

    #[test]
    fn round_cap_bounds_the_loop() {
        let shares = matrix(vec![vec![0.0, 0.9], vec![0.0, 0.1]]);
        let deltas = [0.0, 4.0];
        let config = SolverConfig {
            max_allocation_rounds: 1,
            ..SolverConfig::default()
        };
        let alloc = allocate(&inputs(2), &deltas, &shares, &[0, 1], &[1.0, 10.0], &config);
        // the spill round never runs, the fallback picks ch1 (ch0 has no budget)
        assert_eq!(alloc.fallback_steps, vec![1]);
        assert_eq!(alloc.contributions[0][1], 1.0);
        let total: f64 = alloc.contributions.iter().map(|c| c[1]).sum();
        assert!((total - 4.0).abs() < 1e-9);
    }

    #[test]
    fn fallback_prefers_largest_remaining_share_product() {
        let shares = matrix(vec![vec![0.0, 0.2], vec![0.0, 0.8]]);
        assert_eq!(fallback_channel(&[0, 1], &shares, 1, &[1.0, 1.0]), Some(1));
        assert_eq!(fallback_channel(&[0, 1], &shares, 1, &[5.0, 1.0]), Some(0));
        assert_eq!(fallback_channel(&[0, 1], &shares, 1, &[0.0, 0.0]), Some(0));
        assert_eq!(fallback_channel(&[1, 0], &shares, 1, &[0.0, 0.0]), Some(1));
        assert_eq!(fallback_channel(&[], &shares, 1, &[0.0, 0.0]), None);
    }

    #[test]
    fn steps_without_density_get_empty_profiles() {
        let shares = matrix(vec![vec![1.0, 1.0]]);
        let alloc = allocate(&inputs(2), &[0.0, 0.0], &shares, &[0], &[0.0], &SolverConfig::default());
        assert!(alloc.profiles.iter().all(|p| p.shares.is_empty()));
        assert!(alloc.fallback_steps.is_empty());
    }
}
