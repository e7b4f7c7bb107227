use serde::{Deserialize, Serialize};

/// Looks up a channel's ink draw at an input level.
///
/// `draws` covers 0–100 % input evenly, first entry at 0 %, last at 100 %.
pub trait DrawSampler {
    fn sample(&self, draws: &[f64], input_percent: f64) -> f64;
}

/// Nearest curve entry, rounding half to even.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestSample;

impl DrawSampler for NearestSample {
    fn sample(&self, draws: &[f64], input_percent: f64) -> f64 {
        if draws.is_empty() {
            return 0.0;
        }
        let last = draws.len() - 1;
        let pos = (input_percent / 100.0 * last as f64).round_ties_even();
        let idx = (pos.max(0.0) as usize).min(last);
        draws[idx]
    }
}

/// Linear interpolation between the two neighbouring entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearSample;

impl DrawSampler for LinearSample {
    fn sample(&self, draws: &[f64], input_percent: f64) -> f64 {
        match draws.len() {
            0 => 0.0,
            1 => draws[0],
            len => {
                let last = len - 1;
                let pos = (input_percent / 100.0 * last as f64).clamp(0.0, last as f64);
                let lo = pos.floor() as usize;
                if lo >= last {
                    return draws[last];
                }
                let frac = pos - lo as f64;
                draws[lo] + (draws[lo + 1] - draws[lo]) * frac
            }
        }
    }
}

/// Sampler choice for configs, the CLI and the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    #[default]
    Nearest,
    Linear,
}

impl SamplerKind {
    pub const ALL: [SamplerKind; 2] = [SamplerKind::Nearest, SamplerKind::Linear];

    pub fn label(self) -> &'static str {
        match self {
            SamplerKind::Nearest => "Nearest sample",
            SamplerKind::Linear => "Linear",
        }
    }
}

impl DrawSampler for SamplerKind {
    fn sample(&self, draws: &[f64], input_percent: f64) -> f64 {
        match self {
            SamplerKind::Nearest => NearestSample.sample(draws, input_percent),
            SamplerKind::Linear => LinearSample.sample(draws, input_percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rounds_half_to_even() {
        // 5 entries: positions 0..4, 37.5 % → 1.5 → 2, 62.5 % → 2.5 → 2
        let draws = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(NearestSample.sample(&draws, 37.5), 20.0);
        assert_eq!(NearestSample.sample(&draws, 62.5), 20.0);
        assert_eq!(NearestSample.sample(&draws, 100.0), 40.0);
        assert_eq!(NearestSample.sample(&draws, 0.0), 0.0);
    }

    #[test]
    fn nearest_clamps_and_handles_empty() {
        assert_eq!(NearestSample.sample(&[], 50.0), 0.0);
        assert_eq!(NearestSample.sample(&[1.0, 2.0], 150.0), 2.0);
        assert_eq!(NearestSample.sample(&[1.0, 2.0], -20.0), 1.0);
    }

    #[test]
    fn linear_interpolates_between_entries() {
        let draws = [0.0, 100.0, 300.0];
        assert!((LinearSample.sample(&draws, 25.0) - 50.0).abs() < 1e-12);
        assert!((LinearSample.sample(&draws, 75.0) - 200.0).abs() < 1e-12);
        assert_eq!(LinearSample.sample(&draws, 100.0), 300.0);
        assert_eq!(LinearSample.sample(&[7.0], 42.0), 7.0);
    }

    #[test]
    fn sampler_kind_dispatches() {
        let draws = [0.0, 100.0, 300.0];
        assert_eq!(SamplerKind::Nearest.sample(&draws, 25.0), 0.0);
        assert!((SamplerKind::Linear.sample(&draws, 25.0) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn cli_and_config_share_sampler_names() {
        use clap::ValueEnum;

        for kind in SamplerKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            let cli = SamplerKind::from_str(json.trim_matches('"'), false).unwrap();
            assert_eq!(cli, kind);
        }
        assert!(SamplerKind::from_str("cubic", false).is_err());
    }
}
