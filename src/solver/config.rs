//! Solver parameters and their validation.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::sampler::SamplerKind;

/// How a channel's calibrated rate becomes its allocation budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantMode {
    /// Share-weighted residual over the steps where the channel's share
    /// reaches the threshold that earned its evidence: the density it
    /// explains where it leads.
    #[default]
    EvidenceWindow,
    /// The share-weighted residual per unit share, used directly.
    ResidualRate,
}

impl ConstantMode {
    pub const ALL: [ConstantMode; 2] = [ConstantMode::EvidenceWindow, ConstantMode::ResidualRate];

    pub fn label(self) -> &'static str {
        match self {
            ConstantMode::EvidenceWindow => "Evidence window",
            ConstantMode::ResidualRate => "Residual rate",
        }
    }
}

/// Tunables for one solve.  Every field has a default, so a config file may
/// name only the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Share at or above which a step counts as solo evidence.
    pub dominance_threshold: f64,
    /// Share at or above which a step counts as supporting evidence.
    pub support_threshold: f64,
    /// Shares at or below this are ignored by calibration and allocation.
    pub min_share_threshold: f64,
    pub epsilon: f64,
    /// Hard cap on waterfilling rounds per step.
    pub max_allocation_rounds: usize,
    pub constant_mode: ConstantMode,
    /// Draw lookup used by the share engine.
    pub sampler: SamplerKind,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dominance_threshold: 0.90,
            support_threshold: 0.20,
            min_share_threshold: 0.01,
            epsilon: 1e-6,
            max_allocation_rounds: 8,
            constant_mode: ConstantMode::EvidenceWindow,
            sampler: SamplerKind::Nearest,
        }
    }
}

impl SolverConfig {
    /// Clamp out-of-range values in place and describe each correction.
    pub fn sanitize(&mut self) -> Vec<String> {
        let defaults = Self::default();
        let mut warnings = Vec::new();

        for (name, value, fallback) in [
            ("dominance_threshold", &mut self.dominance_threshold, defaults.dominance_threshold),
            ("support_threshold", &mut self.support_threshold, defaults.support_threshold),
            ("min_share_threshold", &mut self.min_share_threshold, defaults.min_share_threshold),
        ] {
            if !value.is_finite() {
                warnings.push(format!("{name} is not finite, using {fallback}"));
                *value = fallback;
            } else if !(0.0..=1.0).contains(&*value) {
                let clamped = value.clamp(0.0, 1.0);
                warnings.push(format!("{name} {value} clamped to {clamped}"));
                *value = clamped;
            }
        }

        if self.support_threshold > self.dominance_threshold {
            warnings.push(format!(
                "support_threshold {} exceeds dominance_threshold, lowered to {}",
                self.support_threshold, self.dominance_threshold
            ));
            self.support_threshold = self.dominance_threshold;
        }

        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            warnings.push(format!("epsilon {} must be positive, using {}", self.epsilon, defaults.epsilon));
            self.epsilon = defaults.epsilon;
        }

        if self.max_allocation_rounds == 0 {
            warnings.push("max_allocation_rounds must be at least 1, using 1".to_string());
            self.max_allocation_rounds = 1;
        }

        warnings
    }

    pub fn sanitized(mut self) -> Self {
        for warning in self.sanitize() {
            log::warn!("solver config: {warning}");
        }
        self
    }
}

/// Read a JSON solver config, sanitised.
pub fn load_config(path: &Path) -> Result<SolverConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading solver config {}", path.display()))?;
    let config: SolverConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing solver config {}", path.display()))?;
    log::info!("Loaded solver config from {}", path.display());
    Ok(config.sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_calibration_practice() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.dominance_threshold, 0.90);
        assert_eq!(cfg.support_threshold, 0.20);
        assert_eq!(cfg.min_share_threshold, 0.01);
        assert_eq!(cfg.epsilon, 1e-6);
        assert_eq!(cfg.max_allocation_rounds, 8);
        assert_eq!(cfg.constant_mode, ConstantMode::EvidenceWindow);
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg: SolverConfig =
            serde_json::from_str(r#"{"dominance_threshold": 0.8, "constant_mode": "residual_rate"}"#)
                .unwrap();
        assert_eq!(
            cfg,
            SolverConfig {
                dominance_threshold: 0.8,
                constant_mode: ConstantMode::ResidualRate,
                ..SolverConfig::default()
            }
        );
    }

    #[test]
    fn sanitize_clamps_and_reports() {
        let mut cfg = SolverConfig {
            dominance_threshold: 1.4,
            support_threshold: 0.95,
            min_share_threshold: -0.1,
            epsilon: 0.0,
            max_allocation_rounds: 0,
            ..SolverConfig::default()
        };
        let warnings = cfg.sanitize();
        assert_eq!(warnings.len(), 4);
        assert_eq!(cfg.dominance_threshold, 1.0);
        assert_eq!(cfg.support_threshold, 0.95);
        assert_eq!(cfg.min_share_threshold, 0.0);
        assert_eq!(cfg.epsilon, 1e-6);
        assert_eq!(cfg.max_allocation_rounds, 1);
    }

    #[test]
    fn support_never_exceeds_dominance() {
        let mut cfg = SolverConfig {
            dominance_threshold: 0.5,
            support_threshold: 0.6,
            ..SolverConfig::default()
        };
        let warnings = cfg.sanitize();
        assert_eq!(warnings.len(), 1);
        assert_eq!(cfg.support_threshold, 0.5);
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.json");
        std::fs::write(&path, r#"{"max_allocation_rounds": 0, "sampler": "linear"}"#).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.max_allocation_rounds, 1);
        assert_eq!(cfg.sampler, SamplerKind::Linear);
    }
}
