use crate::data::model::Sample;

/// Per-step density decrements of an L* ramp sorted by input.
///
/// `delta[0] = 0`, `delta[i] = max(0, L*[i-1] - L*[i])`.  A lightness
/// reversal is clipped to zero, never recorded as negative density.
pub fn extract_deltas(samples: &[Sample]) -> Vec<f64> {
    let mut deltas = Vec::with_capacity(samples.len());
    if let Some(first) = samples.first() {
        deltas.push(0.0);
        let mut prev = first.lstar;
        for sample in &samples[1..] {
            deltas.push((prev - sample.lstar).max(0.0));
            prev = sample.lstar;
        }
    }
    deltas
}

/// Total measured density, the sum of all decrements.
pub fn total_density(deltas: &[f64]) -> f64 {
    deltas.iter().sum()
}
