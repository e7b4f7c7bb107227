use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sample – one measured step of the gray ramp
// ---------------------------------------------------------------------------

/// A single measured patch: input level (0–100 %) and the L* read from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Input gray level in percent.
    pub input: f64,
    /// Measured lightness (0 = black, 100 = white).
    pub lstar: f64,
}

impl Sample {
    pub fn new(input: f64, lstar: f64) -> Self {
        Self { input, lstar }
    }
}

// ---------------------------------------------------------------------------
// Measurements – the loaded L* ramp
// ---------------------------------------------------------------------------

/// A measured lightness ramp, sorted ascending by input level.
#[derive(Debug, Clone, Default)]
pub struct Measurements {
    pub samples: Vec<Sample>,
    /// File name the ramp was read from, for display.
    pub source: Option<String>,
}

impl Measurements {
    /// Build a ramp from unordered samples. Sorting is stable, so duplicate
    /// input levels keep their file order.
    pub fn from_samples(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| a.input.total_cmp(&b.input));
        Measurements {
            samples,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn inputs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.input).collect()
    }

    pub fn lstar(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.lstar).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ChannelCurve / QuadProfile – the ink-draw curves
// ---------------------------------------------------------------------------

/// One ink channel's draw curve over the discretised input domain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCurve {
    pub name: String,
    /// Non-negative draw values, index 0 = 0 % input, last index = 100 %.
    pub draws: Vec<f64>,
}

impl ChannelCurve {
    pub fn new(name: impl Into<String>, draws: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            draws,
        }
    }

    /// Largest draw value on the curve (0 for an empty curve).
    pub fn peak(&self) -> f64 {
        self.draws.iter().copied().fold(0.0, f64::max)
    }
}

/// All channels of a `.quad` file, in file order.
///
/// The order is significant: it is the channel iteration order the solver
/// uses to break ties.
#[derive(Debug, Clone, Default)]
pub struct QuadProfile {
    pub channels: Vec<ChannelCurve>,
    pub source: Option<String>,
}

impl QuadProfile {
    pub fn new(channels: Vec<ChannelCurve>) -> Self {
        Self {
            channels,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelCurve> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
