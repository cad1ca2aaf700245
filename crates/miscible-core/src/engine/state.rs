use crate::core::models::composition::Composition;
use crate::core::models::lattice::Lattice;
use std::fmt;

/// Classification of a target composition at one temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stability {
    Unstable,
    Stable,
    #[default]
    Unknown,
}

impl Stability {
    pub fn from_energy_above_hull(energy: f64, tolerance: f64) -> Self {
        if !energy.is_finite() {
            Stability::Unknown
        } else if energy <= tolerance {
            Stability::Stable
        } else {
            Stability::Unstable
        }
    }

    #[inline]
    pub fn is_stable(&self) -> bool {
        matches!(self, Stability::Stable)
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stability::Unstable => "unstable",
            Stability::Stable => "stable",
            Stability::Unknown => "unknown",
        })
    }
}

/// One hull evaluation of the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub temperature: f64,
    pub energy_above_hull: f64,
    pub stability: Stability,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MiscibilityOutcome {
    /// Stable above `temperature`, unstable below it.
    Transition { temperature: f64 },
    /// Already stable at the lower bound.
    NeverDecomposes { upper_bound: f64 },
    /// Still unstable at the upper bound, i.e. the alloy melts before it mixes.
    MeltsBeforeMixing { upper_bound: f64 },
}

impl MiscibilityOutcome {
    /// `(temperature, flag)`: the flag is set for the sentinel outcomes, whose
    /// temperature is the upper search bound.
    pub fn as_pair(&self) -> (f64, bool) {
        match *self {
            MiscibilityOutcome::Transition { temperature } => (temperature, false),
            MiscibilityOutcome::NeverDecomposes { upper_bound }
            | MiscibilityOutcome::MeltsBeforeMixing { upper_bound } => (upper_bound, true),
        }
    }

    pub fn temperature(&self) -> Option<f64> {
        match *self {
            MiscibilityOutcome::Transition { temperature } => Some(temperature),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MiscibilityOutcome::Transition { .. } => "transition",
            MiscibilityOutcome::NeverDecomposes { .. } => "never-decomposes",
            MiscibilityOutcome::MeltsBeforeMixing { .. } => "melts-before-mixing",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MiscibilityResult {
    pub composition: Composition,
    pub lattice: Lattice,
    pub outcome: MiscibilityOutcome,
    pub bounds: (f64, f64),
    pub iterations: usize,
    /// Every probe in evaluation order.
    pub probes: Vec<Probe>,
}

impl MiscibilityResult {
    /// Probes sorted by temperature.
    pub fn trace(&self) -> Vec<Probe> {
        let mut probes = self.probes.clone();
        probes.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));
        probes
    }
}
