use std::ops::{Add, AddAssign};

/// Breakdown of a Gibbs free energy per atom into its contributions (eV/atom).
///
/// `entropy_term` is `T * S_config`, so it enters the total with a negative sign.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GibbsTerm {
    pub mixing_enthalpy: f64,
    pub reference_energy: f64,
    pub entropy_term: f64,
}

impl GibbsTerm {
    pub fn new(mixing_enthalpy: f64, reference_energy: f64, entropy_term: f64) -> Self {
        Self {
            mixing_enthalpy,
            reference_energy,
            entropy_term,
        }
    }

    #[inline]
    pub fn enthalpy(&self) -> f64 {
        self.mixing_enthalpy + self.reference_energy
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.enthalpy() - self.entropy_term
    }
}

impl Add for GibbsTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            mixing_enthalpy: self.mixing_enthalpy + rhs.mixing_enthalpy,
            reference_energy: self.reference_energy + rhs.reference_energy,
            entropy_term: self.entropy_term + rhs.entropy_term,
        }
    }
}

impl AddAssign for GibbsTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.mixing_enthalpy += rhs.mixing_enthalpy;
        self.reference_energy += rhs.reference_energy;
        self.entropy_term += rhs.entropy_term;
    }
}
