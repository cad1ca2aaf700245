use super::store::{EnthalpyDatabase, InteractionError, PairKey, PairwiseEnthalpyStore};
use super::term::GibbsTerm;
use crate::core::models::composition::Composition;
use crate::core::models::lattice::Lattice;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boltzmann constant in eV/K.
pub const BOLTZMANN_EV_PER_K: f64 = 8.617e-5;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ThermoError {
    #[error(transparent)]
    Interaction(#[from] InteractionError),
    #[error("Temperature must be finite and non-negative, got {0} K")]
    InvalidTemperature(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolutionModel {
    /// `H = sum omega x_i x_j`; any asymmetric coefficient is ignored.
    #[default]
    Regular,
    /// `H = sum x_i x_j (omega0 + omega1 (x_i - x_j))`.
    SubRegular,
}

/// Ideal configurational entropy `-sum x ln x` in units of k_B, with `0 ln 0 = 0`.
pub fn ideal_entropy(composition: &Composition) -> f64 {
    -composition
        .iter()
        .map(|(_, x)| x.clamp(0.0, 1.0))
        .filter(|&x| x > 0.0)
        .map(|x| x * x.ln())
        .sum::<f64>()
}

/// Gibbs free energy of a disordered solid solution in the mean-field pair model.
#[derive(Debug, Clone, Copy)]
pub struct ThermoModel<'a> {
    database: &'a EnthalpyDatabase,
    solution_model: SolutionModel,
}

impl<'a> ThermoModel<'a> {
    pub fn new(database: &'a EnthalpyDatabase, solution_model: SolutionModel) -> Self {
        Self {
            database,
            solution_model,
        }
    }

    #[inline]
    pub fn database(&self) -> &'a EnthalpyDatabase {
        self.database
    }

    #[inline]
    pub fn solution_model(&self) -> SolutionModel {
        self.solution_model
    }

    /// G in eV/atom of `composition` on `lattice` at `temperature` K.
    pub fn gibbs_energy(
        &self,
        composition: &Composition,
        temperature: f64,
        lattice: Lattice,
    ) -> Result<f64, ThermoError> {
        Ok(self.gibbs_terms(composition, temperature, lattice)?.total())
    }

    pub fn gibbs_terms(
        &self,
        composition: &Composition,
        temperature: f64,
        lattice: Lattice,
    ) -> Result<GibbsTerm, ThermoError> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(ThermoError::InvalidTemperature(temperature));
        }
        let store = self.database.store(lattice)?;
        let mixing_enthalpy = self.mixing_enthalpy_in(store, composition)?;
        let reference_energy = unary_reference_energy(store, composition);
        let entropy_term = temperature * BOLTZMANN_EV_PER_K * ideal_entropy(composition);
        Ok(GibbsTerm::new(
            mixing_enthalpy,
            reference_energy,
            entropy_term,
        ))
    }

    pub fn enthalpy_of_mixing(
        &self,
        composition: &Composition,
        lattice: Lattice,
    ) -> Result<f64, ThermoError> {
        let store = self.database.store(lattice)?;
        self.mixing_enthalpy_in(store, composition)
    }

    fn mixing_enthalpy_in(
        &self,
        store: &PairwiseEnthalpyStore,
        composition: &Composition,
    ) -> Result<f64, ThermoError> {
        // Composition iterates in symbol order, so every pair comes out canonical.
        let components: Vec<_> = composition
            .iter()
            .map(|(element, x)| (element, x.clamp(0.0, 1.0)))
            .collect();
        components
            .iter()
            .tuple_combinations()
            .map(|(&(a, xa), &(b, xb))| -> Result<f64, ThermoError> {
                let interaction = store.get(&PairKey::new(a.clone(), b.clone())?)?;
                Ok(interaction.excess_enthalpy(xa, xb, self.solution_model))
            })
            .sum()
    }
}

/// `sum x_i E_i` over the unary reference energies of `store`.
pub fn unary_reference_energy(store: &PairwiseEnthalpyStore, composition: &Composition) -> f64 {
    composition
        .iter()
        .map(|(element, x)| x * store.get_unary(element))
        .sum()
}
