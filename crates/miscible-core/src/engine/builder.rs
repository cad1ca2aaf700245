use super::config::{MiscibilityConfig, MoleRatioMode};
use super::error::EngineError;
use crate::core::grid::{canonical_elements, create_mol_grid, equimolar_subsystems};
use crate::core::models::composition::Composition;
use crate::core::models::element::Element;
use crate::core::models::entry::{PhaseEntry, ReferencePhase};
use crate::core::models::lattice::Lattice;
use crate::core::thermo::model::ThermoModel;
use crate::core::thermo::store::{EnthalpyDatabase, MissingInteractionPolicy, PairKey};
use tracing::{trace, warn};

/// Builds the candidate phases of an element subsystem at one temperature.
///
/// Holds only borrowed, read-only inputs; every call returns fresh entries.
#[derive(Debug, Clone, Copy)]
pub struct PhaseEntryBuilder<'a> {
    model: ThermoModel<'a>,
    references: &'a [ReferencePhase],
    config: &'a MiscibilityConfig,
}

impl<'a> PhaseEntryBuilder<'a> {
    pub fn new(
        database: &'a EnthalpyDatabase,
        references: &'a [ReferencePhase],
        config: &'a MiscibilityConfig,
    ) -> Self {
        Self {
            model: ThermoModel::new(database, config.model.solution_model),
            references,
            config,
        }
    }

    #[inline]
    pub fn model(&self) -> &ThermoModel<'a> {
        &self.model
    }

    /// Lattices whose solutions compete on the hull.
    pub fn competing_lattices(&self) -> Vec<Lattice> {
        match &self.config.model.competing_lattices {
            Some(lattices) => lattices.clone(),
            None => self.model.database().lattices().collect(),
        }
    }

    /// Pairs of `elements` that will be evaluated as zero interactions on `target`
    /// or any competing lattice because the store falls back instead of failing.
    pub fn zero_filled_pairs(
        &self,
        elements: &[Element],
        target: Option<Lattice>,
    ) -> Vec<(Lattice, PairKey)> {
        let mut lattices = self.competing_lattices();
        lattices.extend(target);
        lattices.sort();
        lattices.dedup();
        lattices
            .into_iter()
            .filter_map(|lattice| self.model.database().store(lattice).ok())
            .filter(|store| store.missing_policy() == MissingInteractionPolicy::Zero)
            .flat_map(|store| {
                store
                    .missing_pairs(elements)
                    .into_iter()
                    .map(move |pair| (store.lattice(), pair))
            })
            .collect()
    }

    /// Logs every zero-filled pair of the subsystem once.
    pub fn warn_zero_filled_pairs(&self, elements: &[Element], target: Option<Lattice>) -> usize {
        let pairs = self.zero_filled_pairs(elements, target);
        for (lattice, pair) in &pairs {
            warn!(pair = %pair, lattice = %lattice, "Missing interaction treated as zero");
        }
        pairs.len()
    }

    /// Compositions sampled for the solid solution over `elements`; always includes
    /// the pure-element corners.
    pub fn solution_compositions(&self, elements: &[Element]) -> Result<Vec<Composition>, EngineError> {
        let elements = canonical_elements(elements)?;
        let compositions = match self.config.grid.mode {
            MoleRatioMode::General => {
                create_mol_grid(elements.len(), self.config.grid.density)?.compositions(&elements)?
            }
            MoleRatioMode::Equimolar => equimolar_subsystems(&elements, elements.len())?,
        };
        Ok(compositions)
    }

    /// Solution entries on `lattice` plus the reference phases inside the subsystem.
    pub fn build_entries(
        &self,
        elements: &[Element],
        temperature: f64,
        lattice: Lattice,
    ) -> Result<Vec<PhaseEntry>, EngineError> {
        let compositions = self.solution_compositions(elements)?;
        let mut entries = self.solution_entries(&compositions, temperature, lattice)?;
        entries.extend(self.reference_entries(elements));
        Ok(entries)
    }

    /// Solution entries on every competing lattice plus the reference phases.
    pub fn build_competing_entries(
        &self,
        elements: &[Element],
        temperature: f64,
    ) -> Result<Vec<PhaseEntry>, EngineError> {
        let compositions = self.solution_compositions(elements)?;
        let mut entries = Vec::new();
        for lattice in self.competing_lattices() {
            entries.extend(self.solution_entries(&compositions, temperature, lattice)?);
        }
        entries.extend(self.reference_entries(elements));
        trace!(
            temperature,
            entries = entries.len(),
            "Built competing phase entries"
        );
        Ok(entries)
    }

    /// Solution entry of a single composition.
    pub fn solution_entry(
        &self,
        composition: &Composition,
        temperature: f64,
        lattice: Lattice,
    ) -> Result<PhaseEntry, EngineError> {
        let energy = self.model.gibbs_energy(composition, temperature, lattice)?;
        Ok(PhaseEntry::solution(composition.clone(), energy, lattice))
    }

    fn solution_entries(
        &self,
        compositions: &[Composition],
        temperature: f64,
        lattice: Lattice,
    ) -> Result<Vec<PhaseEntry>, EngineError> {
        compositions
            .iter()
            .map(|composition| self.solution_entry(composition, temperature, lattice))
            .collect()
    }

    fn reference_entries<'b>(
        &'b self,
        elements: &'b [Element],
    ) -> impl Iterator<Item = PhaseEntry> + 'b {
        self.references
            .iter()
            .filter(move |phase| self.config.model.include_references && phase.is_within(elements))
            .map(PhaseEntry::reference)
    }
}
