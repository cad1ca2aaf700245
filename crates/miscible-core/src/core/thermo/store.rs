use super::model::SolutionModel;
use crate::core::models::composition::Composition;
use crate::core::models::element::{Element, ElementError};
use crate::core::models::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum InteractionError {
    #[error("No interaction parameter for pair {pair} on the {lattice} lattice")]
    Missing { pair: PairKey, lattice: Lattice },
    #[error("Invalid pair key '{0}': expected two element symbols joined by '-'")]
    InvalidPairKey(String),
    #[error("Invalid pair key: {0}")]
    InvalidElement(#[from] ElementError),
    #[error("A pair must contain two distinct elements, got {0}-{0}")]
    SelfPair(Element),
    #[error("No interaction table for the {0} lattice")]
    UnknownLattice(Lattice),
}

/// Unordered element pair, stored with its symbols sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    first: Element,
    second: Element,
}

impl PairKey {
    pub fn new(a: Element, b: Element) -> Result<Self, InteractionError> {
        if a == b {
            return Err(InteractionError::SelfPair(a));
        }
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    #[inline]
    pub fn first(&self) -> &Element {
        &self.first
    }

    #[inline]
    pub fn second(&self) -> &Element {
        &self.second
    }

    /// True when `(a, b)` is already in canonical order.
    fn is_canonical(a: &Element, b: &Element) -> bool {
        a <= b
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

impl FromStr for PairKey {
    type Err = InteractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) => Self::new(Element::new(a)?, Element::new(b)?),
            _ => Err(InteractionError::InvalidPairKey(s.to_string())),
        }
    }
}

/// Pair interaction parameter in eV/atom.
///
/// For the sub-regular form `omega1` refers to the canonical order of the pair:
/// `H = x_a x_b (omega0 + omega1 (x_a - x_b))` with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Interaction {
    Regular { omega: f64 },
    SubRegular { omega0: f64, omega1: f64 },
}

impl Interaction {
    pub const ZERO: Interaction = Interaction::Regular { omega: 0.0 };

    #[inline]
    pub fn omega0(&self) -> f64 {
        match *self {
            Interaction::Regular { omega } => omega,
            Interaction::SubRegular { omega0, .. } => omega0,
        }
    }

    #[inline]
    pub fn omega1(&self) -> f64 {
        match *self {
            Interaction::Regular { .. } => 0.0,
            Interaction::SubRegular { omega1, .. } => omega1,
        }
    }

    /// Same interaction seen from the opposite element order.
    pub fn reversed(self) -> Self {
        match self {
            Interaction::Regular { .. } => self,
            Interaction::SubRegular { omega0, omega1 } => Interaction::SubRegular {
                omega0,
                omega1: -omega1,
            },
        }
    }

    /// Excess enthalpy of the pair, `x_first` and `x_second` in canonical order.
    pub fn excess_enthalpy(&self, x_first: f64, x_second: f64, model: SolutionModel) -> f64 {
        let product = x_first * x_second;
        match model {
            SolutionModel::Regular => self.omega0() * product,
            SolutionModel::SubRegular => {
                product * (self.omega0() + self.omega1() * (x_first - x_second))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingInteractionPolicy {
    /// Fail with [`InteractionError::Missing`].
    #[default]
    Fail,
    /// Treat the pair as ideal (zero interaction).
    Zero,
}

/// Pairwise mixing parameters and unary reference energies for one lattice.
#[derive(Debug, Clone)]
pub struct PairwiseEnthalpyStore {
    lattice: Lattice,
    interactions: HashMap<PairKey, Interaction>,
    unaries: HashMap<Element, f64>,
    missing_policy: MissingInteractionPolicy,
}

impl PairwiseEnthalpyStore {
    pub fn new(lattice: Lattice) -> Self {
        Self {
            lattice,
            interactions: HashMap::new(),
            unaries: HashMap::new(),
            missing_policy: MissingInteractionPolicy::default(),
        }
    }

    pub fn with_missing_policy(mut self, policy: MissingInteractionPolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    pub fn set_missing_policy(&mut self, policy: MissingInteractionPolicy) {
        self.missing_policy = policy;
    }

    #[inline]
    pub fn lattice(&self) -> Lattice {
        self.lattice
    }

    #[inline]
    pub fn missing_policy(&self) -> MissingInteractionPolicy {
        self.missing_policy
    }

    /// Stores `interaction` as given for the order `(a, b)`; returns the previous value.
    pub fn insert(
        &mut self,
        a: Element,
        b: Element,
        interaction: Interaction,
    ) -> Result<Option<Interaction>, InteractionError> {
        let canonical = PairKey::is_canonical(&a, &b);
        let key = PairKey::new(a, b)?;
        let interaction = if canonical {
            interaction
        } else {
            interaction.reversed()
        };
        Ok(self.interactions.insert(key, interaction))
    }

    pub fn set_unary(&mut self, element: Element, energy: f64) {
        self.unaries.insert(element, energy);
    }

    /// Interaction in the canonical order of `key`.
    pub fn get(&self, key: &PairKey) -> Result<Interaction, InteractionError> {
        match self.interactions.get(key) {
            Some(interaction) => Ok(*interaction),
            None => match self.missing_policy {
                MissingInteractionPolicy::Fail => Err(InteractionError::Missing {
                    pair: key.clone(),
                    lattice: self.lattice,
                }),
                MissingInteractionPolicy::Zero => {
                    trace!(pair = %key, lattice = %self.lattice, "Missing interaction treated as zero");
                    Ok(Interaction::ZERO)
                }
            },
        }
    }

    pub fn get_pair(&self, a: &Element, b: &Element) -> Result<Interaction, InteractionError> {
        self.get(&PairKey::new(a.clone(), b.clone())?)
    }

    /// Unary reference energy in eV/atom; 0 when not set.
    pub fn get_unary(&self, element: &Element) -> f64 {
        self.unaries.get(element).copied().unwrap_or(0.0)
    }

    /// Pairs among `elements` with no stored interaction, in canonical order.
    pub fn missing_pairs(&self, elements: &[Element]) -> Vec<PairKey> {
        let mut missing: Vec<PairKey> = elements
            .iter()
            .enumerate()
            .flat_map(|(i, a)| elements[i + 1..].iter().map(move |b| (a, b)))
            .filter_map(|(a, b)| PairKey::new(a.clone(), b.clone()).ok())
            .filter(|key| !self.interactions.contains_key(key))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&PairKey, &Interaction)> {
        self.interactions.iter()
    }
}

/// Enthalpy tables for every lattice plus optional melting-point overrides (K).
#[derive(Debug, Clone, Default)]
pub struct EnthalpyDatabase {
    stores: BTreeMap<Lattice, PairwiseEnthalpyStore>,
    melting_points: HashMap<Element, f64>,
}

impl EnthalpyDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_store(&mut self, store: PairwiseEnthalpyStore) {
        self.stores.insert(store.lattice(), store);
    }

    pub fn store(&self, lattice: Lattice) -> Result<&PairwiseEnthalpyStore, InteractionError> {
        self.stores
            .get(&lattice)
            .ok_or(InteractionError::UnknownLattice(lattice))
    }

    pub fn store_mut_or_insert(&mut self, lattice: Lattice) -> &mut PairwiseEnthalpyStore {
        self.stores
            .entry(lattice)
            .or_insert_with(|| PairwiseEnthalpyStore::new(lattice))
    }

    pub fn lattices(&self) -> impl Iterator<Item = Lattice> + '_ {
        self.stores.keys().copied()
    }

    pub fn set_missing_policy(&mut self, policy: MissingInteractionPolicy) {
        for store in self.stores.values_mut() {
            store.set_missing_policy(policy);
        }
    }

    pub fn set_melting_point(&mut self, element: Element, kelvin: f64) {
        self.melting_points.insert(element, kelvin);
    }

    /// Override from the database, otherwise the built-in table.
    pub fn melting_point(&self, element: &Element) -> Option<f64> {
        self.melting_points
            .get(element)
            .copied()
            .or_else(|| super::melting::melting_point(element.symbol()))
    }

    /// Mole-fraction weighted melting point; `None` if any element is unknown.
    pub fn mixture_melting_point(&self, composition: &Composition) -> Option<f64> {
        composition
            .iter()
            .map(|(element, x)| self.melting_point(element).map(|t| t * x))
            .sum()
    }
}
