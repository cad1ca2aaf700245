//! # Convex Hull Module
//!
//! Lower convex hull of phase entries in (composition, energy) space.
//!
//! Each entry of a k-element system is lifted to a point whose first k-1
//! coordinates are mole fractions (the last element is implied) and whose last
//! coordinate is the energy per atom. A single ceiling point above the centroid
//! closes the hull from above, so inputs whose energies are all coplanar still
//! span the full dimension. Facets that avoid the ceiling and face downward in
//! energy form the lower hull; the energy above hull of an entry is its distance,
//! along the energy axis, to the facet below it.

mod quickhull;

use crate::core::models::composition::{Composition, CompositionError};
use crate::core::models::element::Element;
use crate::core::models::entry::PhaseEntry;
use nalgebra::{DMatrix, DVector};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, instrument};

/// Entries at the same composition whose energies differ by less than this are ties.
pub const ENERGY_TOLERANCE: f64 = 1e-6;

/// Barycentric weights above `-BARYCENTRIC_TOLERANCE` count as inside a facet.
const BARYCENTRIC_TOLERANCE: f64 = 1e-9;

/// Last-resort tolerance when no facet strictly contains a composition.
const BARYCENTRIC_FALLBACK: f64 = 1e-6;

/// Energy component a lower facet normal must fall below.
const LOWER_NORMAL_EPSILON: f64 = 1e-12;

const COMPOSITION_KEY_SCALE: f64 = 1e9;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum HullError {
    #[error("Cannot build a convex hull from an empty set of entries")]
    Empty,
    #[error(
        "Degenerate hull in {dimension} dimension(s): {found} affinely independent point(s), {required} required"
    )]
    Degenerate {
        dimension: usize,
        required: usize,
        found: usize,
    },
    #[error("Entry {0} has a non-finite energy")]
    NonFiniteEnergy(usize),
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error("Entry index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("No lower facet covers the composition {0}")]
    Uncovered(String),
    #[error("Hull construction produced a flat facet")]
    NumericalInstability,
}

/// A facet of the lower hull, stored with the inverse of its barycentric map.
#[derive(Debug, Clone)]
pub struct LowerFacet {
    vertices: Vec<usize>,
    energies: Vec<f64>,
    origin: DVector<f64>,
    inverse: DMatrix<f64>,
}

impl LowerFacet {
    /// Entry indices of the facet vertices.
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    fn barycentric(&self, coordinates: &DVector<f64>) -> Vec<f64> {
        if self.origin.is_empty() {
            return vec![1.0];
        }
        let tail = &self.inverse * (coordinates - &self.origin);
        let mut weights = Vec::with_capacity(tail.len() + 1);
        weights.push(1.0 - tail.sum());
        weights.extend(tail.iter().copied());
        weights
    }

    fn interpolate(&self, weights: &[f64]) -> f64 {
        weights.iter().zip(&self.energies).map(|(w, e)| w * e).sum()
    }
}

/// One phase an entry decomposes into, with its molar share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecompositionProduct {
    pub index: usize,
    pub fraction: f64,
}

/// Hull phases a composition separates into and the hull energy there.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub products: Vec<DecompositionProduct>,
    pub hull_energy: f64,
}

/// The lower convex hull of a set of phase entries.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    elements: Vec<Element>,
    entries: Vec<PhaseEntry>,
    coordinates: Vec<DVector<f64>>,
    facets: Vec<LowerFacet>,
    energies_above_hull: Vec<f64>,
    on_hull: Vec<bool>,
}

/// Builds the lower convex hull of `entries`.
///
/// Coincident entries (same composition, energies within [`ENERGY_TOLERANCE`])
/// share one representative: a reference phase wins over a solution sample,
/// otherwise the earlier entry wins. Only representatives can be hull vertices.
#[instrument(skip_all, name = "convex_hull", fields(entries = entries.len()))]
pub fn compute_hull(entries: Vec<PhaseEntry>) -> Result<ConvexHull, HullError> {
    if entries.is_empty() {
        return Err(HullError::Empty);
    }
    if let Some(index) = entries.iter().position(|e| !e.energy.is_finite()) {
        return Err(HullError::NonFiniteEnergy(index));
    }

    let elements: Vec<Element> = entries
        .iter()
        .flat_map(|entry| entry.composition.elements().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let k = elements.len();

    let coordinates = entries
        .iter()
        .map(|entry| composition_coordinates(&entry.composition, &elements))
        .collect::<Result<Vec<_>, _>>()?;
    let representatives = select_representatives(&entries, &coordinates);

    let facets = if k == 1 {
        let index = representatives[0];
        vec![LowerFacet {
            vertices: vec![index],
            energies: vec![entries[index].energy],
            origin: DVector::zeros(0),
            inverse: DMatrix::zeros(0, 0),
        }]
    } else {
        lower_facets(&entries, &coordinates, &representatives, k)?
    };

    let mut hull = ConvexHull {
        elements,
        entries,
        coordinates,
        facets,
        energies_above_hull: Vec::new(),
        on_hull: Vec::new(),
    };
    hull.classify()?;

    debug!(
        elements = hull.elements.len(),
        facets = hull.facets.len(),
        vertices = hull.hull_vertices().len(),
        "Convex hull computed"
    );
    Ok(hull)
}

fn composition_coordinates(
    composition: &Composition,
    elements: &[Element],
) -> Result<DVector<f64>, CompositionError> {
    let fractions = composition.fractions_in(elements)?;
    let free = fractions.len().saturating_sub(1);
    Ok(DVector::from_column_slice(&fractions[..free]))
}

fn composition_key(coordinates: &DVector<f64>) -> Vec<i64> {
    coordinates
        .iter()
        .map(|x| (x * COMPOSITION_KEY_SCALE).round() as i64)
        .collect()
}

fn select_representatives(entries: &[PhaseEntry], coordinates: &[DVector<f64>]) -> Vec<usize> {
    let mut chosen: BTreeMap<Vec<i64>, usize> = BTreeMap::new();
    for (index, entry) in entries.iter().enumerate() {
        let key = composition_key(&coordinates[index]);
        match chosen.get_mut(&key) {
            None => {
                chosen.insert(key, index);
            }
            Some(current) => {
                let incumbent = &entries[*current];
                let lower = entry.energy < incumbent.energy - ENERGY_TOLERANCE;
                let tie = (entry.energy - incumbent.energy).abs() <= ENERGY_TOLERANCE;
                if lower || (tie && entry.is_reference() && !incumbent.is_reference()) {
                    *current = index;
                }
            }
        }
    }
    let mut representatives: Vec<usize> = chosen.into_values().collect();
    representatives.sort_unstable();
    representatives
}

fn lower_facets(
    entries: &[PhaseEntry],
    coordinates: &[DVector<f64>],
    representatives: &[usize],
    k: usize,
) -> Result<Vec<LowerFacet>, HullError> {
    let free = k - 1;
    let compositions: Vec<DVector<f64>> = representatives
        .iter()
        .map(|&i| coordinates[i].clone())
        .collect();
    let rank = quickhull::affinely_independent(&compositions, free).len();
    if rank < k {
        return Err(HullError::Degenerate {
            dimension: k,
            required: k,
            found: rank,
        });
    }

    let energies: Vec<f64> = representatives.iter().map(|&i| entries[i].energy).collect();
    let (min_energy, max_energy) = energies
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &e| {
            (lo.min(e), hi.max(e))
        });
    let centroid = compositions
        .iter()
        .fold(DVector::<f64>::zeros(free), |acc, c| acc + c)
        / compositions.len() as f64;
    let ceiling_energy = max_energy + (max_energy - min_energy).max(1.0);

    let mut lifted: Vec<DVector<f64>> = compositions
        .iter()
        .zip(&energies)
        .map(|(c, &e)| lift(c, e))
        .collect();
    let ceiling = lifted.len();
    lifted.push(lift(&centroid, ceiling_energy));

    let mut facets = Vec::new();
    for facet in quickhull::quickhull(&lifted)? {
        if facet.vertices.contains(&ceiling) || facet.normal[free] >= -LOWER_NORMAL_EPSILON {
            continue;
        }
        let vertices: Vec<usize> = facet.vertices.iter().map(|&p| representatives[p]).collect();
        let origin = coordinates[vertices[0]].clone();
        let mut edges = DMatrix::<f64>::zeros(free, free);
        for (column, &v) in vertices[1..].iter().enumerate() {
            edges.set_column(column, &(&coordinates[v] - &origin));
        }
        // A vertical facet cannot carry energy; skipping it leaves no gap below.
        let Some(inverse) = edges.try_inverse() else {
            continue;
        };
        facets.push(LowerFacet {
            energies: vertices.iter().map(|&v| entries[v].energy).collect(),
            vertices,
            origin,
            inverse,
        });
    }
    Ok(facets)
}

fn lift(composition: &DVector<f64>, energy: f64) -> DVector<f64> {
    let mut point = DVector::<f64>::zeros(composition.len() + 1);
    point.rows_mut(0, composition.len()).copy_from(composition);
    point[composition.len()] = energy;
    point
}

impl ConvexHull {
    fn classify(&mut self) -> Result<(), HullError> {
        let vertices: BTreeSet<usize> = self
            .facets
            .iter()
            .flat_map(|facet| facet.vertices.iter().copied())
            .collect();

        let mut energies = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            if vertices.contains(&index) {
                energies.push(0.0);
                continue;
            }
            let (facet, weights) = self
                .locate(&self.coordinates[index])
                .ok_or_else(|| HullError::Uncovered(entry.label()))?;
            energies.push((entry.energy - facet.interpolate(&weights)).max(0.0));
        }

        self.on_hull = (0..self.entries.len())
            .map(|i| vertices.contains(&i))
            .collect();
        self.energies_above_hull = energies;
        Ok(())
    }

    /// First facet whose simplex contains `coordinates`, falling back to the closest
    /// one when rounding leaves the point just outside every facet.
    fn locate(&self, coordinates: &DVector<f64>) -> Option<(&LowerFacet, Vec<f64>)> {
        let mut best: Option<(&LowerFacet, Vec<f64>, f64)> = None;
        for facet in &self.facets {
            let weights = facet.barycentric(coordinates);
            let min_weight = weights.iter().copied().fold(f64::INFINITY, f64::min);
            if min_weight >= -BARYCENTRIC_TOLERANCE {
                return Some((facet, weights));
            }
            if best.as_ref().is_none_or(|(_, _, m)| min_weight > *m) {
                best = Some((facet, weights, min_weight));
            }
        }
        best.filter(|(_, _, m)| *m >= -BARYCENTRIC_FALLBACK)
            .map(|(facet, weights, _)| (facet, weights))
    }

    /// Elements spanning the hull, sorted by symbol.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn entries(&self) -> &[PhaseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn facets(&self) -> &[LowerFacet] {
        &self.facets
    }

    pub fn energies_above_hull(&self) -> &[f64] {
        &self.energies_above_hull
    }

    pub fn energy_above_hull(&self, index: usize) -> Option<f64> {
        self.energies_above_hull.get(index).copied()
    }

    /// True if the entry is a vertex of the lower hull.
    pub fn is_on_hull(&self, index: usize) -> bool {
        self.on_hull.get(index).copied().unwrap_or(false)
    }

    pub fn hull_vertices(&self) -> Vec<usize> {
        (0..self.entries.len())
            .filter(|&i| self.on_hull[i])
            .collect()
    }

    pub fn is_stable(&self, index: usize, tolerance: f64) -> bool {
        self.energy_above_hull(index)
            .is_some_and(|energy| energy <= tolerance)
    }

    pub fn stable_indices(&self, tolerance: f64) -> Vec<usize> {
        (0..self.entries.len())
            .filter(|&i| self.is_stable(i, tolerance))
            .collect()
    }

    /// Energy of the lower hull at `composition`.
    pub fn envelope_energy(&self, composition: &Composition) -> Result<f64, HullError> {
        Ok(self.decomposition_of(composition)?.hull_energy)
    }

    /// Hull phases entry `index` decomposes into. A hull vertex decomposes into itself.
    pub fn decomposition(&self, index: usize) -> Result<Decomposition, HullError> {
        let entry = self
            .entries
            .get(index)
            .ok_or(HullError::IndexOutOfRange(index))?;
        if self.on_hull[index] {
            return Ok(Decomposition {
                products: vec![DecompositionProduct {
                    index,
                    fraction: 1.0,
                }],
                hull_energy: entry.energy,
            });
        }
        self.decompose(&self.coordinates[index])
            .ok_or_else(|| HullError::Uncovered(entry.label()))
    }

    pub fn decomposition_of(&self, composition: &Composition) -> Result<Decomposition, HullError> {
        let coordinates = composition_coordinates(composition, &self.elements)?;
        self.decompose(&coordinates)
            .ok_or_else(|| HullError::Uncovered(composition.to_string()))
    }

    fn decompose(&self, coordinates: &DVector<f64>) -> Option<Decomposition> {
        let (facet, weights) = self.locate(coordinates)?;
        let hull_energy = facet.interpolate(&weights);
        let clamped: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
        let total: f64 = clamped.iter().sum();
        let products = facet
            .vertices
            .iter()
            .zip(&clamped)
            .filter(|&(_, &w)| w > BARYCENTRIC_TOLERANCE)
            .map(|(&index, &w)| DecompositionProduct {
                index,
                fraction: w / total,
            })
            .collect();
        Some(Decomposition {
            products,
            hull_energy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::entry::ReferencePhase;
    use crate::core::models::lattice::Lattice;

    fn el(symbol: &str) -> Element {
        Element::new(symbol).unwrap()
    }

    fn binary(x_a: f64, energy: f64) -> PhaseEntry {
        let comp = Composition::from_fractions(&[el("A"), el("B")], &[x_a, 1.0 - x_a]).unwrap();
        PhaseEntry::solution(comp, energy, Lattice::Bcc)
    }

    fn ternary(x: [f64; 3], energy: f64) -> PhaseEntry {
        let comp = Composition::from_fractions(&[el("A"), el("B"), el("C")], &x).unwrap();
        PhaseEntry::solution(comp, energy, Lattice::Fcc)
    }

    fn reference(name: &str, comp: &str, energy: f64) -> PhaseEntry {
        PhaseEntry::reference(&ReferencePhase {
            name: name.to_string(),
            composition: comp.parse().unwrap(),
            energy,
            structure: None,
        })
    }

    #[test]
    fn negative_mixing_puts_equimolar_point_on_hull() {
        let hull = compute_hull(vec![binary(1.0, 0.0), binary(0.0, 0.0), binary(0.5, -0.125)]).unwrap();
        assert_eq!(hull.energy_above_hull(2), Some(0.0));
        assert!(hull.is_on_hull(2));
        assert_eq!(hull.hull_vertices(), vec![0, 1, 2]);
    }

    #[test]
    fn positive_mixing_gives_energy_above_tie_line() {
        let hull = compute_hull(vec![binary(1.0, 0.0), binary(0.0, 0.0), binary(0.5, 0.125)]).unwrap();
        assert!((hull.energy_above_hull(2).unwrap() - 0.125).abs() < 1e-12);
        assert!(!hull.is_on_hull(2));
        assert!(!hull.is_stable(2, 1e-6));
        assert_eq!(hull.stable_indices(1e-6), vec![0, 1]);
    }

    #[test]
    fn every_energy_above_hull_is_non_negative_and_zero_on_vertices() {
        let entries: Vec<PhaseEntry> = (0..=10)
            .map(|i| {
                let x = i as f64 / 10.0;
                binary(x, 0.3 * x * (1.0 - x) - 0.2 * x + 0.05 * (7.0 * x).sin())
            })
            .collect();
        let hull = compute_hull(entries).unwrap();
        for (i, e) in hull.energies_above_hull().iter().enumerate() {
            assert!(*e >= 0.0);
            if hull.is_on_hull(i) {
                assert_eq!(*e, 0.0);
            }
        }
        assert!(hull.is_on_hull(0) && hull.is_on_hull(10));
    }

    #[test]
    fn entry_order_does_not_change_energies() {
        let entries = vec![
            binary(1.0, 0.0),
            binary(0.0, -0.1),
            binary(0.25, -0.3),
            binary(0.5, -0.2),
            binary(0.75, -0.25),
        ];
        let forward = compute_hull(entries.clone()).unwrap();
        let mut reversed_entries = entries.clone();
        reversed_entries.reverse();
        let reversed = compute_hull(reversed_entries).unwrap();
        let n = entries.len();
        for i in 0..n {
            let a = forward.energy_above_hull(i).unwrap();
            let b = reversed.energy_above_hull(n - 1 - i).unwrap();
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn energy_flat_input_is_not_degenerate() {
        let hull = compute_hull(vec![binary(1.0, 0.0), binary(0.0, 0.0), binary(0.5, 0.0)]).unwrap();
        assert_eq!(hull.energies_above_hull(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn ternary_hull_with_stable_and_unstable_points() {
        let hull = compute_hull(vec![
            ternary([1.0, 0.0, 0.0], 0.0),
            ternary([0.0, 1.0, 0.0], 0.0),
            ternary([0.0, 0.0, 1.0], 0.0),
            ternary([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], -0.3),
            ternary([0.5, 0.5, 0.0], 0.1),
        ])
        .unwrap();
        assert!(hull.is_on_hull(3));
        assert_eq!(hull.energy_above_hull(3), Some(0.0));
        assert!((hull.energy_above_hull(4).unwrap() - 0.1).abs() < 1e-9);
        assert_eq!(hull.facets().len(), 3);
    }

    #[test]
    fn reference_wins_tie_at_same_composition() {
        let hull = compute_hull(vec![
            binary(1.0, 0.0),
            binary(0.0, 0.0),
            binary(0.5, -0.2),
            reference("AB", "A-B", -0.2 + 5e-7),
        ])
        .unwrap();
        assert!(hull.is_on_hull(3));
        assert!(!hull.is_on_hull(2));
        assert!(hull.energy_above_hull(2).unwrap() < 1e-6);
    }

    #[test]
    fn earliest_entry_wins_tie_between_solutions() {
        let hull = compute_hull(vec![
            binary(1.0, 0.0),
            binary(0.0, 0.0),
            binary(0.5, -0.2),
            binary(0.5, -0.2),
        ])
        .unwrap();
        assert!(hull.is_on_hull(2));
        assert!(!hull.is_on_hull(3));
        assert_eq!(hull.energy_above_hull(3), Some(0.0));
    }

    #[test]
    fn collinear_compositions_are_degenerate() {
        let result = compute_hull(vec![
            ternary([1.0, 0.0, 0.0], 0.0),
            ternary([0.0, 1.0, 0.0], 0.0),
            ternary([0.5, 0.5, 0.0], -0.1),
            PhaseEntry::solution(
                Composition::from_fractions(&[el("A"), el("C")], &[0.999_999_999_9, 1e-10]).unwrap(),
                0.0,
                Lattice::Fcc,
            ),
        ]);
        assert!(matches!(result, Err(HullError::Degenerate { .. })));
    }

    #[test]
    fn missing_endpoint_is_degenerate() {
        let result = compute_hull(vec![binary(0.5, -0.1), binary(0.5, -0.2)]);
        assert!(matches!(
            result,
            Err(HullError::Degenerate {
                dimension: 2,
                required: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn empty_and_non_finite_inputs_fail() {
        assert_eq!(compute_hull(Vec::new()).err(), Some(HullError::Empty));
        assert_eq!(
            compute_hull(vec![binary(1.0, f64::NAN)]).err(),
            Some(HullError::NonFiniteEnergy(0))
        );
    }

    #[test]
    fn unary_hull_keeps_lowest_energy() {
        let a = Composition::pure(el("A"));
        let hull = compute_hull(vec![
            PhaseEntry::solution(a.clone(), -1.0, Lattice::Bcc),
            PhaseEntry::solution(a.clone(), -1.5, Lattice::Fcc),
            PhaseEntry::solution(a, -1.2, Lattice::Hcp),
        ])
        .unwrap();
        assert_eq!(hull.hull_vertices(), vec![1]);
        assert!((hull.energy_above_hull(0).unwrap() - 0.5).abs() < 1e-12);
        assert!((hull.energy_above_hull(2).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn decomposition_reproduces_composition() {
        let hull = compute_hull(vec![
            binary(1.0, 0.0),
            binary(0.0, 0.0),
            binary(0.25, -0.2),
            binary(0.5, 0.1),
        ])
        .unwrap();
        let decomposition = hull.decomposition(3).unwrap();
        let total: f64 = decomposition.products.iter().map(|p| p.fraction).sum();
        assert!((total - 1.0).abs() < 1e-12);
        let x_a: f64 = decomposition
            .products
            .iter()
            .map(|p| p.fraction * hull.entries()[p.index].composition.fraction(&el("A")))
            .sum();
        assert!((x_a - 0.5).abs() < 1e-9);
        let indices: Vec<usize> = decomposition.products.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert!((decomposition.hull_energy - (-0.2 * 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn vertex_decomposes_into_itself() {
        let hull = compute_hull(vec![binary(1.0, 0.0), binary(0.0, 0.0), binary(0.5, -0.1)]).unwrap();
        let decomposition = hull.decomposition(2).unwrap();
        assert_eq!(
            decomposition.products,
            vec![DecompositionProduct {
                index: 2,
                fraction: 1.0
            }]
        );
        assert!(matches!(
            hull.decomposition(9),
            Err(HullError::IndexOutOfRange(9))
        ));
    }

    #[test]
    fn envelope_energy_interpolates_between_vertices() {
        let hull = compute_hull(vec![binary(1.0, 0.0), binary(0.0, 0.0), binary(0.5, -0.1)]).unwrap();
        let comp = Composition::from_fractions(&[el("A"), el("B")], &[0.25, 0.75]).unwrap();
        assert!((hull.envelope_energy(&comp).unwrap() - (-0.05)).abs() < 1e-12);
        let foreign: Composition = "A-Z".parse().unwrap();
        assert!(matches!(
            hull.envelope_energy(&foreign),
            Err(HullError::Composition(_))
        ));
    }

    #[test]
    fn hull_is_idempotent() {
        let entries = vec![binary(1.0, 0.0), binary(0.0, 0.1), binary(0.3, -0.2), binary(0.6, 0.0)];
        let first = compute_hull(entries.clone()).unwrap();
        let second = compute_hull(first.entries().to_vec()).unwrap();
        assert_eq!(first.energies_above_hull(), second.energies_above_hull());
        assert_eq!(first.hull_vertices(), second.hull_vertices());
    }
}
