use crate::core::models::composition::{Composition, CompositionError};
use crate::core::models::element::Element;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Grid points whose fractions do not sum to one within this tolerance are skipped.
pub const GRID_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum GridError {
    #[error("Grid density must be at least 2 points per axis, got {0}")]
    InvalidDensity(usize),
    #[error("Grid dimension must be at least 1, got {0}")]
    InvalidDimension(usize),
    #[error("Invalid subsystem order {order} for {available} element(s)")]
    InvalidOrder { order: usize, available: usize },
    #[error("Element list is empty")]
    EmptyElements,
    #[error("Element {0} appears more than once")]
    DuplicateElement(Element),
    #[error(transparent)]
    Composition(#[from] CompositionError),
}

/// Mole-fraction grid on the (k-1)-simplex, `density` points per axis.
///
/// The grid is a description, not a buffer: [`MolGrid::iter`] walks it lazily and
/// can be called any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MolGrid {
    dimension: usize,
    density: usize,
}

pub fn create_mol_grid(k: usize, density: usize) -> Result<MolGrid, GridError> {
    if k == 0 {
        return Err(GridError::InvalidDimension(k));
    }
    if density < 2 {
        return Err(GridError::InvalidDensity(density));
    }
    Ok(MolGrid {
        dimension: k,
        density,
    })
}

impl MolGrid {
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn density(&self) -> usize {
        self.density
    }

    #[inline]
    fn divisions(&self) -> usize {
        self.density - 1
    }

    /// Number of points, C(density - 2 + k, k - 1).
    pub fn len(&self) -> usize {
        binomial(self.divisions() + self.dimension - 1, self.dimension - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> MolGridIter {
        MolGridIter {
            divisions: self.divisions(),
            counts: vec![0; self.dimension - 1],
            done: false,
        }
    }

    /// Grid points as compositions over `elements` (zero fractions dropped).
    pub fn compositions(&self, elements: &[Element]) -> Result<Vec<Composition>, GridError> {
        if elements.len() != self.dimension {
            return Err(CompositionError::ElementCountMismatch {
                expected: self.dimension,
                found: elements.len(),
            }
            .into());
        }
        self.iter()
            .map(|point| Composition::from_fractions(elements, &point).map_err(GridError::from))
            .collect()
    }
}

impl<'a> IntoIterator for &'a MolGrid {
    type Item = Vec<f64>;
    type IntoIter = MolGridIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walks integer partitions of `divisions` into k parts; the last part is implied.
#[derive(Debug, Clone)]
pub struct MolGridIter {
    divisions: usize,
    counts: Vec<usize>,
    done: bool,
}

impl MolGridIter {
    fn current_point(&self) -> Vec<f64> {
        let n = self.divisions as f64;
        let used: usize = self.counts.iter().sum();
        let mut point: Vec<f64> = self.counts.iter().map(|&c| c as f64 / n).collect();
        point.push((self.divisions - used) as f64 / n);
        point
    }

    fn advance(&mut self) {
        let used: usize = self.counts.iter().sum();
        let Some(last) = self.counts.last_mut() else {
            self.done = true;
            return;
        };
        if used < self.divisions {
            *last += 1;
            return;
        }
        match self.counts.iter().rposition(|&c| c > 0) {
            Some(i) if i > 0 => {
                self.counts[i] = 0;
                self.counts[i - 1] += 1;
            }
            _ => self.done = true,
        }
    }
}

impl Iterator for MolGridIter {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let point = self.current_point();
            self.advance();
            if (point.iter().sum::<f64>() - 1.0).abs() <= GRID_TOLERANCE {
                return Some(point);
            }
        }
        None
    }
}

fn binomial(n: usize, k: usize) -> usize {
    let k = k.min(n.saturating_sub(k));
    (0..k).fold(1usize, |acc, i| acc * (n - i) / (i + 1))
}

/// Sorted copy of `elements`; fails on an empty list or a repeated element.
pub fn canonical_elements(elements: &[Element]) -> Result<Vec<Element>, GridError> {
    if elements.is_empty() {
        return Err(GridError::EmptyElements);
    }
    let mut seen = BTreeSet::new();
    for element in elements {
        if !seen.insert(element.clone()) {
            return Err(GridError::DuplicateElement(element.clone()));
        }
    }
    Ok(seen.into_iter().collect())
}

/// All element subsets of each requested order, in canonical (sorted) form.
pub fn subsystems(
    elements: &[Element],
    orders: &[usize],
) -> Result<BTreeMap<usize, Vec<Vec<Element>>>, GridError> {
    let sorted = canonical_elements(elements)?;
    let mut result = BTreeMap::new();
    for &order in orders {
        if order == 0 || order > sorted.len() {
            return Err(GridError::InvalidOrder {
                order,
                available: sorted.len(),
            });
        }
        let subsets: Vec<Vec<Element>> = sorted.iter().cloned().combinations(order).collect();
        result.insert(order, subsets);
    }
    Ok(result)
}

/// For each order j, every C(n, j) subset of `elements` as a hyphen-joined string.
pub fn create_multinary(
    elements: &[Element],
    orders: &[usize],
) -> Result<BTreeMap<usize, Vec<String>>, GridError> {
    Ok(subsystems(elements, orders)?
        .into_iter()
        .map(|(order, subsets)| {
            let mut names: Vec<String> = subsets
                .iter()
                .map(|subset| subset.iter().map(Element::symbol).join("-"))
                .collect();
            names.sort();
            (order, names)
        })
        .collect())
}

/// Equimolar compositions of every subset of `elements` up to `max_order` elements.
pub fn equimolar_subsystems(
    elements: &[Element],
    max_order: usize,
) -> Result<Vec<Composition>, GridError> {
    let orders: Vec<usize> = (1..=max_order).collect();
    let mut compositions = Vec::new();
    for subsets in subsystems(elements, &orders)?.into_values() {
        for subset in subsets {
            compositions.push(Composition::equimolar(&subset)?);
        }
    }
    Ok(compositions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(symbols: &[&str]) -> Vec<Element> {
        symbols.iter().map(|s| Element::new(s).unwrap()).collect()
    }

    #[test]
    fn density_below_two_is_rejected() {
        assert_eq!(create_mol_grid(2, 1), Err(GridError::InvalidDensity(1)));
        assert_eq!(create_mol_grid(2, 0), Err(GridError::InvalidDensity(0)));
        assert_eq!(create_mol_grid(0, 5), Err(GridError::InvalidDimension(0)));
    }

    #[test]
    fn unary_grid_is_single_point() {
        let grid = create_mol_grid(1, 10).unwrap();
        let points: Vec<_> = grid.iter().collect();
        assert_eq!(points, vec![vec![1.0]]);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn binary_grid_samples_each_axis_evenly() {
        let grid = create_mol_grid(2, 3).unwrap();
        let points: Vec<_> = grid.iter().collect();
        assert_eq!(points, vec![vec![0.0, 1.0], vec![0.5, 0.5], vec![1.0, 0.0]]);
    }

    #[test]
    fn grid_point_count_matches_binomial() {
        for (k, density) in [(2, 11), (3, 5), (3, 11), (4, 6), (5, 4)] {
            let grid = create_mol_grid(k, density).unwrap();
            assert_eq!(grid.iter().count(), grid.len(), "k={k}, density={density}");
        }
        assert_eq!(create_mol_grid(3, 11).unwrap().len(), 66);
    }

    #[test]
    fn every_point_lies_on_the_simplex() {
        let grid = create_mol_grid(4, 7).unwrap();
        for point in &grid {
            assert_eq!(point.len(), 4);
            assert!(point.iter().all(|&x| x >= 0.0));
            assert!((point.iter().sum::<f64>() - 1.0).abs() <= GRID_TOLERANCE);
        }
    }

    #[test]
    fn grid_is_restartable() {
        let grid = create_mol_grid(3, 4).unwrap();
        let first: Vec<_> = grid.iter().collect();
        let second: Vec<_> = grid.iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn grid_includes_simplex_corners() {
        let grid = create_mol_grid(3, 3).unwrap();
        let points: Vec<_> = grid.iter().collect();
        assert!(points.contains(&vec![1.0, 0.0, 0.0]));
        assert!(points.contains(&vec![0.0, 1.0, 0.0]));
        assert!(points.contains(&vec![0.0, 0.0, 1.0]));
    }

    #[test]
    fn compositions_drop_zero_fractions() {
        let grid = create_mol_grid(2, 3).unwrap();
        let comps = grid.compositions(&elements(&["A", "B"])).unwrap();
        assert_eq!(comps.len(), 3);
        assert_eq!(comps[0].order(), 1);
        assert_eq!(comps[1].order(), 2);
        assert!(grid.compositions(&elements(&["A"])).is_err());
    }

    #[test]
    fn create_multinary_returns_sorted_canonical_names() {
        let result = create_multinary(&elements(&["Ni", "Co", "Fe", "Cr"]), &[1, 2, 4]).unwrap();
        assert_eq!(result[&1], vec!["Co", "Cr", "Fe", "Ni"]);
        assert_eq!(
            result[&2],
            vec!["Co-Cr", "Co-Fe", "Co-Ni", "Cr-Fe", "Cr-Ni", "Fe-Ni"]
        );
        assert_eq!(result[&4], vec!["Co-Cr-Fe-Ni"]);
        assert!(!result.contains_key(&3));
    }

    #[test]
    fn create_multinary_rejects_bad_orders_and_inputs() {
        let els = elements(&["A", "B"]);
        assert_eq!(
            create_multinary(&els, &[3]),
            Err(GridError::InvalidOrder {
                order: 3,
                available: 2
            })
        );
        assert!(matches!(
            create_multinary(&els, &[0]),
            Err(GridError::InvalidOrder { .. })
        ));
        assert_eq!(create_multinary(&[], &[1]), Err(GridError::EmptyElements));
        assert!(matches!(
            create_multinary(&elements(&["A", "A"]), &[1]),
            Err(GridError::DuplicateElement(_))
        ));
    }

    #[test]
    fn equimolar_subsystems_cover_every_subset() {
        let comps = equimolar_subsystems(&elements(&["A", "B", "C"]), 3).unwrap();
        assert_eq!(comps.len(), 7);
        assert!(comps.iter().all(Composition::is_equimolar));
        assert_eq!(comps.iter().filter(|c| c.order() == 1).count(), 3);
    }
}
