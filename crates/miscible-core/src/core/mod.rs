//! # Core Module
//!
//! Stateless data models and the pure numerical building blocks of the library.
//!
//! ## Architecture
//!
//! - **Alloy Chemistry** ([`models`]) - Elements, lattices, compositions and phase entries
//! - **Composition Sampling** ([`grid`]) - Mole-fraction grids on the simplex and element subsets
//! - **Thermodynamics** ([`thermo`]) - Pair interaction tables and the solution free-energy model
//! - **Phase Stability** ([`hull`]) - Lower convex hull, energy above hull and decomposition
//!
//! Nothing in this module keeps state between calls; every function is a pure
//! function of its (borrowed) inputs.

pub mod grid;
pub mod hull;
pub mod models;
pub mod thermo;
