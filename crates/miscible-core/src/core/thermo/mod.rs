//! # Thermodynamics Module
//!
//! Mean-field free energies of disordered solid solutions built from pairwise
//! mixing parameters.
//!
//! ## Overview
//!
//! The Gibbs free energy per atom of a solution with mole fractions `x` on a
//! parent lattice is
//!
//! ```text
//! G = H_mix + sum_i x_i E_i - T k_B S_ideal
//! ```
//!
//! where `H_mix` sums regular (`omega x_i x_j`) or sub-regular
//! (`x_i x_j (omega0 + omega1 (x_i - x_j))`) pair contributions and `S_ideal`
//! is the ideal configurational entropy.
//!
//! ## Key Components
//!
//! - [`store`] - Pair interaction tables keyed by unordered element pairs, one per lattice
//! - [`model`] - The free-energy model evaluated on a composition
//! - [`term`] - Free-energy breakdown into enthalpy, reference and entropy parts
//! - [`melting`] - Built-in elemental melting points used for default temperature bounds
//! - [`params`] - TOML/CSV loaders for enthalpy databases and reference phases

pub mod melting;
pub mod model;
pub mod params;
pub mod store;
pub mod term;
