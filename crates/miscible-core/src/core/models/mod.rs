//! # Core Models Module
//!
//! Data structures describing alloy chemistry and the candidate phases competing
//! on a convex hull.
//!
//! ## Key Components
//!
//! - [`element`] - Element symbols, the ordering key for every canonical representation
//! - [`lattice`] - Parent lattices of disordered solid solutions
//! - [`composition`] - Normalised mole fractions with order-independent identity
//! - [`entry`] - Phase entries (solution samples and reference phases) fed to the hull
//!
//! Compositions and entries are plain values: they are rebuilt for every temperature
//! and discarded once a result has been extracted.

pub mod composition;
pub mod element;
pub mod entry;
pub mod lattice;
