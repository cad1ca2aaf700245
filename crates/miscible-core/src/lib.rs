//! # Miscible Core Library
//!
//! Thermodynamic phase-stability predictions for multi-element alloys, computed from
//! pairwise mixing-enthalpy parameters: energies above the convex hull and the
//! temperatures at which solid solutions become miscible.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Composition`, `PhaseEntry`),
//!   composition grids, the regular/sub-regular solution model and the n-dimensional
//!   lower convex hull.
//!
//! - **[`engine`]: The Logic Core.** Configuration, phase-entry construction at a given
//!   temperature and the temperature search that classifies a composition as stable or
//!   unstable against decomposition.
//!
//! - **[`workflows`]: The Public API.** Complete procedures for end users: a single
//!   miscibility query, a parallel screen over many compositions, and the hull of a
//!   whole element system.

pub mod core;
pub mod engine;
pub mod workflows;
