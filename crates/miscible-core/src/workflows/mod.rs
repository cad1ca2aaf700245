//! # Workflows Module
//!
//! High-level entry points that load nothing themselves: callers pass the enthalpy
//! database, reference phases, and a [`MiscibilityConfig`](crate::engine::config::MiscibilityConfig),
//! and each workflow reports progress through a
//! [`ProgressReporter`](crate::engine::progress::ProgressReporter).
//!
//! - [`miscibility`] - miscibility temperature of a single solid solution.
//! - [`screen`] - batch search over many compositions and lattices; failures are
//!   recorded per job instead of aborting the batch.
//! - [`hull`] - competing phases of an element system at one temperature, with
//!   energies above hull and decomposition products.

pub mod hull;
pub mod miscibility;
pub mod screen;
