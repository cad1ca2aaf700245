//! # Engine Module
//!
//! The search layer: turns the pure thermodynamic and geometric building blocks of
//! [`crate::core`] into stability classifications and transition temperatures.
//!
//! ## Overview
//!
//! For a target composition the engine repeatedly builds every competing phase of
//! the target's element subsystem at a trial temperature, computes their lower
//! convex hull and classifies the target by its energy above that hull. A
//! bisection (or a full sweep) over temperature then locates the point where the
//! solid solution becomes stable.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Grid, model and search settings with a validating builder
//! - **Entry Construction** ([`builder`]) - Solution-grid and reference phase entries per temperature
//! - **Temperature Search** ([`search`]) - Bisection and sweep strategies over temperature
//! - **State Tracking** ([`state`]) - Stability classes, probes and search outcomes
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - The aggregated engine error type
//!
//! All inputs are borrowed read-only; nothing here holds mutable state between calls,
//! so independent searches can run concurrently.

pub mod builder;
pub mod config;
pub mod error;
pub mod progress;
pub mod search;
pub mod state;
