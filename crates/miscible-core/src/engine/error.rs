use thiserror::Error;

use super::config::ConfigError;
use crate::core::grid::GridError;
use crate::core::hull::HullError;
use crate::core::models::composition::CompositionError;
use crate::core::thermo::model::ThermoError;
use crate::core::thermo::store::InteractionError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid grid: {source}")]
    InvalidGrid {
        #[from]
        source: GridError,
    },

    #[error("Invalid composition: {source}")]
    InvalidComposition {
        #[from]
        source: CompositionError,
    },

    #[error("Thermodynamic model failed: {source}")]
    Thermo {
        #[from]
        source: ThermoError,
    },

    #[error("Convex hull failed: {source}")]
    Hull {
        #[from]
        source: HullError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error(
        "Temperature search did not converge after {iterations} iterations: bracket {bracket:.3} K exceeds tolerance {tolerance} K"
    )]
    SearchNonConvergence {
        iterations: usize,
        bracket: f64,
        tolerance: f64,
    },

    #[error(
        "Stability is not monotonic in temperature: stable at {stable_at} K but unstable at {unstable_at} K"
    )]
    NonMonotonicStability { stable_at: f64, unstable_at: f64 },
}

impl From<InteractionError> for EngineError {
    fn from(source: InteractionError) -> Self {
        Self::Thermo {
            source: ThermoError::from(source),
        }
    }
}

impl EngineError {
    /// True when the failure comes from a pair missing in the enthalpy database.
    pub fn is_missing_interaction(&self) -> bool {
        matches!(
            self,
            EngineError::Thermo {
                source: ThermoError::Interaction(InteractionError::Missing { .. })
            }
        )
    }
}
