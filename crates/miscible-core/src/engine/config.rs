use crate::core::models::lattice::Lattice;
use crate::core::thermo::model::SolutionModel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Which compositions stand in for the solid solution on each lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoleRatioMode {
    /// Equimolar composition of every element subset.
    Equimolar,
    /// Full mole-fraction grid over the element set.
    #[default]
    General,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Points per mole-fraction axis, including both ends.
    pub density: usize,
    pub mode: MoleRatioMode,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            density: 11,
            mode: MoleRatioMode::General,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelConfig {
    pub solution_model: SolutionModel,
    pub include_references: bool,
    /// Lattices whose solution entries compete on the hull; `None` uses every
    /// lattice present in the database.
    pub competing_lattices: Option<Vec<Lattice>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchStrategy {
    Bisection,
    /// Probe every `step` kelvin across the bounds and report the last flip.
    Sweep { step: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub min_temperature: f64,
    /// `None` derives the bound from the elemental melting points.
    pub max_temperature: Option<f64>,
    pub temperature_tolerance: f64,
    pub max_iterations: usize,
    /// Largest energy above hull (eV/atom) still counted as stable.
    pub stability_tolerance: f64,
    pub strategy: SearchStrategy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_temperature: 0.0,
            max_temperature: None,
            temperature_tolerance: 1.0,
            max_iterations: 20,
            stability_tolerance: 1e-6,
            strategy: SearchStrategy::Bisection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MiscibilityConfig {
    pub grid: GridConfig,
    pub model: ModelConfig,
    pub search: SearchConfig,
}

#[derive(Default)]
pub struct MiscibilityConfigBuilder {
    grid_density: Option<usize>,
    mole_ratio_mode: Option<MoleRatioMode>,
    solution_model: Option<SolutionModel>,
    include_references: Option<bool>,
    competing_lattices: Option<Vec<Lattice>>,
    min_temperature: Option<f64>,
    max_temperature: Option<f64>,
    temperature_tolerance: Option<f64>,
    max_iterations: Option<usize>,
    stability_tolerance: Option<f64>,
    strategy: Option<SearchStrategy>,
}

impl MiscibilityConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid_density(mut self, density: usize) -> Self {
        self.grid_density = Some(density);
        self
    }
    pub fn mole_ratio_mode(mut self, mode: MoleRatioMode) -> Self {
        self.mole_ratio_mode = Some(mode);
        self
    }
    pub fn solution_model(mut self, model: SolutionModel) -> Self {
        self.solution_model = Some(model);
        self
    }
    pub fn include_references(mut self, include: bool) -> Self {
        self.include_references = Some(include);
        self
    }
    pub fn competing_lattices(mut self, lattices: Vec<Lattice>) -> Self {
        self.competing_lattices = Some(lattices);
        self
    }
    pub fn min_temperature(mut self, kelvin: f64) -> Self {
        self.min_temperature = Some(kelvin);
        self
    }
    pub fn max_temperature(mut self, kelvin: f64) -> Self {
        self.max_temperature = Some(kelvin);
        self
    }
    pub fn temperature_tolerance(mut self, kelvin: f64) -> Self {
        self.temperature_tolerance = Some(kelvin);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }
    pub fn stability_tolerance(mut self, energy: f64) -> Self {
        self.stability_tolerance = Some(energy);
        self
    }
    pub fn strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Result<MiscibilityConfig, ConfigError> {
        let grid_defaults = GridConfig::default();
        let search_defaults = SearchConfig::default();

        let grid = GridConfig {
            density: self.grid_density.unwrap_or(grid_defaults.density),
            mode: self.mole_ratio_mode.unwrap_or(grid_defaults.mode),
        };
        if grid.density < 2 {
            return Err(ConfigError::invalid(
                "grid_density",
                format!("must be at least 2, got {}", grid.density),
            ));
        }

        let model = ModelConfig {
            solution_model: self.solution_model.unwrap_or_default(),
            include_references: self.include_references.unwrap_or(true),
            competing_lattices: self.competing_lattices,
        };
        if model
            .competing_lattices
            .as_ref()
            .is_some_and(|lattices| lattices.is_empty())
        {
            return Err(ConfigError::invalid(
                "competing_lattices",
                "at least one lattice is required",
            ));
        }

        let search = SearchConfig {
            min_temperature: self
                .min_temperature
                .unwrap_or(search_defaults.min_temperature),
            max_temperature: self.max_temperature,
            temperature_tolerance: self
                .temperature_tolerance
                .unwrap_or(search_defaults.temperature_tolerance),
            max_iterations: self
                .max_iterations
                .unwrap_or(search_defaults.max_iterations),
            stability_tolerance: self
                .stability_tolerance
                .unwrap_or(search_defaults.stability_tolerance),
            strategy: self.strategy.unwrap_or(search_defaults.strategy),
        };
        search.validate()?;

        Ok(MiscibilityConfig {
            grid,
            model,
            search,
        })
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_temperature.is_finite() && self.min_temperature >= 0.0) {
            return Err(ConfigError::invalid(
                "min_temperature",
                format!("must be finite and non-negative, got {}", self.min_temperature),
            ));
        }
        if let Some(max) = self.max_temperature {
            if !(max.is_finite() && max > self.min_temperature) {
                return Err(ConfigError::invalid(
                    "max_temperature",
                    format!(
                        "must be finite and above min_temperature ({}), got {}",
                        self.min_temperature, max
                    ),
                ));
            }
        }
        if !(self.temperature_tolerance.is_finite() && self.temperature_tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "temperature_tolerance",
                format!("must be positive, got {}", self.temperature_tolerance),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid("max_iterations", "must be at least 1"));
        }
        if !(self.stability_tolerance.is_finite() && self.stability_tolerance >= 0.0) {
            return Err(ConfigError::invalid(
                "stability_tolerance",
                format!("must be non-negative, got {}", self.stability_tolerance),
            ));
        }
        if let SearchStrategy::Sweep { step } = self.strategy {
            if !(step.is_finite() && step > 0.0) {
                return Err(ConfigError::invalid(
                    "strategy",
                    format!("sweep step must be positive, got {}", step),
                ));
            }
        }
        Ok(())
    }
}
