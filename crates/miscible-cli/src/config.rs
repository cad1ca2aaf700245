use crate::cli::{CommonArgs, SearchOverrides};
use crate::error::{CliError, Result};
use miscible::core::models::lattice::Lattice;
use miscible::core::thermo::model::SolutionModel;
use miscible::core::thermo::store::MissingInteractionPolicy;
use miscible::engine::config::{
    MiscibilityConfig, MiscibilityConfigBuilder, MoleRatioMode, SearchStrategy,
};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IntoDeserializer};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Sweep step used when the file selects `strategy = "sweep"` without a step.
const DEFAULT_SWEEP_STEP: f64 = 50.0;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialGridConfig {
    density: Option<usize>,
    mode: Option<MoleRatioMode>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialModelConfig {
    solution_model: Option<SolutionModel>,
    missing_interaction: Option<MissingInteractionPolicy>,
    include_references: Option<bool>,
    competing_lattices: Option<Vec<Lattice>>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case")]
enum PartialStrategy {
    Bisection,
    Sweep,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSearchConfig {
    min_temperature: Option<f64>,
    max_temperature: Option<f64>,
    temperature_tolerance: Option<f64>,
    max_iterations: Option<usize>,
    stability_tolerance: Option<f64>,
    strategy: Option<PartialStrategy>,
    sweep_step: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialMiscibilityConfig {
    grid: Option<PartialGridConfig>,
    model: Option<PartialModelConfig>,
    search: Option<PartialSearchConfig>,
}

/// Core configuration plus the database policy it runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub core: MiscibilityConfig,
    pub missing_policy: MissingInteractionPolicy,
}

impl PartialMiscibilityConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Reads `path` when given; otherwise starts from an empty layer.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn merge_with_cli(
        mut self,
        common: &CommonArgs,
        overrides: &SearchOverrides,
    ) -> Result<ResolvedConfig> {
        self.apply_set_values(&common.set_values)?;

        let grid = self.grid.take().unwrap_or_default();
        let model = self.model.take().unwrap_or_default();
        let search = self.search.take().unwrap_or_default();

        let mut builder = MiscibilityConfigBuilder::new();

        if let Some(density) = common.grid_density.or(grid.density) {
            builder = builder.grid_density(density);
        }
        let mode = if common.equimolar {
            Some(MoleRatioMode::Equimolar)
        } else {
            grid.mode
        };
        if let Some(mode) = mode {
            builder = builder.mole_ratio_mode(mode);
        }

        let solution_model = if common.sub_regular {
            Some(SolutionModel::SubRegular)
        } else {
            model.solution_model
        };
        if let Some(solution_model) = solution_model {
            builder = builder.solution_model(solution_model);
        }
        let include_references = if common.no_references {
            Some(false)
        } else {
            model.include_references
        };
        if let Some(include) = include_references {
            builder = builder.include_references(include);
        }
        if let Some(lattices) = model.competing_lattices {
            builder = builder.competing_lattices(lattices);
        }
        let missing_policy = if common.allow_missing {
            MissingInteractionPolicy::Zero
        } else {
            model.missing_interaction.unwrap_or_default()
        };

        if let Some(min) = overrides.min_temperature.or(search.min_temperature) {
            builder = builder.min_temperature(min);
        }
        if let Some(max) = overrides.max_temperature.or(search.max_temperature) {
            builder = builder.max_temperature(max);
        }
        if let Some(tolerance) = overrides.tolerance.or(search.temperature_tolerance) {
            builder = builder.temperature_tolerance(tolerance);
        }
        if let Some(iterations) = overrides.max_iterations.or(search.max_iterations) {
            builder = builder.max_iterations(iterations);
        }
        if let Some(tolerance) = search.stability_tolerance {
            builder = builder.stability_tolerance(tolerance);
        }
        builder = builder.strategy(Self::merge_strategy(overrides.sweep, &search));

        let core = builder.build().map_err(|e| CliError::Config(e.to_string()))?;
        Ok(ResolvedConfig {
            core,
            missing_policy,
        })
    }

    fn merge_strategy(cli_sweep: Option<f64>, search: &PartialSearchConfig) -> SearchStrategy {
        if let Some(step) = cli_sweep {
            return SearchStrategy::Sweep { step };
        }
        match search.strategy {
            Some(PartialStrategy::Sweep) => SearchStrategy::Sweep {
                step: search.sweep_step.unwrap_or(DEFAULT_SWEEP_STEP),
            },
            Some(PartialStrategy::Bisection) | None => SearchStrategy::Bisection,
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "grid.density" => {
                    self.grid.get_or_insert_with(Default::default).density =
                        Some(parse_value(key, value)?);
                }
                "grid.mode" => {
                    self.grid.get_or_insert_with(Default::default).mode =
                        Some(parse_keyword(key, value)?);
                }
                "model.solution-model" => {
                    self.model
                        .get_or_insert_with(Default::default)
                        .solution_model = Some(parse_keyword(key, value)?);
                }
                "model.missing-interaction" => {
                    self.model
                        .get_or_insert_with(Default::default)
                        .missing_interaction = Some(parse_keyword(key, value)?);
                }
                "model.include-references" => {
                    self.model
                        .get_or_insert_with(Default::default)
                        .include_references = Some(parse_value(key, value)?);
                }
                "search.min-temperature" => {
                    self.search_mut().min_temperature = Some(parse_value(key, value)?);
                }
                "search.max-temperature" => {
                    self.search_mut().max_temperature = Some(parse_value(key, value)?);
                }
                "search.temperature-tolerance" => {
                    self.search_mut().temperature_tolerance = Some(parse_value(key, value)?);
                }
                "search.max-iterations" => {
                    self.search_mut().max_iterations = Some(parse_value(key, value)?);
                }
                "search.stability-tolerance" => {
                    self.search_mut().stability_tolerance = Some(parse_value(key, value)?);
                }
                "search.strategy" => {
                    self.search_mut().strategy = Some(parse_keyword(key, value)?);
                }
                "search.sweep-step" => {
                    self.search_mut().sweep_step = Some(parse_value(key, value)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn search_mut(&mut self) -> &mut PartialSearchConfig {
        self.search.get_or_insert_with(Default::default)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn parse_keyword<T: DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    let deserializer: serde::de::value::StrDeserializer<'_, serde::de::value::Error> =
        value.into_deserializer();
    T::deserialize(deserializer)
        .map_err(|e| CliError::Config(format!("Invalid value for {}: {}", key, e)))
}
