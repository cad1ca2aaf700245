use clap::{Args, Parser, Subcommand};
use miscible::core::models::lattice::Lattice;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "miscible - miscibility temperatures and convex hulls of multi-element solid solutions from pairwise mixing enthalpies.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the miscibility temperature of a single solid solution.
    Search(SearchArgs),
    /// Screen many compositions for their miscibility temperatures.
    Screen(ScreenArgs),
    /// Report the convex hull of an element system at one temperature.
    Hull(HullArgs),
}

/// Inputs and overrides shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Enthalpy database (TOML or CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub database: PathBuf,

    /// Reference phases CSV (name,composition,energy,structure).
    #[arg(short, long, value_name = "PATH")]
    pub references: Option<PathBuf>,

    /// Optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the number of grid points per mole-fraction axis.
    #[arg(short = 'g', long, value_name = "INT")]
    pub grid_density: Option<usize>,

    /// Sample each lattice with equimolar subsets instead of the full grid.
    #[arg(long)]
    pub equimolar: bool,

    /// Use the sub-regular solution model.
    #[arg(long)]
    pub sub_regular: bool,

    /// Treat missing pair interactions as ideal instead of failing.
    #[arg(long)]
    pub allow_missing: bool,

    /// Exclude reference phases from the hull, overriding the config file.
    #[arg(long)]
    pub no_references: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S search.max-iterations=40
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Temperature search overrides shared by `search` and `screen`.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct SearchOverrides {
    /// Lower temperature bound in kelvin.
    #[arg(long, value_name = "K")]
    pub min_temperature: Option<f64>,

    /// Upper temperature bound in kelvin; defaults to the mixture melting point.
    #[arg(long, value_name = "K")]
    pub max_temperature: Option<f64>,

    /// Stop bisecting once the bracket is narrower than this, in kelvin.
    #[arg(long, value_name = "K")]
    pub tolerance: Option<f64>,

    /// Override the bisection iteration cap.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Probe a full temperature grid with this step instead of bisecting.
    #[arg(long, value_name = "K")]
    pub sweep: Option<f64>,
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Target composition, e.g. `Co-Cr-Ni` or `Al0.3-Co0.7`.
    #[arg(short = 'x', long, required = true, value_name = "COMPOSITION")]
    pub composition: String,

    /// Lattice of the target solid solution.
    #[arg(short, long, default_value = "fcc", value_name = "LATTICE")]
    pub lattice: Lattice,

    /// Also write the probe trace as CSV.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub search: SearchOverrides,
}

/// Arguments for the `screen` subcommand.
#[derive(Args, Debug)]
pub struct ScreenArgs {
    /// Elements whose equimolar subsets are screened, e.g. `Co-Cr-Fe-Ni`.
    #[arg(short, long, value_name = "ELEMENTS", conflicts_with = "compositions")]
    pub elements: Option<String>,

    /// Subsystem orders to screen together with `--elements`.
    #[arg(long, value_delimiter = ',', default_value = "2", value_name = "ORDERS")]
    pub orders: Vec<usize>,

    /// Explicit compositions to screen.
    #[arg(long, value_delimiter = ',', value_name = "COMPOSITIONS")]
    pub compositions: Vec<String>,

    /// Lattices to evaluate; defaults to every lattice in the database.
    #[arg(short, long, value_delimiter = ',', value_name = "LATTICES")]
    pub lattices: Vec<Lattice>,

    /// Output CSV path.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub search: SearchOverrides,
}

/// Arguments for the `hull` subcommand.
#[derive(Args, Debug)]
pub struct HullArgs {
    /// Element system, e.g. `Co-Cr-Ni`.
    #[arg(short, long, required = true, value_name = "ELEMENTS")]
    pub elements: String,

    /// Temperature in kelvin.
    #[arg(short = 't', long, required = true, value_name = "K")]
    pub temperature: f64,

    /// Output CSV path; rows are printed to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}
