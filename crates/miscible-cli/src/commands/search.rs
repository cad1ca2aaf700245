use super::{Inputs, write_csv_output};
use crate::cli::SearchArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use miscible::core::models::composition::Composition;
use miscible::engine::progress::ProgressReporter;
use miscible::engine::state::{MiscibilityOutcome, MiscibilityResult, Probe};
use miscible::workflows;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct ProbeRow {
    temperature: f64,
    energy_above_hull: f64,
    stability: String,
}

impl From<&Probe> for ProbeRow {
    fn from(probe: &Probe) -> Self {
        Self {
            temperature: probe.temperature,
            energy_above_hull: probe.energy_above_hull,
            stability: probe.stability.to_string(),
        }
    }
}

pub async fn run(args: SearchArgs) -> Result<()> {
    let composition: Composition = args
        .composition
        .parse()
        .map_err(|e| CliError::Argument(format!("{e}")))?;
    let inputs = Inputs::load(&args.common, &args.search)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Searching miscibility temperature of {composition} ({})...", args.lattice);
    info!("Invoking the core miscibility workflow...");
    let result = tokio::task::block_in_place(|| {
        workflows::miscibility::run(
            &composition,
            args.lattice,
            &inputs.database,
            &inputs.references,
            &inputs.config,
            &reporter,
        )
    })?;

    println!("{}", summarize(&result));

    if let Some(path) = &args.output {
        write_csv_output(Some(path), result.trace().iter().map(ProbeRow::from))?;
        println!("✓ Probe trace written to: {}", path.display());
    }
    Ok(())
}

fn summarize(result: &MiscibilityResult) -> String {
    let (t_min, t_max) = result.bounds;
    match result.outcome {
        MiscibilityOutcome::Transition { temperature } => format!(
            "✓ {} ({}) becomes miscible at {:.1} K ({} bisection steps)",
            result.composition, result.lattice, temperature, result.iterations
        ),
        MiscibilityOutcome::NeverDecomposes { .. } => format!(
            "✓ {} ({}) is stable across [{:.1}, {:.1}] K; it never decomposes",
            result.composition, result.lattice, t_min, t_max
        ),
        MiscibilityOutcome::MeltsBeforeMixing { .. } => format!(
            "✓ {} ({}) is still unstable at {:.1} K; it melts before mixing",
            result.composition, result.lattice, t_max
        ),
    }
}
