use super::{Inputs, write_csv_output};
use crate::cli::{HullArgs, SearchOverrides};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use itertools::Itertools;
use miscible::core::models::element::parse_element_list;
use miscible::engine::progress::ProgressReporter;
use miscible::workflows::hull::{self, HullRow};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct HullCsvRow {
    label: String,
    kind: String,
    composition: String,
    energy: f64,
    energy_above_hull: f64,
    on_hull: bool,
    decomposition: String,
}

impl From<&HullRow> for HullCsvRow {
    fn from(row: &HullRow) -> Self {
        Self {
            label: row.label.clone(),
            kind: row.kind.clone(),
            composition: row.composition.to_string(),
            energy: row.energy,
            energy_above_hull: row.energy_above_hull,
            on_hull: row.on_hull,
            decomposition: row
                .decomposition
                .iter()
                .map(|(label, fraction)| format!("{label}:{fraction:.4}"))
                .join(";"),
        }
    }
}

pub async fn run(args: HullArgs) -> Result<()> {
    let elements =
        parse_element_list(&args.elements).map_err(|e| CliError::Argument(e.to_string()))?;
    if !(args.temperature.is_finite() && args.temperature >= 0.0) {
        return Err(CliError::Argument(format!(
            "temperature must be non-negative, got {}",
            args.temperature
        )));
    }
    let inputs = Inputs::load(&args.common, &SearchOverrides::default())?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the core hull workflow...");
    let analysis = tokio::task::block_in_place(|| {
        hull::run(
            &elements,
            args.temperature,
            &inputs.database,
            &inputs.references,
            &inputs.config,
            &reporter,
        )
    })?;

    write_csv_output(
        args.output.as_deref(),
        analysis.rows.iter().map(HullCsvRow::from),
    )?;
    if let Some(path) = &args.output {
        println!(
            "✓ {} hull row(s) ({} on hull) written to: {}",
            analysis.rows.len(),
            analysis.rows.iter().filter(|row| row.on_hull).count(),
            path.display()
        );
    }
    Ok(())
}
