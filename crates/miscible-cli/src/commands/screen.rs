use super::{Inputs, write_csv_output};
use crate::cli::ScreenArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use miscible::core::models::composition::Composition;
use miscible::core::models::element::parse_element_list;
use miscible::core::models::lattice::Lattice;
use miscible::engine::progress::ProgressReporter;
use miscible::workflows::screen::{self, ScreenRecord, ScreenTargets};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct ScreenRow {
    composition: String,
    lattice: String,
    outcome: String,
    temperature: Option<f64>,
    sentinel: Option<bool>,
    iterations: Option<usize>,
    error: Option<String>,
}

impl From<&ScreenRecord> for ScreenRow {
    fn from(record: &ScreenRecord) -> Self {
        let mut row = Self {
            composition: record.composition.to_string(),
            lattice: record.lattice.to_string(),
            outcome: "error".to_string(),
            temperature: None,
            sentinel: None,
            iterations: None,
            error: None,
        };
        match &record.result {
            Ok(result) => {
                let (temperature, sentinel) = result.outcome.as_pair();
                row.outcome = result.outcome.label().to_string();
                row.temperature = Some(temperature);
                row.sentinel = Some(sentinel);
                row.iterations = Some(result.iterations);
            }
            Err(e) => row.error = Some(e.to_string()),
        }
        row
    }
}

fn targets(args: &ScreenArgs) -> Result<ScreenTargets> {
    if let Some(elements) = &args.elements {
        let elements =
            parse_element_list(elements).map_err(|e| CliError::Argument(e.to_string()))?;
        return Ok(ScreenTargets::Equimolar {
            elements,
            orders: args.orders.clone(),
        });
    }
    if args.compositions.is_empty() {
        return Err(CliError::Argument(
            "either --elements or --compositions is required".to_string(),
        ));
    }
    let compositions = args
        .compositions
        .iter()
        .map(|s| s.parse::<Composition>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| CliError::Argument(e.to_string()))?;
    Ok(ScreenTargets::Compositions(compositions))
}

pub async fn run(args: ScreenArgs) -> Result<()> {
    let targets = targets(&args)?;
    let inputs = Inputs::load(&args.common, &args.search)?;
    let lattices: Vec<Lattice> = if args.lattices.is_empty() {
        inputs.database.lattices().collect()
    } else {
        args.lattices.clone()
    };
    if lattices.is_empty() {
        return Err(CliError::Config(
            "the enthalpy database defines no lattices".to_string(),
        ));
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting miscibility screening...");
    info!("Invoking the core screening workflow...");
    let report = tokio::task::block_in_place(|| {
        screen::run(
            &targets,
            &lattices,
            &inputs.database,
            &inputs.references,
            &inputs.config,
            &reporter,
        )
    })?;

    write_csv_output(Some(&args.output), report.records.iter().map(ScreenRow::from))?;

    let failed = report.failure_count();
    if failed > 0 {
        warn!("{} screening job(s) failed; see the error column.", failed);
        println!(
            "Warning: {} of {} job(s) failed; see the error column.",
            failed,
            report.records.len()
        );
    }
    println!(
        "✓ {} result(s) written to: {}",
        report.records.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::commands::fixtures;
    use clap::Parser;

    fn parse(args: &[&str]) -> ScreenArgs {
        match Cli::parse_from(args).command {
            Commands::Screen(screen) => screen,
            _ => panic!("Expected 'screen' subcommand"),
        }
    }

    #[test]
    fn element_targets_take_precedence_over_missing_compositions() {
        let args = parse(&[
            "miscible", "screen", "-e", "Co-Cr-Ni", "--orders", "2,3", "-d", "db.toml", "-o",
            "out.csv",
        ]);
        match targets(&args).unwrap() {
            ScreenTargets::Equimolar { elements, orders } => {
                assert_eq!(elements.len(), 3);
                assert_eq!(orders, vec![2, 3]);
            }
            other => panic!("unexpected targets: {other:?}"),
        }

        let args = parse(&["miscible", "screen", "-d", "db.toml", "-o", "out.csv"]);
        assert!(matches!(targets(&args), Err(CliError::Argument(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn writes_one_row_per_job_including_failures() {
        let dir = tempfile::tempdir().unwrap();
        let db = fixtures::write(&dir, "db.toml", "[lattices.fcc.pairs]\n\"Co-Ni\" = -0.02\n");
        let out = dir.path().join("screen.csv");
        let args = parse(&[
            "miscible",
            "screen",
            "--compositions",
            "Co-Ni,Co-Cr",
            "-d",
            db.to_str().unwrap(),
            "-g",
            "3",
            "-o",
            out.to_str().unwrap(),
        ]);
        run(args).await.unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "composition,lattice,outcome,temperature,sentinel,iterations,error"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Co-Ni,fcc,never-decomposes,"));
        assert!(lines[2].starts_with("Co-Cr,fcc,error,,,,"));
    }
}
