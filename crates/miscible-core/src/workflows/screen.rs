use crate::core::grid::create_multinary;
use crate::core::models::composition::Composition;
use crate::core::models::element::Element;
use crate::core::models::entry::ReferencePhase;
use crate::core::models::lattice::Lattice;
use crate::core::thermo::store::{EnthalpyDatabase, PairKey};
use crate::engine::config::MiscibilityConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::search::MiscibilityTemperatureSearch;
use crate::engine::state::MiscibilityResult;
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// What a screening run evaluates.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenTargets {
    Compositions(Vec<Composition>),
    /// Equimolar composition of every subset of `elements` with one of the given orders.
    Equimolar {
        elements: Vec<Element>,
        orders: Vec<usize>,
    },
}

impl ScreenTargets {
    /// Expands the targets into concrete compositions, lowest order first.
    pub fn resolve(&self) -> Result<Vec<Composition>, EngineError> {
        match self {
            ScreenTargets::Compositions(compositions) => Ok(compositions.clone()),
            ScreenTargets::Equimolar { elements, orders } => {
                let mut compositions = Vec::new();
                for systems in create_multinary(elements, orders)?.into_values() {
                    for system in systems {
                        compositions.push(system.parse::<Composition>()?);
                    }
                }
                Ok(compositions)
            }
        }
    }
}

/// Outcome of one (composition, lattice) job.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenRecord {
    pub composition: Composition,
    pub lattice: Lattice,
    pub result: Result<MiscibilityResult, EngineError>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenReport {
    /// One record per job, in target order then lattice order.
    pub records: Vec<ScreenRecord>,
}

impl ScreenReport {
    pub fn successes(&self) -> impl Iterator<Item = &MiscibilityResult> {
        self.records.iter().filter_map(|r| r.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ScreenRecord, &EngineError)> {
        self.records
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Runs an independent miscibility search for every target on every lattice.
///
/// A failing job is logged and kept in the report; it never aborts the batch.
#[instrument(skip_all, name = "screen_workflow")]
pub fn run(
    targets: &ScreenTargets,
    lattices: &[Lattice],
    database: &EnthalpyDatabase,
    references: &[ReferencePhase],
    config: &MiscibilityConfig,
    reporter: &ProgressReporter,
) -> Result<ScreenReport, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let compositions = targets.resolve()?;
    let jobs: Vec<(&Composition, Lattice)> = compositions
        .iter()
        .flat_map(|composition| lattices.iter().map(move |&lattice| (composition, lattice)))
        .collect();
    info!(
        compositions = compositions.len(),
        lattices = lattices.len(),
        jobs = jobs.len(),
        "Resolved screening targets."
    );
    let search = MiscibilityTemperatureSearch::new(database, references, config);
    warn_zero_filled_pairs(&search, &jobs);
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Screening" });
    reporter.report(Progress::TaskStart {
        total_steps: jobs.len() as u64,
    });

    // Probe events from concurrent jobs would interleave, so jobs report only completion.
    let quiet = ProgressReporter::new();
    let evaluate = |&(composition, lattice): &(&Composition, Lattice)| {
        let result = search.run(composition, lattice, &quiet);
        if let Err(e) = &result {
            warn!(composition = %composition, lattice = %lattice, error = %e, "Screening job failed.");
            reporter.report(Progress::Message(format!(
                "{composition} ({lattice}) failed: {e}"
            )));
        }
        reporter.report(Progress::TaskIncrement);
        ScreenRecord {
            composition: composition.clone(),
            lattice,
            result,
        }
    };

    #[cfg(not(feature = "parallel"))]
    let iterator = jobs.iter();

    #[cfg(feature = "parallel")]
    let iterator = jobs.par_iter();

    let records: Vec<ScreenRecord> = iterator.map(evaluate).collect();

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let report = ScreenReport { records };
    info!(
        succeeded = report.successes().count(),
        failed = report.failure_count(),
        "Screening finished."
    );
    Ok(report)
}

/// Zero-filled pairs shared by many jobs are logged once for the whole batch.
fn warn_zero_filled_pairs(
    search: &MiscibilityTemperatureSearch<'_>,
    jobs: &[(&Composition, Lattice)],
) -> BTreeSet<(Lattice, PairKey)> {
    let pairs: BTreeSet<(Lattice, PairKey)> = jobs
        .iter()
        .flat_map(|(composition, lattice)| {
            let elements: Vec<Element> = composition.elements().cloned().collect();
            search.builder().zero_filled_pairs(&elements, Some(*lattice))
        })
        .collect();
    for (lattice, pair) in &pairs {
        warn!(pair = %pair, lattice = %lattice, "Missing interaction treated as zero");
    }
    pairs
}
