use crate::core::models::composition::Composition;
use crate::core::models::element::Element;
use crate::core::models::entry::ReferencePhase;
use crate::core::models::lattice::Lattice;
use crate::core::thermo::store::EnthalpyDatabase;
use crate::engine::config::MiscibilityConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::search::MiscibilityTemperatureSearch;
use crate::engine::state::MiscibilityResult;
use tracing::{info, instrument};

/// Miscibility temperature of one solid solution.
#[instrument(skip_all, name = "miscibility_workflow")]
pub fn run(
    composition: &Composition,
    lattice: Lattice,
    database: &EnthalpyDatabase,
    references: &[ReferencePhase],
    config: &MiscibilityConfig,
    reporter: &ProgressReporter,
) -> Result<MiscibilityResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Temperature Search",
    });
    info!(composition = %composition, lattice = %lattice, "Searching miscibility temperature.");

    let search = MiscibilityTemperatureSearch::new(database, references, config);
    let elements: Vec<Element> = composition.elements().cloned().collect();
    search
        .builder()
        .warn_zero_filled_pairs(&elements, Some(lattice));
    let result = search.run(composition, lattice, reporter);

    reporter.report(Progress::PhaseFinish);
    result
}
