use crate::core::hull::{ConvexHull, compute_hull};
use crate::core::models::composition::Composition;
use crate::core::models::element::Element;
use crate::core::models::entry::ReferencePhase;
use crate::core::thermo::store::EnthalpyDatabase;
use crate::engine::builder::PhaseEntryBuilder;
use crate::engine::config::MiscibilityConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

/// One competing phase and where it sits relative to the hull.
#[derive(Debug, Clone, PartialEq)]
pub struct HullRow {
    pub label: String,
    /// Lattice of a solution sample, structure (or `ordered`) of a reference phase.
    pub kind: String,
    pub composition: Composition,
    pub energy: f64,
    pub energy_above_hull: f64,
    pub on_hull: bool,
    /// Hull phases the entry separates into, as `(label, molar fraction)`.
    pub decomposition: Vec<(String, f64)>,
}

#[derive(Debug, Clone)]
pub struct HullAnalysis {
    pub temperature: f64,
    pub rows: Vec<HullRow>,
    pub hull: ConvexHull,
}

impl HullAnalysis {
    pub fn stable_rows(&self, tolerance: f64) -> impl Iterator<Item = &HullRow> {
        self.rows
            .iter()
            .filter(move |row| row.energy_above_hull <= tolerance)
    }
}

/// Hull of every competing phase of `elements` at `temperature`.
#[instrument(skip_all, name = "hull_workflow", fields(temperature = temperature))]
pub fn run(
    elements: &[Element],
    temperature: f64,
    database: &EnthalpyDatabase,
    references: &[ReferencePhase],
    config: &MiscibilityConfig,
    reporter: &ProgressReporter,
) -> Result<HullAnalysis, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Hull Construction",
    });
    let builder = PhaseEntryBuilder::new(database, references, config);
    builder.warn_zero_filled_pairs(elements, None);
    let entries = builder.build_competing_entries(elements, temperature)?;
    let hull = compute_hull(entries)?;
    reporter.report(Progress::PhaseFinish);

    let rows = (0..hull.len())
        .map(|index| row(&hull, index))
        .collect::<Result<Vec<_>, EngineError>>()?;
    info!(
        entries = rows.len(),
        vertices = hull.hull_vertices().len(),
        "Hull analysis finished."
    );
    Ok(HullAnalysis {
        temperature,
        rows,
        hull,
    })
}

fn row(hull: &ConvexHull, index: usize) -> Result<HullRow, EngineError> {
    let entry = &hull.entries()[index];
    let decomposition = hull
        .decomposition(index)?
        .products
        .iter()
        .map(|product| (hull.entries()[product.index].label(), product.fraction))
        .collect();
    Ok(HullRow {
        label: entry.label(),
        kind: entry.lattice_label().to_string(),
        composition: entry.composition.clone(),
        energy: entry.energy,
        energy_above_hull: hull.energy_above_hull(index).unwrap_or(f64::NAN),
        on_hull: hull.is_on_hull(index),
        decomposition,
    })
}
