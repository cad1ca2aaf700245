use super::builder::PhaseEntryBuilder;
use super::config::{ConfigError, MiscibilityConfig, SearchStrategy};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::state::{MiscibilityOutcome, MiscibilityResult, Probe, Stability};
use crate::core::hull::compute_hull;
use crate::core::models::composition::Composition;
use crate::core::models::element::Element;
use crate::core::models::entry::ReferencePhase;
use crate::core::models::lattice::Lattice;
use crate::core::thermo::store::EnthalpyDatabase;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Upper search bound when a melting point is unknown.
pub const FALLBACK_MAX_TEMPERATURE: f64 = 3000.0;

type SearchOutput = (MiscibilityOutcome, usize, Vec<Probe>);

/// Evenly spaced temperatures from `min` to `max`, both included.
pub fn temperature_grid(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || max <= min {
        return vec![min, max];
    }
    let intervals = ((max - min) / step).ceil() as usize;
    let mut grid: Vec<f64> = (0..intervals).map(|i| min + i as f64 * step).collect();
    grid.push(max);
    grid
}

/// Outcome decided by the two bracket probes alone, or `None` when bisection is needed.
fn classify_bounds(low: &Probe, high: &Probe) -> Result<Option<MiscibilityOutcome>, EngineError> {
    match (low.stability.is_stable(), high.stability.is_stable()) {
        (true, true) => Ok(Some(MiscibilityOutcome::NeverDecomposes {
            upper_bound: high.temperature,
        })),
        (false, false) => Ok(Some(MiscibilityOutcome::MeltsBeforeMixing {
            upper_bound: high.temperature,
        })),
        (true, false) => Err(EngineError::NonMonotonicStability {
            stable_at: low.temperature,
            unstable_at: high.temperature,
        }),
        (false, true) => Ok(None),
    }
}

/// Outcome of a sweep ordered by temperature, with the number of stability flips.
///
/// The transition is placed after the hottest unstable probe.
fn sweep_outcome(probes: &[Probe], t_max: f64) -> (MiscibilityOutcome, usize) {
    let flips = probes
        .windows(2)
        .filter(|pair| pair[0].stability.is_stable() != pair[1].stability.is_stable())
        .count();
    let outcome = match probes.iter().rposition(|p| !p.stability.is_stable()) {
        None => MiscibilityOutcome::NeverDecomposes { upper_bound: t_max },
        Some(last) if last + 1 == probes.len() => {
            MiscibilityOutcome::MeltsBeforeMixing { upper_bound: t_max }
        }
        Some(last) => MiscibilityOutcome::Transition {
            temperature: 0.5 * (probes[last].temperature + probes[last + 1].temperature),
        },
    };
    (outcome, flips)
}

/// Locates the temperature above which a solid solution is stable on the hull.
///
/// Bisection assumes stability is monotonic in temperature: unstable below the
/// transition, stable above it. [`SearchStrategy::Sweep`] probes a full grid
/// instead and can be used to check that assumption.
#[derive(Debug, Clone, Copy)]
pub struct MiscibilityTemperatureSearch<'a> {
    builder: PhaseEntryBuilder<'a>,
    config: &'a MiscibilityConfig,
}

impl<'a> MiscibilityTemperatureSearch<'a> {
    pub fn new(
        database: &'a EnthalpyDatabase,
        references: &'a [ReferencePhase],
        config: &'a MiscibilityConfig,
    ) -> Self {
        Self {
            builder: PhaseEntryBuilder::new(database, references, config),
            config,
        }
    }

    #[inline]
    pub fn builder(&self) -> &PhaseEntryBuilder<'a> {
        &self.builder
    }

    /// `[T_min, T_max]` for `composition`; the upper bound defaults to the mole-fraction
    /// weighted melting point.
    pub fn temperature_bounds(&self, composition: &Composition) -> Result<(f64, f64), EngineError> {
        let search = &self.config.search;
        let min = search.min_temperature;
        let max = match search.max_temperature {
            Some(max) => max,
            None => match self.builder.model().database().mixture_melting_point(composition) {
                Some(melting) => melting,
                None => {
                    warn!(
                        composition = %composition,
                        fallback = FALLBACK_MAX_TEMPERATURE,
                        "Unknown melting point; using fallback upper temperature bound"
                    );
                    FALLBACK_MAX_TEMPERATURE
                }
            },
        };
        if !(max > min) {
            return Err(ConfigError::InvalidParameter {
                name: "max_temperature",
                reason: format!("upper bound {max} K is not above lower bound {min} K"),
            }
            .into());
        }
        Ok((min, max))
    }

    /// Hull stability of `composition` on `lattice` at `temperature`.
    pub fn probe(
        &self,
        composition: &Composition,
        lattice: Lattice,
        temperature: f64,
    ) -> Result<Probe, EngineError> {
        let elements: Vec<Element> = composition.elements().cloned().collect();
        let mut entries = self.builder.build_competing_entries(&elements, temperature)?;
        entries.push(self.builder.solution_entry(composition, temperature, lattice)?);
        let target = entries.len() - 1;

        let hull = compute_hull(entries)?;
        let energy_above_hull = hull.energy_above_hull(target).unwrap_or(f64::NAN);
        let stability = Stability::from_energy_above_hull(
            energy_above_hull,
            self.config.search.stability_tolerance,
        );
        debug!(temperature, energy_above_hull, %stability, "Probed target");
        Ok(Probe {
            temperature,
            energy_above_hull,
            stability,
        })
    }

    fn observe(
        &self,
        composition: &Composition,
        lattice: Lattice,
        temperature: f64,
        reporter: &ProgressReporter,
    ) -> Result<Probe, EngineError> {
        let probe = self.probe(composition, lattice, temperature)?;
        reporter.report(Progress::Probe {
            temperature,
            stability: probe.stability,
        });
        Ok(probe)
    }

    #[instrument(skip_all, name = "miscibility_search", fields(composition = %composition, lattice = %lattice))]
    pub fn run(
        &self,
        composition: &Composition,
        lattice: Lattice,
        reporter: &ProgressReporter,
    ) -> Result<MiscibilityResult, EngineError> {
        let bounds = self.temperature_bounds(composition)?;
        let (outcome, iterations, probes) = match self.config.search.strategy {
            SearchStrategy::Bisection => self.bisect(composition, lattice, bounds, reporter)?,
            SearchStrategy::Sweep { step } => {
                self.sweep(composition, lattice, bounds, step, reporter)?
            }
        };

        info!(
            outcome = outcome.label(),
            temperature = outcome.as_pair().0,
            iterations,
            "Miscibility search finished."
        );
        Ok(MiscibilityResult {
            composition: composition.clone(),
            lattice,
            outcome,
            bounds,
            iterations,
            probes,
        })
    }

    fn bisect(
        &self,
        composition: &Composition,
        lattice: Lattice,
        (t_min, t_max): (f64, f64),
        reporter: &ProgressReporter,
    ) -> Result<SearchOutput, EngineError> {
        let mut probes = Vec::new();
        let low = self.observe(composition, lattice, t_min, reporter)?;
        let high = self.observe(composition, lattice, t_max, reporter)?;
        probes.push(low);
        probes.push(high);

        if let Some(outcome) = classify_bounds(&low, &high)? {
            return Ok((outcome, 0, probes));
        }

        let tolerance = self.config.search.temperature_tolerance;
        let max_iterations = self.config.search.max_iterations;
        let (mut unstable, mut stable) = (t_min, t_max);
        let mut iterations = 0;
        while stable - unstable >= tolerance {
            if iterations >= max_iterations {
                return Err(EngineError::SearchNonConvergence {
                    iterations,
                    bracket: stable - unstable,
                    tolerance,
                });
            }
            iterations += 1;
            let mid = 0.5 * (unstable + stable);
            let probe = self.observe(composition, lattice, mid, reporter)?;
            probes.push(probe);
            if probe.stability.is_stable() {
                stable = mid;
            } else {
                unstable = mid;
            }
        }

        Ok((
            MiscibilityOutcome::Transition {
                temperature: 0.5 * (unstable + stable),
            },
            iterations,
            probes,
        ))
    }

    fn sweep(
        &self,
        composition: &Composition,
        lattice: Lattice,
        (t_min, t_max): (f64, f64),
        step: f64,
        reporter: &ProgressReporter,
    ) -> Result<SearchOutput, EngineError> {
        let temperatures = temperature_grid(t_min, t_max, step);
        reporter.report(Progress::TaskStart {
            total_steps: temperatures.len() as u64,
        });

        #[cfg(not(feature = "parallel"))]
        let iterator = temperatures.iter();

        #[cfg(feature = "parallel")]
        let iterator = temperatures.par_iter();

        let results: Vec<Result<Probe, EngineError>> = iterator
            .map(|&temperature| {
                let probe = self.observe(composition, lattice, temperature, reporter);
                reporter.report(Progress::TaskIncrement);
                probe
            })
            .collect();
        reporter.report(Progress::TaskFinish);
        let probes = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        let (outcome, flips) = sweep_outcome(&probes, t_max);
        if flips > 1 {
            warn!(
                flips,
                "Stability changes more than once across the sweep; reporting the highest transition"
            );
            reporter.report(Progress::Message(format!(
                "{composition} ({lattice}): stability changes {flips} times across the sweep"
            )));
        }
        let iterations = probes.len();
        Ok((outcome, iterations, probes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::MiscibilityConfigBuilder;
    use crate::core::thermo::store::Interaction;

    fn el(symbol: &str) -> Element {
        Element::new(symbol).unwrap()
    }

    fn binary_database(omega: f64) -> EnthalpyDatabase {
        let mut db = EnthalpyDatabase::new();
        db.store_mut_or_insert(Lattice::Bcc)
            .insert(el("A"), el("B"), Interaction::Regular { omega })
            .unwrap();
        db
    }

    fn equimolar() -> Composition {
        "A-B".parse().unwrap()
    }

    #[test]
    fn attractive_binary_is_stable_at_zero_kelvin() {
        let db = binary_database(-0.5);
        let config = MiscibilityConfigBuilder::new().build().unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        let probe = search.probe(&equimolar(), Lattice::Bcc, 0.0).unwrap();
        assert_eq!(probe.stability, Stability::Stable);
        assert_eq!(probe.energy_above_hull, 0.0);
    }

    #[test]
    fn attractive_binary_never_decomposes() {
        let db = binary_database(-0.5);
        let config = MiscibilityConfigBuilder::new()
            .max_temperature(3000.0)
            .build()
            .unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        for temperature in [0.0, 300.0, 1500.0, 3000.0] {
            let probe = search.probe(&equimolar(), Lattice::Bcc, temperature).unwrap();
            assert!(probe.stability.is_stable(), "unstable at {temperature} K");
        }
        let result = search
            .run(&equimolar(), Lattice::Bcc, &ProgressReporter::new())
            .unwrap();
        assert_eq!(
            result.outcome,
            MiscibilityOutcome::NeverDecomposes {
                upper_bound: 3000.0
            }
        );
        assert_eq!(result.outcome.as_pair(), (3000.0, true));
    }

    #[test]
    fn repulsive_binary_is_unstable_at_zero_kelvin() {
        let db = binary_database(0.5);
        let config = MiscibilityConfigBuilder::new().build().unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        let probe = search.probe(&equimolar(), Lattice::Bcc, 0.0).unwrap();
        assert_eq!(probe.stability, Stability::Unstable);
        assert!((probe.energy_above_hull - 0.125).abs() < 1e-12);
    }

    #[test]
    fn repulsive_binary_has_finite_transition() {
        let db = binary_database(0.5);
        let config = MiscibilityConfigBuilder::new()
            .max_temperature(5000.0)
            .build()
            .unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        let result = search
            .run(&equimolar(), Lattice::Bcc, &ProgressReporter::new())
            .unwrap();
        let temperature = result.outcome.temperature().unwrap();
        assert!(
            (2870.0..2895.0).contains(&temperature),
            "transition at {temperature} K"
        );
        assert!(result.iterations <= 20);
        assert_eq!(result.probes.len(), result.iterations + 2);
        assert!(!result.outcome.as_pair().1);
    }

    #[test]
    fn narrow_bound_melts_before_mixing() {
        let db = binary_database(0.5);
        let config = MiscibilityConfigBuilder::new()
            .max_temperature(1000.0)
            .build()
            .unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        let result = search
            .run(&equimolar(), Lattice::Bcc, &ProgressReporter::new())
            .unwrap();
        assert_eq!(
            result.outcome,
            MiscibilityOutcome::MeltsBeforeMixing {
                upper_bound: 1000.0
            }
        );
        assert_eq!(result.outcome.as_pair(), (1000.0, true));
    }

    #[test]
    fn iteration_cap_surfaces_non_convergence() {
        let db = binary_database(0.5);
        let config = MiscibilityConfigBuilder::new()
            .max_temperature(5000.0)
            .temperature_tolerance(1e-3)
            .max_iterations(5)
            .build()
            .unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        let result = search.run(&equimolar(), Lattice::Bcc, &ProgressReporter::new());
        assert!(matches!(
            result,
            Err(EngineError::SearchNonConvergence { iterations: 5, .. })
        ));
    }

    #[test]
    fn sweep_agrees_with_bisection_within_one_step() {
        let db = binary_database(0.5);
        let config = MiscibilityConfigBuilder::new()
            .max_temperature(5000.0)
            .strategy(SearchStrategy::Sweep { step: 100.0 })
            .build()
            .unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        let result = search
            .run(&equimolar(), Lattice::Bcc, &ProgressReporter::new())
            .unwrap();
        let temperature = result.outcome.temperature().unwrap();
        assert!((temperature - 2881.0).abs() <= 100.0);
        assert_eq!(result.iterations, 51);
    }

    #[test]
    fn missing_interaction_propagates() {
        let mut db = EnthalpyDatabase::new();
        db.store_mut_or_insert(Lattice::Bcc);
        let config = MiscibilityConfigBuilder::new()
            .max_temperature(2000.0)
            .build()
            .unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        let error = search
            .run(&equimolar(), Lattice::Bcc, &ProgressReporter::new())
            .unwrap_err();
        assert!(error.is_missing_interaction());
    }

    #[test]
    fn upper_bound_defaults_to_mixture_melting_point() {
        let mut db = binary_database(0.1);
        db.set_melting_point(el("A"), 1000.0);
        db.set_melting_point(el("B"), 2000.0);
        let config = MiscibilityConfigBuilder::new().build().unwrap();
        let search = MiscibilityTemperatureSearch::new(&db, &[], &config);
        assert_eq!(search.temperature_bounds(&equimolar()).unwrap(), (0.0, 1500.0));

        let unknown = binary_database(0.1);
        let search = MiscibilityTemperatureSearch::new(&unknown, &[], &config);
        assert_eq!(
            search.temperature_bounds(&equimolar()).unwrap(),
            (0.0, FALLBACK_MAX_TEMPERATURE)
        );
    }

    fn probe_at(temperature: f64, stable: bool) -> Probe {
        Probe {
            temperature,
            energy_above_hull: if stable { 0.0 } else { 0.01 },
            stability: if stable {
                Stability::Stable
            } else {
                Stability::Unstable
            },
        }
    }

    #[test]
    fn stable_below_unstable_above_is_non_monotonic() {
        let result = classify_bounds(&probe_at(0.0, true), &probe_at(1800.0, false));
        assert!(matches!(
            result,
            Err(EngineError::NonMonotonicStability {
                stable_at: 0.0,
                unstable_at: 1800.0
            })
        ));
        assert_eq!(
            classify_bounds(&probe_at(0.0, false), &probe_at(1800.0, true)).unwrap(),
            None
        );
        assert_eq!(
            classify_bounds(&probe_at(0.0, true), &probe_at(1800.0, true)).unwrap(),
            Some(MiscibilityOutcome::NeverDecomposes {
                upper_bound: 1800.0
            })
        );
        assert_eq!(
            classify_bounds(&probe_at(0.0, false), &probe_at(1800.0, false)).unwrap(),
            Some(MiscibilityOutcome::MeltsBeforeMixing {
                upper_bound: 1800.0
            })
        );
    }

    #[test]
    fn sweep_reports_the_highest_unstable_to_stable_flip() {
        let probes: Vec<Probe> = [
            (0.0, false),
            (100.0, true),
            (200.0, true),
            (300.0, false),
            (400.0, false),
            (500.0, true),
            (600.0, true),
        ]
        .iter()
        .map(|&(t, stable)| probe_at(t, stable))
        .collect();
        let (outcome, flips) = sweep_outcome(&probes, 600.0);
        assert_eq!(flips, 3);
        assert_eq!(outcome, MiscibilityOutcome::Transition { temperature: 450.0 });
    }

    #[test]
    fn sweep_sentinels_match_the_end_probes() {
        let stable: Vec<Probe> = [0.0, 100.0].iter().map(|&t| probe_at(t, true)).collect();
        assert_eq!(
            sweep_outcome(&stable, 100.0),
            (MiscibilityOutcome::NeverDecomposes { upper_bound: 100.0 }, 0)
        );
        let cooling = vec![probe_at(0.0, true), probe_at(100.0, false)];
        assert_eq!(
            sweep_outcome(&cooling, 100.0),
            (MiscibilityOutcome::MeltsBeforeMixing { upper_bound: 100.0 }, 1)
        );
    }

    #[test]
    fn temperature_grid_includes_both_bounds() {
        assert_eq!(temperature_grid(0.0, 250.0, 100.0), vec![0.0, 100.0, 200.0, 250.0]);
        assert_eq!(temperature_grid(0.0, 200.0, 100.0), vec![0.0, 100.0, 200.0]);
        assert_eq!(temperature_grid(0.0, 10.0, 0.0), vec![0.0, 10.0]);
    }
}
