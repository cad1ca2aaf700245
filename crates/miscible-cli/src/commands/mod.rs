use crate::cli::{CommonArgs, SearchOverrides};
use crate::config::PartialMiscibilityConfig;
use crate::error::Result;
use miscible::core::models::entry::ReferencePhase;
use miscible::core::thermo::params::load_reference_phases;
use miscible::core::thermo::store::EnthalpyDatabase;
use miscible::engine::config::MiscibilityConfig;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

pub mod hull;
pub mod screen;
pub mod search;

/// Everything a workflow needs, loaded and merged from files and flags.
pub struct Inputs {
    pub database: EnthalpyDatabase,
    pub references: Vec<ReferencePhase>,
    pub config: MiscibilityConfig,
}

impl Inputs {
    pub fn load(common: &CommonArgs, overrides: &SearchOverrides) -> Result<Self> {
        let resolved = PartialMiscibilityConfig::load(common.config.as_deref())?
            .merge_with_cli(common, overrides)?;

        info!("Loading enthalpy database from {:?}", &common.database);
        let mut database = EnthalpyDatabase::load(&common.database)?;
        database.set_missing_policy(resolved.missing_policy);

        let references = match &common.references {
            Some(path) => {
                info!("Loading reference phases from {:?}", path);
                load_reference_phases(path)?
            }
            None => Vec::new(),
        };

        Ok(Self {
            database,
            references,
            config: resolved.core,
        })
    }
}

pub fn write_csv<W: Write, R: Serialize>(writer: W, rows: impl IntoIterator<Item = R>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `rows` to `path`, or to stdout when no path is given.
pub fn write_csv_output<R: Serialize>(
    path: Option<&Path>,
    rows: impl IntoIterator<Item = R>,
) -> Result<()> {
    match path {
        Some(path) => {
            info!("Writing results to {:?}", path);
            write_csv(File::create(path)?, rows)
        }
        None => write_csv(std::io::stdout().lock(), rows),
    }
}
