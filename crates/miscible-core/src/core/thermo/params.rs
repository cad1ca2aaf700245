use super::store::{
    EnthalpyDatabase, Interaction, InteractionError, PairKey, PairwiseEnthalpyStore,
};
use crate::core::models::composition::{Composition, CompositionError};
use crate::core::models::element::Element;
use crate::core::models::entry::ReferencePhase;
use crate::core::models::lattice::{Lattice, LatticeParseError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid parameter in '{path}': {message}")]
    Invalid { path: String, message: String },
}

impl ParamLoadError {
    fn invalid(path: &Path, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.to_string_lossy().to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
enum RawInteraction {
    Regular(f64),
    SubRegular([f64; 2]),
}

impl From<RawInteraction> for Interaction {
    fn from(raw: RawInteraction) -> Self {
        match raw {
            RawInteraction::Regular(omega) => Interaction::Regular { omega },
            RawInteraction::SubRegular([omega0, omega1]) => {
                Interaction::SubRegular { omega0, omega1 }
            }
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawLatticeTable {
    #[serde(default)]
    unary: HashMap<String, f64>,
    #[serde(default)]
    pairs: HashMap<String, RawInteraction>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawDatabase {
    #[serde(default)]
    melting_points: HashMap<String, f64>,
    #[serde(default)]
    lattices: HashMap<String, RawLatticeTable>,
}

#[derive(Debug, Deserialize)]
struct InteractionRecord {
    lattice: String,
    pair: String,
    omega: f64,
    #[serde(default)]
    omega1: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReferenceRecord {
    name: String,
    composition: String,
    energy: f64,
    #[serde(default)]
    structure: Option<String>,
}

impl EnthalpyDatabase {
    /// Loads a database, choosing the format from the file extension (`.csv` or TOML).
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let database = if is_csv {
            Self::load_csv(path)?
        } else {
            Self::load_toml(path)?
        };
        debug!(
            path = %path.display(),
            lattices = database.lattices().count(),
            "Loaded enthalpy database"
        );
        Ok(database)
    }

    pub fn load_toml(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let raw: RawDatabase = toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let mut database = EnthalpyDatabase::new();
        for (symbol, kelvin) in raw.melting_points {
            database.set_melting_point(parse_element(path, &symbol)?, kelvin);
        }
        for (label, table) in raw.lattices {
            let lattice: Lattice = label
                .parse()
                .map_err(|e: LatticeParseError| {
                    ParamLoadError::invalid(path, e.to_string())
                })?;
            let store = database.store_mut_or_insert(lattice);
            for (symbol, energy) in table.unary {
                store.set_unary(parse_element(path, &symbol)?, energy);
            }
            for (pair, raw) in table.pairs {
                let (a, b) = parse_pair(path, &pair)?;
                insert_unique(path, store, a, b, raw.into())?;
            }
        }
        Ok(database)
    }

    pub fn load_csv(path: &Path) -> Result<Self, ParamLoadError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| ParamLoadError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let mut database = EnthalpyDatabase::new();
        for result in reader.deserialize::<InteractionRecord>() {
            let record = result.map_err(|e| ParamLoadError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
            let lattice: Lattice = record
                .lattice
                .parse()
                .map_err(|e: LatticeParseError| {
                    ParamLoadError::invalid(path, e.to_string())
                })?;
            let (a, b) = parse_pair(path, &record.pair)?;
            let interaction = match record.omega1 {
                Some(omega1) => Interaction::SubRegular {
                    omega0: record.omega,
                    omega1,
                },
                None => Interaction::Regular {
                    omega: record.omega,
                },
            };
            insert_unique(path, database.store_mut_or_insert(lattice), a, b, interaction)?;
        }
        Ok(database)
    }
}

/// Reads reference phases from a `name,composition,energy,structure` CSV.
pub fn load_reference_phases(path: &Path) -> Result<Vec<ReferencePhase>, ParamLoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ParamLoadError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    let mut phases = Vec::new();
    for result in reader.deserialize::<ReferenceRecord>() {
        let record = result.map_err(|e| ParamLoadError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let composition: Composition = record
            .composition
            .parse()
            .map_err(|e: CompositionError| {
                ParamLoadError::invalid(path, e.to_string())
            })?;
        if !record.energy.is_finite() {
            return Err(ParamLoadError::invalid(
                path,
                format!("energy of reference phase '{}' is not finite", record.name),
            ));
        }
        phases.push(ReferencePhase {
            name: record.name,
            composition,
            energy: record.energy,
            structure: record.structure.filter(|s| !s.trim().is_empty()),
        });
    }
    debug!(path = %path.display(), count = phases.len(), "Loaded reference phases");
    Ok(phases)
}

fn parse_element(path: &Path, symbol: &str) -> Result<Element, ParamLoadError> {
    Element::new(symbol).map_err(|e| ParamLoadError::invalid(path, e.to_string()))
}

/// Each unordered pair may be given once per lattice, in either order.
fn insert_unique(
    path: &Path,
    store: &mut PairwiseEnthalpyStore,
    a: Element,
    b: Element,
    interaction: Interaction,
) -> Result<(), ParamLoadError> {
    let key = PairKey::new(a.clone(), b.clone())
        .map_err(|e| ParamLoadError::invalid(path, e.to_string()))?;
    match store.insert(a, b, interaction) {
        Ok(None) => Ok(()),
        Ok(Some(_)) => Err(ParamLoadError::invalid(
            path,
            format!("duplicate pair {} in {} table", key, store.lattice()),
        )),
        Err(e) => Err(ParamLoadError::invalid(path, e.to_string())),
    }
}

fn parse_pair(path: &Path, pair: &str) -> Result<(Element, Element), ParamLoadError> {
    let mut parts = pair.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((parse_element(path, a)?, parse_element(path, b)?)),
        _ => Err(ParamLoadError::invalid(
            path,
            InteractionError::InvalidPairKey(pair.to_string()).to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn el(symbol: &str) -> Element {
        Element::new(symbol).unwrap()
    }

    #[test]
    fn load_toml_succeeds_with_valid_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("db.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            r#"
            [melting-points]
            Co = 1700.0

            [lattices.bcc.unary]
            Co = -7.1

            [lattices.bcc.pairs]
            "Cr-Co" = -0.05
            "Co-Fe" = [-0.02, 0.01]

            [lattices.fcc.pairs]
            "Co-Ni" = 0.01
            "#
        )
        .unwrap();

        let db = EnthalpyDatabase::load(&file_path).unwrap();
        let bcc = db.store(Lattice::Bcc).unwrap();
        assert_eq!(
            bcc.get_pair(&el("Co"), &el("Cr")).unwrap(),
            Interaction::Regular { omega: -0.05 }
        );
        assert_eq!(
            bcc.get(&"Co-Fe".parse::<PairKey>().unwrap()).unwrap(),
            Interaction::SubRegular {
                omega0: -0.02,
                omega1: 0.01
            }
        );
        assert_eq!(bcc.get_unary(&el("Co")), -7.1);
        assert_eq!(db.store(Lattice::Fcc).unwrap().len(), 1);
        assert_eq!(db.melting_point(&el("Co")), Some(1700.0));
    }

    #[test]
    fn load_toml_reversed_sub_regular_pair_is_canonicalised() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("db.toml");
        fs::write(&file_path, "[lattices.fcc.pairs]\n\"Ni-Al\" = [0.1, 0.3]\n").unwrap();
        let db = EnthalpyDatabase::load_toml(&file_path).unwrap();
        assert_eq!(
            db.store(Lattice::Fcc)
                .unwrap()
                .get_pair(&el("Al"), &el("Ni"))
                .unwrap(),
            Interaction::SubRegular {
                omega0: 0.1,
                omega1: -0.3
            }
        );
    }

    #[test]
    fn load_toml_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = EnthalpyDatabase::load_toml(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ParamLoadError::Io { .. })));
    }

    #[test]
    fn load_toml_fails_for_malformed_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("malformed.toml");
        fs::write(&file_path, "this is not toml").unwrap();
        let result = EnthalpyDatabase::load_toml(&file_path);
        assert!(matches!(result, Err(ParamLoadError::Toml { .. })));
    }

    #[test]
    fn load_toml_rejects_unknown_lattice_and_bad_pairs() {
        let dir = tempdir().unwrap();
        let lattice_path = dir.path().join("lattice.toml");
        fs::write(&lattice_path, "[lattices.b2.pairs]\n\"A-B\" = 0.1\n").unwrap();
        assert!(matches!(
            EnthalpyDatabase::load_toml(&lattice_path),
            Err(ParamLoadError::Invalid { .. })
        ));

        let pair_path = dir.path().join("pair.toml");
        fs::write(&pair_path, "[lattices.bcc.pairs]\n\"A-B-C\" = 0.1\n").unwrap();
        assert!(matches!(
            EnthalpyDatabase::load_toml(&pair_path),
            Err(ParamLoadError::Invalid { .. })
        ));
    }

    #[test]
    fn load_csv_reads_regular_and_sub_regular_rows() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("db.csv");
        fs::write(
            &file_path,
            "lattice,pair,omega,omega1\nbcc,Fe-Cr,0.05,\nfcc,Ni-Co,-0.01,0.002\n",
        )
        .unwrap();

        let db = EnthalpyDatabase::load(&file_path).unwrap();
        assert_eq!(
            db.store(Lattice::Bcc)
                .unwrap()
                .get_pair(&el("Cr"), &el("Fe"))
                .unwrap(),
            Interaction::Regular { omega: 0.05 }
        );
        assert_eq!(
            db.store(Lattice::Fcc)
                .unwrap()
                .get_pair(&el("Co"), &el("Ni"))
                .unwrap(),
            Interaction::SubRegular {
                omega0: -0.01,
                omega1: -0.002
            }
        );
    }

    #[test]
    fn load_toml_rejects_pair_given_in_both_orders() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("dup.toml");
        fs::write(
            &file_path,
            "[lattices.fcc.pairs]\n\"Co-Ni\" = 0.1\n\"Ni-Co\" = 0.2\n",
        )
        .unwrap();
        for _ in 0..20 {
            match EnthalpyDatabase::load_toml(&file_path) {
                Err(ParamLoadError::Invalid { message, .. }) => {
                    assert!(message.contains("duplicate pair Co-Ni"), "{message}");
                }
                other => panic!("expected duplicate pair error, got {other:?}"),
            }
        }
    }

    #[test]
    fn load_toml_allows_same_pair_on_different_lattices() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("db.toml");
        fs::write(
            &file_path,
            "[lattices.fcc.pairs]\n\"Co-Ni\" = 0.1\n[lattices.bcc.pairs]\n\"Ni-Co\" = 0.2\n",
        )
        .unwrap();
        let db = EnthalpyDatabase::load_toml(&file_path).unwrap();
        assert_eq!(db.store(Lattice::Bcc).unwrap().len(), 1);
        assert_eq!(db.store(Lattice::Fcc).unwrap().len(), 1);
    }

    #[test]
    fn load_csv_rejects_repeated_pair() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("dup.csv");
        fs::write(
            &file_path,
            "lattice,pair,omega,omega1\nbcc,Fe-Cr,0.05,\nfcc,Fe-Cr,0.04,\nbcc,Cr-Fe,0.06,\n",
        )
        .unwrap();
        match EnthalpyDatabase::load_csv(&file_path) {
            Err(ParamLoadError::Invalid { message, .. }) => {
                assert!(message.contains("duplicate pair Cr-Fe"), "{message}");
                assert!(message.contains("bcc"), "{message}");
            }
            other => panic!("expected duplicate pair error, got {other:?}"),
        }
    }

    #[test]
    fn load_csv_fails_for_malformed_rows() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.csv");
        fs::write(&file_path, "lattice,pair,omega\nbcc,Fe-Cr,not-a-number\n").unwrap();
        assert!(matches!(
            EnthalpyDatabase::load_csv(&file_path),
            Err(ParamLoadError::Csv { .. })
        ));
    }

    #[test]
    fn load_reference_phases_parses_compositions() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("refs.csv");
        fs::write(
            &file_path,
            "name,composition,energy,structure\nAlNi,Al-Ni,-0.62,B2\nAl3Ni,Al3-Ni1,-0.45,\n",
        )
        .unwrap();

        let phases = load_reference_phases(&file_path).unwrap();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[0].name, "AlNi");
        assert_eq!(phases[0].structure.as_deref(), Some("B2"));
        assert!((phases[1].composition.fraction(&el("Al")) - 0.75).abs() < 1e-12);
        assert_eq!(phases[1].structure, None);
    }

    #[test]
    fn load_reference_phases_rejects_invalid_composition() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("refs.csv");
        fs::write(&file_path, "name,composition,energy\nX,al-ni,-0.1\n").unwrap();
        assert!(matches!(
            load_reference_phases(&file_path),
            Err(ParamLoadError::Invalid { .. })
        ));
    }
}
