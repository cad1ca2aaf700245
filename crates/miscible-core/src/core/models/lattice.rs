use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Unknown lattice '{0}'. Expected one of: bcc, fcc, hcp")]
pub struct LatticeParseError(pub String);

/// Parent lattice of a disordered solid solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lattice {
    Bcc,
    Fcc,
    Hcp,
}

impl Lattice {
    pub const ALL: [Lattice; 3] = [Lattice::Bcc, Lattice::Fcc, Lattice::Hcp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lattice::Bcc => "bcc",
            Lattice::Fcc => "fcc",
            Lattice::Hcp => "hcp",
        }
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lattice {
    type Err = LatticeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcc" => Ok(Lattice::Bcc),
            "fcc" => Ok(Lattice::Fcc),
            "hcp" => Ok(Lattice::Hcp),
            _ => Err(LatticeParseError(s.to_string())),
        }
    }
}
