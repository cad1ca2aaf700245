use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ElementError {
    #[error("Element symbol cannot be empty")]
    Empty,
    #[error(
        "Invalid element symbol '{0}': expected an uppercase letter followed by lowercase letters"
    )]
    InvalidSymbol(String),
}

/// A chemical element identified by its symbol.
///
/// Ordering follows the symbol, which is what makes pair keys and composition
/// vectors canonical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Element(String);

impl Element {
    pub fn new(symbol: &str) -> Result<Self, ElementError> {
        let symbol = symbol.trim();
        let mut chars = symbol.chars();
        let first = chars.next().ok_or(ElementError::Empty)?;
        if !first.is_ascii_uppercase() || !chars.all(|c| c.is_ascii_lowercase()) {
            return Err(ElementError::InvalidSymbol(symbol.to_string()));
        }
        Ok(Self(symbol.to_string()))
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Element {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Element {
    type Error = ElementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Element> for String {
    fn from(element: Element) -> Self {
        element.0
    }
}

impl AsRef<str> for Element {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parses a hyphen-joined element list such as `Co-Cr-Fe-Ni`.
pub fn parse_element_list(input: &str) -> Result<Vec<Element>, ElementError> {
    input
        .split(['-', ','])
        .filter(|token| !token.trim().is_empty())
        .map(Element::new)
        .collect()
}
