use super::element::{Element, ElementError};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tolerance on the sum of mole fractions.
pub const COMPOSITION_TOLERANCE: f64 = 1e-6;

const ZERO_FRACTION: f64 = 1e-12;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum CompositionError {
    #[error("Composition must contain at least one element with a positive fraction")]
    Empty,
    #[error("Mole fraction of {element} is negative ({value})")]
    NegativeFraction { element: Element, value: f64 },
    #[error("Mole fraction of {element} is not a finite number")]
    NonFinite { element: Element },
    #[error("Mole fractions sum to {sum}, expected 1")]
    NotNormalized { sum: f64 },
    #[error("Expected {expected} mole fraction(s), found {found}")]
    ElementCountMismatch { expected: usize, found: usize },
    #[error("Element {0} appears more than once")]
    DuplicateElement(Element),
    #[error("Element {element} is not part of the system {system}")]
    ForeignElement { element: Element, system: String },
    #[error("Invalid composition '{input}': {reason}")]
    Parse { input: String, reason: String },
}

/// Mole fractions of the elements in an alloy.
///
/// Elements with a zero fraction are not stored, so two compositions that only
/// differ by padding with absent elements compare equal. Iteration is in symbol
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    fractions: BTreeMap<Element, f64>,
}

impl Composition {
    pub fn new<I>(fractions: I) -> Result<Self, CompositionError>
    where
        I: IntoIterator<Item = (Element, f64)>,
    {
        let mut map = BTreeMap::new();
        let mut sum = 0.0;
        for (element, value) in fractions {
            if !value.is_finite() {
                return Err(CompositionError::NonFinite { element });
            }
            if value < -ZERO_FRACTION {
                return Err(CompositionError::NegativeFraction { element, value });
            }
            if map.contains_key(&element) {
                return Err(CompositionError::DuplicateElement(element));
            }
            let value = value.clamp(0.0, 1.0);
            sum += value;
            map.insert(element, value);
        }

        if (sum - 1.0).abs() > COMPOSITION_TOLERANCE {
            return Err(CompositionError::NotNormalized { sum });
        }

        map.retain(|_, value| *value > ZERO_FRACTION);
        if map.is_empty() {
            return Err(CompositionError::Empty);
        }
        Ok(Self { fractions: map })
    }

    /// Pairs `elements[i]` with `fractions[i]`.
    pub fn from_fractions(elements: &[Element], fractions: &[f64]) -> Result<Self, CompositionError> {
        if elements.len() != fractions.len() {
            return Err(CompositionError::ElementCountMismatch {
                expected: elements.len(),
                found: fractions.len(),
            });
        }
        Self::new(elements.iter().cloned().zip(fractions.iter().copied()))
    }

    /// Normalises arbitrary non-negative amounts (e.g. `Al1 Co3`) into mole fractions.
    pub fn from_amounts<I>(amounts: I) -> Result<Self, CompositionError>
    where
        I: IntoIterator<Item = (Element, f64)>,
    {
        let amounts: Vec<(Element, f64)> = amounts.into_iter().collect();
        let total: f64 = amounts.iter().map(|(_, amount)| *amount).sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(CompositionError::Empty);
        }
        Self::new(
            amounts
                .into_iter()
                .map(|(element, amount)| (element, amount / total)),
        )
    }

    pub fn equimolar(elements: &[Element]) -> Result<Self, CompositionError> {
        if elements.is_empty() {
            return Err(CompositionError::Empty);
        }
        let fraction = 1.0 / elements.len() as f64;
        Self::new(elements.iter().map(|e| (e.clone(), fraction)))
    }

    pub fn pure(element: Element) -> Self {
        let mut fractions = BTreeMap::new();
        fractions.insert(element, 1.0);
        Self { fractions }
    }

    /// Number of elements present.
    #[inline]
    pub fn order(&self) -> usize {
        self.fractions.len()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.fractions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Element, f64)> {
        self.fractions.iter().map(|(e, x)| (e, *x))
    }

    pub fn fraction(&self, element: &Element) -> f64 {
        self.fractions.get(element).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, element: &Element) -> bool {
        self.fractions.contains_key(element)
    }

    /// True if every element present is in `elements`.
    pub fn is_within(&self, elements: &[Element]) -> bool {
        self.fractions.keys().all(|e| elements.contains(e))
    }

    pub fn is_equimolar(&self) -> bool {
        let expected = 1.0 / self.order() as f64;
        self.fractions
            .values()
            .all(|x| (x - expected).abs() <= COMPOSITION_TOLERANCE)
    }

    /// Vector representation over `elements`, in that order.
    pub fn fractions_in(&self, elements: &[Element]) -> Result<Vec<f64>, CompositionError> {
        if let Some(foreign) = self.fractions.keys().find(|e| !elements.contains(e)) {
            return Err(CompositionError::ForeignElement {
                element: foreign.clone(),
                system: join_symbols(elements),
            });
        }
        Ok(elements.iter().map(|e| self.fraction(e)).collect())
    }

    /// Hyphen-joined element symbols, e.g. `Co-Cr-Fe`.
    pub fn system(&self) -> String {
        join_symbols(self.fractions.keys())
    }
}

fn join_symbols<'a, I>(elements: I) -> String
where
    I: IntoIterator<Item = &'a Element>,
{
    elements
        .into_iter()
        .map(Element::symbol)
        .collect::<Vec<_>>()
        .join("-")
}

fn format_fraction(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_equimolar() {
            return f.write_str(&self.system());
        }
        let parts: Vec<String> = self
            .fractions
            .iter()
            .map(|(e, x)| format!("{}{}", e, format_fraction(*x)))
            .collect();
        f.write_str(&parts.join("-"))
    }
}

impl FromStr for Composition {
    type Err = CompositionError;

    /// Accepts `Co-Cr-Fe` (equimolar) or amounts such as `Al0.3-Co0.7` and `Al1-Co3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = |reason: String| CompositionError::Parse {
            input: s.to_string(),
            reason,
        };

        let mut amounts = Vec::new();
        for token in s.split('-').map(str::trim) {
            if token.is_empty() {
                return Err(parse_error("empty component".to_string()));
            }
            let split = token
                .char_indices()
                .skip(1)
                .find(|(_, c)| !c.is_ascii_lowercase())
                .map_or(token.len(), |(idx, _)| idx);
            let (symbol, amount) = token.split_at(split);
            let element = Element::new(symbol).map_err(|e: ElementError| parse_error(e.to_string()))?;
            let amount = if amount.is_empty() {
                1.0
            } else {
                amount
                    .parse::<f64>()
                    .map_err(|_| parse_error(format!("invalid amount '{}' for {}", amount, symbol)))?
            };
            amounts.push((element, amount));
        }
        Self::from_amounts(amounts)
    }
}
