use super::composition::Composition;
use super::element::Element;
use super::lattice::Lattice;

/// A known ordered phase (intermetallic or end member) supplied from outside the model.
///
/// `energy` is the Gibbs free energy per atom on the same absolute scale as the
/// solution model; it is treated as temperature independent.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePhase {
    pub name: String,
    pub composition: Composition,
    pub energy: f64,
    pub structure: Option<String>,
}

impl ReferencePhase {
    pub fn is_within(&self, elements: &[Element]) -> bool {
        self.composition.is_within(elements)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    /// A disordered solid-solution sample evaluated with the thermodynamic model.
    Solution { lattice: Lattice },
    /// A reference phase taken as given.
    Reference {
        name: String,
        structure: Option<String>,
    },
}

/// One candidate phase at a fixed temperature. Energy is in eV/atom.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseEntry {
    pub composition: Composition,
    pub energy: f64,
    pub kind: EntryKind,
}

impl PhaseEntry {
    pub fn solution(composition: Composition, energy: f64, lattice: Lattice) -> Self {
        Self {
            composition,
            energy,
            kind: EntryKind::Solution { lattice },
        }
    }

    pub fn reference(phase: &ReferencePhase) -> Self {
        Self {
            composition: phase.composition.clone(),
            energy: phase.energy,
            kind: EntryKind::Reference {
                name: phase.name.clone(),
                structure: phase.structure.clone(),
            },
        }
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, EntryKind::Reference { .. })
    }

    pub fn lattice(&self) -> Option<Lattice> {
        match self.kind {
            EntryKind::Solution { lattice } => Some(lattice),
            EntryKind::Reference { .. } => None,
        }
    }

    /// Lattice label for solution samples, structure label (or `ordered`) for references.
    pub fn lattice_label(&self) -> &str {
        match &self.kind {
            EntryKind::Solution { lattice } => lattice.as_str(),
            EntryKind::Reference { structure, .. } => structure.as_deref().unwrap_or("ordered"),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Solution { .. } => None,
            EntryKind::Reference { name, .. } => Some(name),
        }
    }

    pub fn label(&self) -> String {
        match &self.kind {
            EntryKind::Solution { lattice } => format!("{} ({})", self.composition, lattice),
            EntryKind::Reference { name, .. } => name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_entry_carries_name_and_structure() {
        let phase = ReferencePhase {
            name: "AlNi".to_string(),
            composition: "Al-Ni".parse().unwrap(),
            energy: -0.6,
            structure: Some("B2".to_string()),
        };
        let entry = PhaseEntry::reference(&phase);
        assert!(entry.is_reference());
        assert_eq!(entry.name(), Some("AlNi"));
        assert_eq!(entry.lattice_label(), "B2");
        assert_eq!(entry.lattice(), None);
        assert_eq!(entry.label(), "AlNi");
    }

    #[test]
    fn solution_entry_reports_lattice() {
        let entry = PhaseEntry::solution("Co-Ni".parse().unwrap(), -0.1, Lattice::Fcc);
        assert!(!entry.is_reference());
        assert_eq!(entry.lattice(), Some(Lattice::Fcc));
        assert_eq!(entry.lattice_label(), "fcc");
        assert_eq!(entry.name(), None);
        assert_eq!(entry.label(), "Co-Ni (fcc)");
    }

    #[test]
    fn reference_within_checks_every_element() {
        let phase = ReferencePhase {
            name: "Al3Ni".to_string(),
            composition: "Al3-Ni1".parse().unwrap(),
            energy: -0.4,
            structure: None,
        };
        let al = Element::new("Al").unwrap();
        let ni = Element::new("Ni").unwrap();
        let co = Element::new("Co").unwrap();
        assert!(phase.is_within(&[al.clone(), co.clone(), ni]));
        assert!(!phase.is_within(&[al, co]));
    }
}
