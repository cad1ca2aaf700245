use phf::{Map, phf_map};

/// Elemental melting points in kelvin at ambient pressure.
static MELTING_POINTS: Map<&'static str, f64> = phf_map! {
    "Ag" => 1234.93,
    "Al" => 933.47,
    "Au" => 1337.33,
    "B" => 2349.0,
    "Be" => 1560.0,
    "C" => 3823.0,
    "Ca" => 1115.0,
    "Cd" => 594.22,
    "Ce" => 1068.0,
    "Co" => 1768.0,
    "Cr" => 2180.0,
    "Cu" => 1357.77,
    "Dy" => 1680.0,
    "Er" => 1802.0,
    "Fe" => 1811.0,
    "Ga" => 302.91,
    "Gd" => 1585.0,
    "Ge" => 1211.4,
    "Hf" => 2506.0,
    "In" => 429.75,
    "Ir" => 2739.0,
    "La" => 1193.0,
    "Li" => 453.65,
    "Mg" => 923.0,
    "Mn" => 1519.0,
    "Mo" => 2896.0,
    "Nb" => 2750.0,
    "Nd" => 1297.0,
    "Ni" => 1728.0,
    "Os" => 3306.0,
    "Pb" => 600.61,
    "Pd" => 1828.05,
    "Pt" => 2041.4,
    "Re" => 3459.0,
    "Rh" => 2237.0,
    "Ru" => 2607.0,
    "Sc" => 1814.0,
    "Si" => 1687.0,
    "Sn" => 505.08,
    "Ta" => 3290.0,
    "Ti" => 1941.0,
    "V" => 2183.0,
    "W" => 3695.0,
    "Y" => 1799.0,
    "Zn" => 692.68,
    "Zr" => 2128.0,
};

/// Melting point of `symbol` in K, if tabulated.
pub fn melting_point(symbol: &str) -> Option<f64> {
    MELTING_POINTS.get(symbol).copied()
}
