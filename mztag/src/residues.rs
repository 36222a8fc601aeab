//! Amino acid residue masses and a tolerance-bounded index for explaining
//! mass gaps between two observed masses.
use std::collections::HashMap;
use std::fmt::Display;

/// The mass difference between the C13 and C12 isotopes, the spacing of
/// isotopic peaks.
pub const NEUTRON_SHIFT: f64 = 1.0033548378;

/// The monoisotopic mass of H2O, the difference between a free
/// residue chain and its internal (anhydro) form.
pub const WATER_MASS: f64 = 18.0105646837;

/// An amino acid symbol and the monoisotopic mass of its internal, anhydro form.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Residue {
    pub symbol: char,
    pub mass: f64,
}

impl Residue {
    pub const fn new(symbol: char, mass: f64) -> Self {
        Self { symbol, mass }
    }
}

impl Display for Residue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// The 20 standard amino acids
pub const STANDARD_RESIDUES: [Residue; 20] = [
    Residue::new('G', 57.02146372),
    Residue::new('A', 71.03711379),
    Residue::new('S', 87.03202841),
    Residue::new('P', 97.05276385),
    Residue::new('V', 99.06841391),
    Residue::new('T', 101.04767847),
    Residue::new('C', 103.00918478),
    Residue::new('L', 113.08406398),
    Residue::new('I', 113.08406398),
    Residue::new('N', 114.04292744),
    Residue::new('D', 115.02694303),
    Residue::new('Q', 128.05857751),
    Residue::new('K', 128.09496302),
    Residue::new('E', 129.04259309),
    Residue::new('M', 131.04048491),
    Residue::new('H', 137.05891186),
    Residue::new('F', 147.06841391),
    Residue::new('R', 156.10111103),
    Residue::new('Y', 163.06332853),
    Residue::new('W', 186.07931295),
];

pub fn standard_residues() -> Vec<Residue> {
    STANDARD_RESIDUES.to_vec()
}

/// Maps residue masses to the residues carrying them, sorted by mass so that
/// a mass gap can be explained with a bounded range scan.
#[derive(Debug, Clone, Default)]
pub struct ResidueMassIndex {
    /// Distinct masses in ascending order, each with every residue of that mass
    masses: Vec<(f64, Vec<Residue>)>,
    by_symbol: HashMap<char, f64>,
}

impl ResidueMassIndex {
    pub fn new(alphabet: &[Residue]) -> Self {
        let mut masses: Vec<(f64, Vec<Residue>)> = Vec::with_capacity(alphabet.len());
        let mut by_symbol = HashMap::with_capacity(alphabet.len());
        for residue in alphabet {
            by_symbol.insert(residue.symbol.to_ascii_uppercase(), residue.mass);
            match masses.iter_mut().find(|(m, _)| *m == residue.mass) {
                Some((_, bucket)) => bucket.push(*residue),
                None => masses.push((residue.mass, vec![*residue])),
            }
        }
        masses.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { masses, by_symbol }
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// The mass of the lightest residue in the alphabet
    pub fn lightest(&self) -> Option<f64> {
        self.masses.first().map(|(m, _)| *m)
    }

    /// The mass of the heaviest residue in the alphabet
    pub fn heaviest(&self) -> Option<f64> {
        self.masses.last().map(|(m, _)| *m)
    }

    /// Look up the internal mass of a residue symbol, ignoring case
    pub fn residue_mass(&self, symbol: char) -> Option<f64> {
        self.by_symbol.get(&symbol.to_ascii_uppercase()).copied()
    }

    /// Find every residue whose mass explains the gap between `l` and `r` after
    /// adding or removing `iso_offset` neutron shifts.
    ///
    /// The tolerance is `ppm` parts-per-million of the larger mass, doubled since both
    /// ends of the gap carry their own measurement error. Equal masses never explain a
    /// residue and yield an empty list.
    pub fn candidates(&self, l: f64, r: f64, ppm: f64, iso_offset: usize) -> Vec<Residue> {
        let mut acc = Vec::new();
        if l == r {
            return acc;
        }
        let iso_mass = (iso_offset as f64 * NEUTRON_SHIFT).abs();
        let gap = (r - l).abs();
        let diff1 = (gap - iso_mass).abs();
        let diff2 = gap + iso_mass;
        let abs_tol = l.max(r) * ppm / 1e6 * 2.0;

        let start = self.masses.partition_point(|(m, _)| *m < diff1 - abs_tol);
        for (mass, residues) in self.masses[start..].iter() {
            if (diff1 - mass).abs() < abs_tol || (diff2 - mass).abs() < abs_tol {
                acc.extend(residues.iter().copied());
            } else if mass - diff2 > abs_tol {
                break;
            }
        }
        acc
    }

    /// The full monoisotopic mass of a residue chain, including the terminal water.
    ///
    /// Symbols not in the alphabet (e.g. `X`) contribute nothing. An empty chain, or one
    /// made only of unknown symbols, weighs zero.
    pub fn sequence_mass(&self, sequence: &str) -> f64 {
        self.chain_mass(sequence.chars())
    }

    /// As [`ResidueMassIndex::sequence_mass`], over any stream of residue symbols
    pub fn chain_mass<I: IntoIterator<Item = char>>(&self, chain: I) -> f64 {
        let mut known = false;
        let residues: f64 = chain
            .into_iter()
            .filter_map(|c| self.residue_mass(c))
            .inspect(|_| known = true)
            .sum();
        if known {
            residues + WATER_MASS
        } else {
            0.0
        }
    }
}

impl From<&[Residue]> for ResidueMassIndex {
    fn from(value: &[Residue]) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn symbols(residues: &[Residue]) -> Vec<char> {
        residues.iter().map(|r| r.symbol).collect()
    }

    #[test]
    fn test_every_residue_explains_its_own_gap() {
        let index = ResidueMassIndex::new(&STANDARD_RESIDUES);
        for base in [50.0, 1000.0, 12000.0] {
            for residue in STANDARD_RESIDUES.iter() {
                let hits = index.candidates(base, base + residue.mass, 5.0, 0);
                assert!(
                    symbols(&hits).contains(&residue.symbol),
                    "{} missing at {base}",
                    residue.symbol
                );
            }
        }
    }

    #[test]
    fn test_equal_masses_are_empty() {
        let index = ResidueMassIndex::new(&STANDARD_RESIDUES);
        assert!(index.candidates(500.0, 500.0, 10.0, 0).is_empty());
        assert!(index.candidates(500.0, 500.0, 10.0, 1).is_empty());
    }

    #[test]
    fn test_isotope_shifted_gap() {
        let index = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let w = STANDARD_RESIDUES[19];
        let hits = index.candidates(2000.0, 2000.0 + w.mass + NEUTRON_SHIFT, 5.0, 1);
        assert!(symbols(&hits).contains(&'W'));
        // Without the isotope allowance the same gap is unexplained
        let hits = index.candidates(2000.0, 2000.0 + w.mass + NEUTRON_SHIFT, 5.0, 0);
        assert!(!symbols(&hits).contains(&'W'));

        // A missing neutron is absorbed too
        let hits = index.candidates(2000.0, 2000.0 + w.mass - NEUTRON_SHIFT, 5.0, 1);
        assert!(symbols(&hits).contains(&'W'));
    }

    #[test]
    fn test_isobaric_residues_tie() {
        let index = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let hits = index.candidates(300.0, 300.0 + 113.08406398, 5.0, 0);
        let found = symbols(&hits);
        assert!(found.contains(&'L'));
        assert!(found.contains(&'I'));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_unexplained_gap() {
        let index = ResidueMassIndex::new(&STANDARD_RESIDUES);
        assert!(index.candidates(300.0, 340.0, 10.0, 0).is_empty());
        assert!(index.candidates(300.0, 600.0, 10.0, 0).is_empty());
    }

    #[test]
    fn test_sequence_mass() {
        let index = ResidueMassIndex::new(&STANDARD_RESIDUES);
        assert_eq!(index.sequence_mass(""), 0.0);
        assert_eq!(index.sequence_mass("XX"), 0.0);
        let gg = index.sequence_mass("GG");
        assert!((gg - (2.0 * 57.02146372 + WATER_MASS)).abs() < 1e-9);
        assert!((index.sequence_mass("GXG") - gg).abs() < 1e-9);
        assert_eq!(index.lightest(), Some(57.02146372));
        assert_eq!(index.heaviest(), Some(186.07931295));
    }
}
