use std::fmt::Display;

/// A short run of residues read off a chain of mass gaps, with the mass left unexplained
/// on one side of it.
///
/// `masses`, `scores` and `scans` trace the nodes bracketing the residues in sequence
/// order, so a tag of length `n` carries `n + 1` entries. Exactly one of the two
/// flanking masses is set for tags produced by assembly. A tag without either flank
/// places no positional constraint on where it may match.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    pub sequence: String,
    pub n_term_mass: Option<f64>,
    pub c_term_mass: Option<f64>,
    pub masses: Vec<f64>,
    pub scores: Vec<i32>,
    pub scans: Vec<i32>,
    pub score: i32,
}

impl Tag {
    pub fn new(
        sequence: String,
        n_term_mass: Option<f64>,
        c_term_mass: Option<f64>,
        masses: Vec<f64>,
        scores: Vec<i32>,
        scans: Vec<i32>,
    ) -> Self {
        let score = scores.iter().sum();
        Self {
            sequence,
            n_term_mass,
            c_term_mass,
            masses,
            scores,
            scans,
            score,
        }
    }

    /// A bare tag with no node trace or flank, as used for matching known sequences
    pub fn from_sequence(sequence: &str) -> Self {
        Self::new(sequence.to_string(), None, None, Vec::new(), Vec::new(), Vec::new())
    }

    /// The number of residues in the tag
    pub fn len(&self) -> usize {
        self.sequence.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Whichever flank mass is set, N-terminal first
    pub fn flanking_mass(&self) -> Option<f64> {
        self.n_term_mass.or(self.c_term_mass)
    }

    pub fn is_n_terminal(&self) -> bool {
        self.n_term_mass.is_some()
    }

    /// The score credited to residue `i`, the weaker of the two nodes it spans.
    ///
    /// Tags without a node trace credit their total score to every residue.
    pub fn residue_score(&self, i: usize) -> i32 {
        match (self.scores.get(i), self.scores.get(i + 1)) {
            (Some(a), Some(b)) => *a.min(b),
            (Some(a), None) => *a,
            _ => self.score,
        }
    }

    /// The same residues read from the other terminus
    pub fn reversed(&self) -> Self {
        let mut masses = self.masses.clone();
        masses.reverse();
        let mut scores = self.scores.clone();
        scores.reverse();
        let mut scans = self.scans.clone();
        scans.reverse();
        Self {
            sequence: self.sequence.chars().rev().collect(),
            n_term_mass: self.c_term_mass,
            c_term_mass: self.n_term_mass,
            masses,
            scores,
            scans,
            score: self.score,
        }
    }

    /// The hashable identity of this tag
    pub fn key(&self) -> TagKey {
        TagKey {
            sequence: self.sequence.clone(),
            n_term_mass: self.n_term_mass.map(f64::to_bits),
            c_term_mass: self.c_term_mass.map(f64::to_bits),
            masses: self.masses.iter().map(|m| m.to_bits()).collect(),
            scores: self.scores.clone(),
            scans: self.scans.clone(),
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.n_term_mass, self.c_term_mass) {
            (Some(n), _) => write!(f, "[{n:.4}]-{} ({})", self.sequence, self.score),
            (None, Some(c)) => write!(f, "{}-[{c:.4}] ({})", self.sequence, self.score),
            (None, None) => write!(f, "{} ({})", self.sequence, self.score),
        }
    }
}

/// Full equality over a [`Tag`]'s sequence, flanks and node trace, with masses compared
/// bit for bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagKey {
    sequence: String,
    n_term_mass: Option<u64>,
    c_term_mass: Option<u64>,
    masses: Vec<u64>,
    scores: Vec<i32>,
    scans: Vec<i32>,
}
