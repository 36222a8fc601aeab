//! Protein database entries and the hits tag matching produces for them.
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One sequence from a protein database
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProteinEntry {
    pub accession: String,
    pub description: String,
    pub sequence: String,
}

impl ProteinEntry {
    pub fn new(accession: String, description: String, sequence: String) -> Self {
        Self {
            accession,
            description,
            sequence,
        }
    }

    pub fn is_decoy(&self, decoy_prefix: &str) -> bool {
        !decoy_prefix.is_empty() && self.accession.starts_with(decoy_prefix)
    }

    fn from_header(header: &str) -> Self {
        let header = header.trim_start_matches('>').trim();
        let (accession, description) = match header.split_once(char::is_whitespace) {
            Some((accession, description)) => (accession, description.trim()),
            None => (header, ""),
        };
        Self::new(accession.to_string(), description.to_string(), String::new())
    }
}

/// Read FASTA formatted protein entries from `reader`.
///
/// Sequence lines are concatenated and upper-cased with whitespace removed. Lines before
/// the first header and entries with an empty sequence are ignored, so malformed input
/// reads as fewer (possibly zero) entries rather than failing. Only read errors are
/// reported.
pub fn read_fasta<R: BufRead>(reader: R) -> io::Result<Vec<ProteinEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<ProteinEntry> = None;

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            if let Some(entry) = current.take() {
                if !entry.sequence.is_empty() {
                    entries.push(entry);
                }
            }
            current = Some(ProteinEntry::from_header(&line));
        } else if let Some(entry) = current.as_mut() {
            entry.sequence.extend(
                line.chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .map(|c| c.to_ascii_uppercase()),
            );
        }
    }
    if let Some(entry) = current {
        if !entry.sequence.is_empty() {
            entries.push(entry);
        }
    }
    Ok(entries)
}

pub fn read_fasta_path<P: AsRef<Path>>(path: P) -> io::Result<Vec<ProteinEntry>> {
    let handle = fs::File::open(path.as_ref())?;
    read_fasta(BufReader::new(handle))
}

/// A database protein consistent with one or more tags
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProteinHit {
    pub accession: String,
    pub description: String,
    pub sequence: String,
    /// The number of non-wildcard residues covered by at least one matching tag
    pub matched_aa: usize,
    /// `matched_aa` as a fraction of the sequence length
    pub coverage: f64,
    /// The sum over covered residues of the best residue score any tag gave it
    pub score: i32,
    pub is_decoy: bool,
    /// `None` when the database carried no decoys to estimate it from
    pub q_value: Option<f64>,
    /// The indices of the tags that matched this protein
    pub tag_indices: Vec<usize>,
}

impl ProteinHit {
    pub fn new(entry: &ProteinEntry, matched_aa: usize, score: i32, is_decoy: bool) -> Self {
        let coverage = if entry.sequence.is_empty() {
            0.0
        } else {
            matched_aa as f64 / entry.sequence.len() as f64
        };
        Self {
            accession: entry.accession.clone(),
            description: entry.description.clone(),
            sequence: entry.sequence.clone(),
            matched_aa,
            coverage,
            score,
            is_decoy,
            q_value: None,
            tag_indices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_fasta() -> io::Result<()> {
        let text = "\
junk before any header
>sp|P1|ONE First protein
ABCDE
fghik
>DECOY_sp|P1|ONE
KIHGF EDCBA
>empty

>P3";
        let entries = read_fasta(text.as_bytes())?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].accession, "sp|P1|ONE");
        assert_eq!(entries[0].description, "First protein");
        assert_eq!(entries[0].sequence, "ABCDEFGHIK");
        assert_eq!(entries[1].sequence, "KIHGFEDCBA");
        assert!(entries[1].is_decoy("DECOY"));
        assert!(!entries[0].is_decoy("DECOY"));
        assert!(!entries[0].is_decoy(""));

        assert!(read_fasta("".as_bytes())?.is_empty());
        assert!(read_fasta("no headers\nat all\n".as_bytes())?.is_empty());
        Ok(())
    }

    #[test]
    fn test_hit_coverage() {
        let entry = ProteinEntry::new("P".into(), String::new(), "ABCDEFGHIK".into());
        let hit = ProteinHit::new(&entry, 3, 12, false);
        assert_eq!(hit.coverage, 0.3);
        assert_eq!(hit.q_value, None);
    }
}
