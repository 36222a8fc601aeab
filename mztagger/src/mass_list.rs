//! Reading deconvolved mass lists from tab-separated text.
use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use itertools::Itertools;

use mztag::nodes::nodes_from_peak_groups;
use mztag::{MassNode, PeakGroup};

use crate::driver::MZTaggerError;

/// The masses of one input file, with either integer scores or quality scores
/// still to be converted.
#[derive(Debug, Clone, PartialEq)]
pub enum MassList {
    Scored(Vec<MassNode>),
    Quality(Vec<PeakGroup>),
}

impl MassList {
    pub fn len(&self) -> usize {
        match self {
            MassList::Scored(nodes) => nodes.len(),
            MassList::Quality(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scan_count(&self) -> usize {
        match self {
            MassList::Scored(nodes) => nodes.iter().map(|n| n.scan).unique().count(),
            MassList::Quality(groups) => groups.iter().map(|g| g.scan).unique().count(),
        }
    }

    /// Split the masses into one list per scan, in order of scan number. Quality
    /// scores are converted over the whole list before splitting.
    pub fn into_spectra(self, top_n: usize) -> Vec<Vec<MassNode>> {
        let nodes = match self {
            MassList::Scored(nodes) => nodes,
            MassList::Quality(groups) => nodes_from_peak_groups(&groups, top_n),
        };
        nodes
            .into_iter()
            .into_group_map_by(|n| n.scan)
            .into_iter()
            .sorted_by_key(|(scan, _)| *scan)
            .map(|(_, nodes)| nodes)
            .collect()
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> MZTaggerError {
    MZTaggerError::MalformedLine {
        line,
        reason: reason.into(),
    }
}

/// Read `mass<TAB>score[<TAB>scan]` rows from `reader`.
///
/// Blank lines and lines starting with `#` are skipped, as is a leading header row
/// whose first column is `mass`. When `quality_scores` is set the second column is
/// read as a quality in `[0, 1]`, otherwise as an integer score.
pub fn read_mass_list<R: BufRead>(
    reader: R,
    quality_scores: bool,
) -> Result<MassList, MZTaggerError> {
    let mut nodes = Vec::new();
    let mut groups = Vec::new();
    let mut seen_data = false;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split('\t').map(str::trim);
        let mass_s = tokens.next().unwrap_or_default();
        if !seen_data && mass_s.eq_ignore_ascii_case("mass") {
            seen_data = true;
            continue;
        }
        seen_data = true;

        let mass: f64 = mass_s
            .parse()
            .map_err(|e| malformed(line_number, format!("invalid mass {mass_s:?}: {e}")))?;
        if !mass.is_finite() {
            return Err(malformed(line_number, format!("invalid mass {mass_s:?}")));
        }
        let score_s = tokens
            .next()
            .ok_or_else(|| malformed(line_number, "missing score column"))?;
        let scan: i32 = match tokens.next() {
            Some(scan_s) if !scan_s.is_empty() => scan_s
                .parse()
                .map_err(|e| malformed(line_number, format!("invalid scan {scan_s:?}: {e}")))?,
            _ => 0,
        };

        if quality_scores {
            let quality: f64 = score_s.parse().map_err(|e| {
                malformed(line_number, format!("invalid quality {score_s:?}: {e}"))
            })?;
            if !(0.0..=1.0).contains(&quality) {
                return Err(malformed(
                    line_number,
                    format!("quality {quality} is outside of [0, 1]"),
                ));
            }
            groups.push(PeakGroup::new(mass, quality, scan));
        } else {
            let score: i32 = score_s.parse().map_err(|e| {
                malformed(line_number, format!("invalid score {score_s:?}: {e}"))
            })?;
            nodes.push(MassNode::new(mass, score, scan));
        }
    }

    if quality_scores {
        Ok(MassList::Quality(groups))
    } else {
        Ok(MassList::Scored(nodes))
    }
}

pub fn read_mass_list_path<P: AsRef<Path>>(
    path: P,
    quality_scores: bool,
) -> Result<MassList, MZTaggerError> {
    let handle = fs::File::open(path.as_ref())?;
    read_mass_list(io::BufReader::new(handle), quality_scores)
}
