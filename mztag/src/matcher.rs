//! Matching tags against a protein database and estimating the false discovery rate
//! of the resulting protein hits.
use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use crate::params::TaggerParams;
use crate::protein::{ProteinEntry, ProteinHit};
use crate::qvalue::{assign_q_values, decoy_multiplier};
use crate::residues::ResidueMassIndex;
use crate::tag::Tag;

const WILDCARD: u8 = b'X';

/// Find the first position at or after `from` where `needle` occurs in `haystack`, letting
/// at most one `X` in `haystack` stand in for any residue.
pub fn find_with_wildcard(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (from..=(haystack.len() - needle.len())).find(|i| {
        let mut wildcards = 0;
        haystack[*i..*i + needle.len()]
            .iter()
            .zip(needle.iter())
            .all(|(h, n)| {
                if *h == WILDCARD {
                    wildcards += 1;
                    wildcards <= 1
                } else {
                    h == n
                }
            })
    })
}

/// Every position, overlapping ones included, where `needle` occurs exactly in `haystack`
fn find_exact(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i)
        .collect()
}

fn find_all_with_wildcard(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(i) = find_with_wildcard(haystack, needle, from) {
        positions.push(i);
        from = i + 1;
    }
    positions
}

/// Every position in `sequence`, including the first, where `tag` matches allowing one
/// `X` in the sequence
pub fn matched_positions(sequence: &str, tag: &Tag) -> Vec<usize> {
    let haystack = sequence.to_ascii_uppercase();
    let needle = tag.sequence.to_ascii_uppercase();
    find_all_with_wildcard(haystack.as_bytes(), needle.as_bytes())
}

/// The accepted protein hits of one matching run, best first, with the cross-references
/// between them and the tags they were matched with.
#[derive(Debug, Default, Clone)]
pub struct MatchResult {
    pub hits: Vec<ProteinHit>,
    /// For each tag, the indices of the hits it matched
    pub tag_hits: Vec<Vec<usize>>,
}

/// The outcome of matching every tag against one protein
#[derive(Debug, Default)]
struct ProteinMatch {
    hit: Option<ProteinHit>,
    /// The lowest score of any tag that matched, whether or not the protein was accepted
    min_tag_score: Option<i32>,
}

/// Matches a fixed, score-sorted list of [`Tag`]s against protein sequences.
#[derive(Debug)]
pub struct ProteinMatcher<'a> {
    tags: &'a [Tag],
    residues: &'a ResidueMassIndex,
    params: &'a TaggerParams,
    /// Per tag, the range of residue counts its flanking mass could stand for
    windows: Vec<Option<(usize, usize)>>,
}

impl<'a> ProteinMatcher<'a> {
    pub fn new(tags: &'a [Tag], residues: &'a ResidueMassIndex, params: &'a TaggerParams) -> Self {
        let windows = tags
            .iter()
            .map(|tag| Self::search_window(tag, residues, params.flanking_mass_tol))
            .collect();
        Self {
            tags,
            residues,
            params,
            windows,
        }
    }

    /// The fewest and most residues that could make up `tag`'s flanking mass, give or take
    /// `tolerance`, with the upper bound padded by the tag's own length.
    fn search_window(
        tag: &Tag,
        residues: &ResidueMassIndex,
        tolerance: f64,
    ) -> Option<(usize, usize)> {
        let flanking_mass = tag.flanking_mass()?;
        let heaviest = residues.heaviest()?;
        let lightest = residues.lightest()?;
        let start = ((flanking_mass - tolerance).floor() / heaviest).max(0.0) as usize;
        let end = ((flanking_mass + tolerance).ceil() / lightest).max(0.0) as usize + tag.len() + 1;
        Some((start, end))
    }

    /// The slice of a sequence of `length` residues that `tag` may occur in, as an offset
    /// and a span
    fn region(&self, tag_index: usize, length: usize) -> (usize, usize) {
        let tag = &self.tags[tag_index];
        match self.windows[tag_index] {
            Some((start, end)) => {
                let offset = if tag.is_n_terminal() {
                    start
                } else {
                    length.saturating_sub(1).saturating_sub(end)
                };
                let offset = offset.min(length);
                let span = (end - start).min(length - offset);
                (offset, span)
            }
            None => (0, length),
        }
    }

    /// Whether the residues outside a match at `position` weigh what the tag's flank says
    fn flanks_agree(&self, sequence: &[u8], tag: &Tag, position: usize) -> bool {
        let tolerance = self.params.flanking_mass_tol;
        if let Some(n_term_mass) = tag.n_term_mass {
            let mass = self
                .residues
                .chain_mass(sequence[..position].iter().map(|b| *b as char));
            if (n_term_mass - mass).abs() > tolerance {
                return false;
            }
        }
        let end = position + tag.len();
        if let Some(c_term_mass) = tag.c_term_mass {
            if end < sequence.len() {
                let mass = self
                    .residues
                    .chain_mass(sequence[end..].iter().map(|b| *b as char));
                if (c_term_mass - mass).abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }

    fn match_protein(
        &self,
        entry: &ProteinEntry,
        is_decoy: bool,
        min_tag_score: Option<i32>,
    ) -> ProteinMatch {
        let sequence = entry.sequence.to_ascii_uppercase();
        let sequence = sequence.as_bytes();
        let mut position_scores: BTreeMap<usize, i32> = BTreeMap::new();
        let mut matched_tags = Vec::new();
        let mut lowest_matched: Option<i32> = None;

        for (tag_index, tag) in self.tags.iter().enumerate() {
            if let Some(threshold) = min_tag_score {
                if tag.score < threshold {
                    continue;
                }
            }
            let needle = tag.sequence.to_ascii_uppercase();
            let needle = needle.as_bytes();
            if needle.is_empty() || needle.iter().all(|c| *c == WILDCARD) {
                continue;
            }

            let (offset, span) = self.region(tag_index, sequence.len());
            if span < needle.len() {
                continue;
            }
            let window = &sequence[offset..offset + span];

            let mut positions = find_exact(window, needle);
            if positions.is_empty() && window.contains(&WILDCARD) {
                positions = find_all_with_wildcard(window, needle);
            }

            let mut matched = false;
            for position in positions.into_iter().map(|p| p + offset) {
                if !self.flanks_agree(sequence, tag, position) {
                    continue;
                }
                for i in 0..needle.len() {
                    let score = tag.residue_score(i);
                    position_scores
                        .entry(position + i)
                        .and_modify(|s| *s = (*s).max(score))
                        .or_insert(score);
                }
                matched = true;
            }

            if matched {
                matched_tags.push(tag_index);
                lowest_matched = Some(lowest_matched.map_or(tag.score, |s| s.min(tag.score)));
            }
        }

        let mut result = ProteinMatch {
            hit: None,
            min_tag_score: lowest_matched,
        };
        if matched_tags.is_empty() {
            return result;
        }

        let (matched_aa, score) = position_scores
            .iter()
            .filter(|(pos, _)| sequence[**pos] != WILDCARD)
            .fold((0usize, 0i32), |(count, total), (_, score)| {
                (count + 1, total + score)
            });
        if matched_aa < self.params.min_matched_aa {
            return result;
        }
        let mut hit = ProteinHit::new(entry, matched_aa, score, is_decoy);
        hit.tag_indices = matched_tags;
        result.hit = Some(hit);
        result
    }

    /// Match every tag against `proteins`, assign q-values and keep the hits that pass the
    /// FDR threshold.
    ///
    /// Targets are matched first. Decoys are then matched only with tags scoring at least
    /// as well as the weakest tag that matched a target, so that decoys compete on the
    /// same footing; when no tag matched a target, decoys are not matched at all.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn match_proteins(&self, proteins: &[ProteinEntry]) -> MatchResult {
        let prefix = self.params.decoy_prefix.as_str();
        let decoy_count = proteins.iter().filter(|p| p.is_decoy(prefix)).count();

        let targets: Vec<ProteinMatch> = proteins
            .par_iter()
            .filter(|p| !p.is_decoy(prefix))
            .map(|p| self.match_protein(p, false, None))
            .collect();

        let threshold = targets.iter().filter_map(|m| m.min_tag_score).min();
        let decoys: Vec<ProteinMatch> = match threshold {
            Some(threshold) if decoy_count > 0 => proteins
                .par_iter()
                .filter(|p| p.is_decoy(prefix))
                .map(|p| self.match_protein(p, true, Some(threshold)))
                .collect(),
            _ => Vec::new(),
        };

        let mut hits: Vec<ProteinHit> = targets
            .into_iter()
            .chain(decoys)
            .filter_map(|m| m.hit)
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.accession.cmp(&b.accession))
        });

        let multiplier = decoy_multiplier(decoy_count, proteins.len());
        assign_q_values(&mut hits, multiplier);

        debug!(
            "{} candidate protein hits from {} proteins ({decoy_count} decoys), decoy multiplier {multiplier:?}",
            hits.len(),
            proteins.len()
        );

        hits.retain(|hit| self.is_reported(hit));

        let mut tag_hits = vec![Vec::new(); self.tags.len()];
        for (hit_index, hit) in hits.iter().enumerate() {
            for tag_index in hit.tag_indices.iter() {
                tag_hits[*tag_index].push(hit_index);
            }
        }

        MatchResult { hits, tag_hits }
    }

    fn is_reported(&self, hit: &ProteinHit) -> bool {
        if hit.is_decoy {
            return self.params.keep_decoy;
        }
        hit.q_value.map_or(true, |q| q <= self.params.fdr)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::residues::STANDARD_RESIDUES;

    fn entry(accession: &str, sequence: &str) -> ProteinEntry {
        ProteinEntry::new(accession.into(), String::new(), sequence.into())
    }

    #[test]
    fn test_find_with_wildcard() {
        let haystack = b"PEPXIDEPEPTIDE";
        assert_eq!(find_with_wildcard(haystack, b"PEPT", 0), Some(0));
        assert_eq!(find_with_wildcard(haystack, b"PEPT", 1), Some(7));
        assert_eq!(find_with_wildcard(haystack, b"QID", 0), Some(3));
        assert_eq!(find_with_wildcard(b"AXXA", b"AQQA", 0), None);
        assert_eq!(find_with_wildcard(b"AB", b"ABC", 0), None);
        assert_eq!(find_exact(b"AAAA", b"AA"), vec![0, 1, 2]);

        let tag = Tag::from_sequence("pep");
        assert_eq!(matched_positions("PEPXIDEPEPTIDE", &tag), vec![0, 7]);
    }

    #[test]
    fn test_wildcard_only_without_exact_match() {
        let residues = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let params = TaggerParams {
            min_matched_aa: 2,
            ..Default::default()
        };
        let tags = vec![Tag::from_sequence("GAS")];
        let matcher = ProteinMatcher::new(&tags, &residues, &params);

        let result = matcher.match_proteins(&[entry("P1", "KKGXSKKGASKK")]);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].matched_aa, 3);

        let result = matcher.match_proteins(&[entry("P1", "KKGXSKK")]);
        assert_eq!(result.hits.len(), 1);
        // The wildcard position is not counted as covered
        assert_eq!(result.hits[0].matched_aa, 2);

        let params = TaggerParams {
            min_matched_aa: 3,
            ..Default::default()
        };
        let matcher = ProteinMatcher::new(&tags, &residues, &params);
        assert!(matcher
            .match_proteins(&[entry("P1", "KKGXSKK")])
            .hits
            .is_empty());
    }

    #[test]
    fn test_flank_must_agree() {
        let residues = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let params = TaggerParams {
            min_matched_aa: 3,
            flanking_mass_tol: 1.0,
            ..Default::default()
        };
        let prefix = residues.sequence_mass("MKK");
        let tag = |mass: f64| {
            Tag::new(
                "GAS".into(),
                Some(mass),
                None,
                vec![0.0; 4],
                vec![2, 3, 4, 5],
                vec![0; 4],
            )
        };
        let proteins = [entry("P1", "MKKGASWWWW")];

        let tags = vec![tag(prefix)];
        let result = ProteinMatcher::new(&tags, &residues, &params).match_proteins(&proteins);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].score, 2 + 3 + 4);
        assert_eq!(result.hits[0].tag_indices, vec![0]);
        assert_eq!(result.tag_hits, vec![vec![0]]);

        let tags = vec![tag(prefix + 20.0)];
        let result = ProteinMatcher::new(&tags, &residues, &params).match_proteins(&proteins);
        assert!(result.hits.is_empty());
        assert_eq!(result.tag_hits, vec![Vec::<usize>::new()]);
    }

    #[test]
    fn test_c_terminal_flank() {
        let residues = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let params = TaggerParams {
            min_matched_aa: 3,
            flanking_mass_tol: 1.0,
            ..Default::default()
        };
        let suffix = residues.sequence_mass("WWK");
        let tags = vec![Tag::new(
            "GAS".into(),
            None,
            Some(suffix),
            vec![0.0; 4],
            vec![1; 4],
            vec![0; 4],
        )];
        let matcher = ProteinMatcher::new(&tags, &residues, &params);
        assert_eq!(
            matcher
                .match_proteins(&[entry("P1", "MKKGASWWK")])
                .hits
                .len(),
            1
        );
        assert!(matcher
            .match_proteins(&[entry("P1", "MKKGASWWKWWK")])
            .hits
            .is_empty());
    }

    #[test]
    fn test_overlapping_tags_take_best_score() {
        let residues = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let params = TaggerParams {
            min_matched_aa: 4,
            ..Default::default()
        };
        let mut gas = Tag::from_sequence("GAS");
        gas.score = 5;
        let mut asp = Tag::from_sequence("ASP");
        asp.score = 2;
        let tags = vec![gas, asp];
        let result = ProteinMatcher::new(&tags, &residues, &params)
            .match_proteins(&[entry("P1", "KGASPK")]);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].matched_aa, 4);
        assert_eq!(result.hits[0].score, 5 * 3 + 2);
        assert_eq!(result.tag_hits, vec![vec![0], vec![0]]);
    }

    #[test]
    fn test_decoys_and_fdr() {
        let residues = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let params = TaggerParams {
            min_matched_aa: 3,
            fdr: 0.01,
            ..Default::default()
        };
        let mut strong = Tag::from_sequence("WWW");
        strong.score = 10;
        let mut middle = Tag::from_sequence("HHH");
        middle.score = 5;
        let mut weak = Tag::from_sequence("GGG");
        weak.score = 1;
        let tags = vec![strong, middle, weak];
        let proteins = [
            entry("T1", "KWWWK"),
            entry("T2", "HHHKWWW"),
            entry("DECOY_A", "KGGGK"),
            entry("DECOY_B", "KHHHR"),
        ];
        let result = ProteinMatcher::new(&tags, &residues, &params).match_proteins(&proteins);
        let accessions: Vec<&str> = result.hits.iter().map(|h| h.accession.as_str()).collect();
        assert_eq!(accessions, ["T2", "T1"]);
        assert_eq!(result.hits[0].score, 45);
        assert!(result.hits.iter().all(|h| h.q_value == Some(0.0)));
        assert_eq!(result.tag_hits, vec![vec![0, 1], vec![0], vec![]]);

        let params = TaggerParams {
            keep_decoy: true,
            ..params
        };
        let result = ProteinMatcher::new(&tags, &residues, &params).match_proteins(&proteins);
        // GGG scores below every tag that matched a target, so it never reaches DECOY_A
        assert_eq!(result.hits.len(), 3);
        assert!(result.hits[2].is_decoy);
        assert_eq!(result.hits[2].accession, "DECOY_B");
        assert!((result.hits[2].q_value.unwrap() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_decoys() {
        let residues = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let params = TaggerParams {
            min_matched_aa: 3,
            fdr: 0.01,
            ..Default::default()
        };
        let tags = vec![Tag::from_sequence("WWW")];
        let result = ProteinMatcher::new(&tags, &residues, &params)
            .match_proteins(&[entry("T1", "KWWWK")]);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].q_value, None);

        assert!(ProteinMatcher::new(&tags, &residues, &params)
            .match_proteins(&[])
            .hits
            .is_empty());
    }
}
