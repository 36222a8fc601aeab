//! Turning enumerated vertex paths into [`Tag`]s and collecting them without
//! near-duplicates.
use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::nodes::MassNode;
use crate::tag::{Tag, TagKey};
use crate::tag_graph::{EdgeKind, TagGraph, VertexId};

/// Whether two flanking masses agree within `ppm` of the larger of them
fn flanks_agree(a: f64, b: f64, ppm: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() / a.max(b) * 1e6 <= ppm
}

/// The tags collected over one run, with the per-sequence index used to suppress
/// tags whose flank repeats one already collected.
#[derive(Debug, Default, Clone)]
pub struct TagCollection {
    tags: Vec<Tag>,
    keys: HashSet<TagKey>,
    by_sequence: HashMap<String, Vec<usize>>,
    length_counts: HashMap<usize, usize>,
}

impl TagCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The number of collected tags with `length` residues
    pub fn count_with_length(&self, length: usize) -> usize {
        self.length_counts.get(&length).copied().unwrap_or_default()
    }

    /// Tags in the order they were collected
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn into_tags(self) -> Vec<Tag> {
        self.tags
    }

    /// Whether a tag with the same sequence already carries a flank on the same
    /// terminus within `ppm` of this one's
    pub fn is_represented(&self, tag: &Tag, ppm: f64) -> bool {
        if self.keys.contains(&tag.key()) {
            return true;
        }
        let Some(seen) = self.by_sequence.get(&tag.sequence) else {
            return false;
        };
        seen.iter().map(|i| &self.tags[*i]).any(|other| {
            let pair = if tag.is_n_terminal() {
                (tag.n_term_mass, other.n_term_mass)
            } else {
                (tag.c_term_mass, other.c_term_mass)
            };
            match pair {
                (Some(a), Some(b)) => flanks_agree(a, b, ppm),
                _ => false,
            }
        })
    }

    /// Add `tag` unless it is already represented. Returns whether it was added.
    pub fn insert(&mut self, tag: Tag, ppm: f64) -> bool {
        if self.is_represented(&tag, ppm) {
            return false;
        }
        let index = self.tags.len();
        self.keys.insert(tag.key());
        self.by_sequence
            .entry(tag.sequence.clone())
            .or_default()
            .push(index);
        *self.length_counts.entry(tag.len()).or_default() += 1;
        self.tags.push(tag);
        true
    }
}

/// Reads tags off the paths of one [`TagGraph`].
#[derive(Debug, Clone, Copy)]
pub struct TagAssembler<'a> {
    graph: &'a TagGraph,
    nodes: &'a [MassNode],
    max_expansion: usize,
}

impl<'a> TagAssembler<'a> {
    /// `nodes` must be the node list `graph` was built over. Each path expands into at most
    /// `max_expansion` sequences when its gaps are ambiguous.
    pub fn new(graph: &'a TagGraph, nodes: &'a [MassNode], max_expansion: usize) -> Self {
        Self {
            graph,
            nodes,
            max_expansion: max_expansion.max(1),
        }
    }

    /// Build the tags spelled by `path`, which runs from a sink down to the source.
    ///
    /// Every sequence the path spells yields a forward tag, with residues in ascending
    /// mass order and an N-terminal flank, followed by its reverse with a C-terminal flank.
    pub fn assemble(&self, path: &[VertexId]) -> Vec<Tag> {
        let space = self.graph.space();
        let mut sequences = vec![String::new()];
        let mut trace: Vec<MassNode> = Vec::with_capacity(path.len());
        let mut flanking_mass = None;

        for step in path.windows(2) {
            let higher = space.decode(step[0]);
            let lower = space.decode(step[1]);
            match self.graph.edge_kind(step[0], step[1]) {
                EdgeKind::Residue => {
                    let shifted = higher.isotope_errors > lower.isotope_errors;
                    let Some(symbols) = self.graph.edge_residues(higher.index, lower.index)
                    else {
                        continue;
                    };
                    let symbols: Vec<char> = symbols
                        .iter()
                        .copied()
                        .filter(|c| c.is_ascii_lowercase() == shifted)
                        .collect();
                    if symbols.is_empty() {
                        continue;
                    }
                    let mut expanded = Vec::with_capacity(
                        (sequences.len() * symbols.len()).min(self.max_expansion),
                    );
                    'expand: for seq in sequences.iter() {
                        for c in symbols.iter() {
                            if expanded.len() >= self.max_expansion {
                                break 'expand;
                            }
                            let mut next = String::with_capacity(seq.len() + 1);
                            next.push(*c);
                            next.push_str(seq);
                            expanded.push(next);
                        }
                    }
                    sequences = expanded;
                    trace.push(self.nodes[higher.index]);
                }
                EdgeKind::Flank => {
                    trace.push(self.nodes[higher.index]);
                    flanking_mass = Some(self.nodes[higher.index].mass);
                }
                EdgeKind::Sink => {}
            }
        }

        trace.reverse();
        let masses: Vec<f64> = trace.iter().map(|n| n.mass).collect();
        let scores: Vec<i32> = trace.iter().map(|n| n.score).collect();
        let scans: Vec<i32> = trace.iter().map(|n| n.scan).collect();

        let mut tags = Vec::with_capacity(sequences.len() * 2);
        for sequence in sequences {
            if sequence.is_empty() {
                continue;
            }
            let forward = Tag::new(
                sequence,
                flanking_mass,
                None,
                masses.clone(),
                scores.clone(),
                scans.clone(),
            );
            let reverse = forward.reversed();
            tags.push(forward);
            tags.push(reverse);
        }
        tags
    }

    /// Assemble `path` and add the resulting tags to `collection`, returning how many
    /// were new.
    pub fn update(&self, collection: &mut TagCollection, path: &[VertexId], ppm: f64) -> usize {
        let mut added = 0;
        for tag in self.assemble(path) {
            trace!("Assembled {tag}");
            if collection.insert(tag, ppm) {
                added += 1;
            }
        }
        added
    }
}
