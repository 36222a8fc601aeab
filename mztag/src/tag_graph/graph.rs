use std::collections::{HashMap, HashSet};

use identity_hash::BuildIdentityHasher;
use tracing::debug;

use crate::nodes::MassNode;
use crate::residues::ResidueMassIndex;

use super::vertex::{Vertex, VertexId, VertexSpace};

/// What an edge between two vertices stands for when reading a tag off a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// A single residue (possibly isotope shifted) spelled between two nodes
    Residue,
    /// The heaviest node handing a path over to the node its tag ends at
    Sink,
    /// A node whose remaining mass down to the anchor is left unexplained
    Flank,
}

/// The layered tag graph for one target tag length.
///
/// Edges point from heavier to lighter nodes, towards the universal source. Only
/// vertices that can already reach the source receive incoming edges, so every stored
/// edge lies on at least one complete path.
#[derive(Debug)]
pub struct TagGraph {
    space: VertexSpace,
    target_length: usize,
    adjacency: HashMap<VertexId, Vec<VertexId>, BuildIdentityHasher<VertexId>>,
    reachable: HashSet<VertexId, BuildIdentityHasher<VertexId>>,
    /// Residue symbols explaining the gap between (heavier, lighter) node pairs.
    /// Upper case for exact matches, lower case for isotope shifted ones.
    edge_residues: HashMap<(usize, usize), Vec<char>>,
    edge_count: usize,
}

impl TagGraph {
    fn empty(space: VertexSpace, target_length: usize) -> Self {
        let mut reachable = HashSet::default();
        if let Some(source) = space.encode(Vertex::source()) {
            reachable.insert(source);
        }
        Self {
            space,
            target_length,
            adjacency: HashMap::default(),
            reachable,
            edge_residues: HashMap::new(),
            edge_count: 0,
        }
    }

    /// Construct the graph over `nodes`, which must start with the zero-mass anchor and
    /// be sorted by ascending mass.
    ///
    /// Node pairs further apart than `max_edge_mass`, plus the residue matching
    /// tolerance, are never compared.
    #[tracing::instrument(level = "debug", skip(nodes, residues, space))]
    pub fn build(
        nodes: &[MassNode],
        residues: &ResidueMassIndex,
        space: VertexSpace,
        target_length: usize,
        max_edge_mass: f64,
        ppm: f64,
    ) -> Self {
        debug_assert_eq!(nodes.len(), space.node_count());
        debug_assert!(target_length <= space.max_level());
        let mut graph = Self::empty(space, target_length);
        if nodes.len() < 2 {
            return graph;
        }

        let last_index = nodes.len() - 1;
        let last_score = nodes[last_index].score;
        let max_iso = space.max_isotope_errors();
        let mut start_index = 1;

        for end_index in 1..nodes.len() {
            let r = nodes[end_index].mass;
            let edge_score = nodes[end_index].score;

            graph.connect(Vertex::new(end_index, edge_score, 0, 0), Vertex::source());

            // Gaps are matched to residues within twice the ppm error of the heavier mass
            let window = max_edge_mass + 2.0 * ppm * r / 1e6;
            while start_index < end_index && r - nodes[start_index].mass > window {
                start_index += 1;
            }

            // At most one isotope error per residue
            for n in 0..=max_iso.min(1) {
                for current_index in start_index..end_index {
                    let l = nodes[current_index].mass;
                    let found = residues.candidates(l, r, ppm, n);
                    if found.is_empty() {
                        continue;
                    }

                    let symbols = graph
                        .edge_residues
                        .entry((end_index, current_index))
                        .or_default();
                    symbols.extend(found.iter().map(|res| {
                        if n == 0 {
                            res.symbol.to_ascii_uppercase()
                        } else {
                            res.symbol.to_ascii_lowercase()
                        }
                    }));

                    for g in 0..=(max_iso - n) {
                        for level in 0..target_length {
                            graph.connect_score_band(
                                edge_score,
                                |score| Vertex::new(end_index, score, level + 1, g + n),
                                |score| Vertex::new(current_index, score, level, g),
                            );
                        }
                    }
                }
            }

            if end_index < last_index {
                for g in 0..=max_iso {
                    graph.connect_score_band(
                        last_score,
                        |score| Vertex::new(last_index, score, target_length, g),
                        |score| Vertex::new(end_index, score, target_length, g),
                    );
                }
            }
        }

        debug!(
            "Built tag graph for length {target_length} with {} nodes, {} edges and {} reachable vertices",
            nodes.len(),
            graph.edge_count,
            graph.reachable.len()
        );
        graph
    }

    /// Add an edge from `from(score)` to `to(score - edge_score)` for every score that keeps
    /// both ends inside the score band.
    fn connect_score_band<F: Fn(i32) -> Vertex, T: Fn(i32) -> Vertex>(
        &mut self,
        edge_score: i32,
        from: F,
        to: T,
    ) {
        let min_score = self.space.min_score();
        let max_score = self.space.max_score();
        let lowest = min_score.max(min_score + edge_score);
        let highest = max_score.min(max_score + edge_score);
        for score in lowest..=highest {
            self.connect(from(score), to(score - edge_score));
        }
    }

    fn connect(&mut self, from: Vertex, to: Vertex) -> bool {
        let (Some(from), Some(to)) = (self.space.encode(from), self.space.encode(to)) else {
            return false;
        };
        if !self.reachable.contains(&to) {
            return false;
        }
        self.adjacency.entry(from).or_default().push(to);
        self.edge_count += 1;
        self.reachable.insert(from);
        true
    }

    pub fn space(&self) -> &VertexSpace {
        &self.space
    }

    pub fn target_length(&self) -> usize {
        self.target_length
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn source(&self) -> VertexId {
        // The source is always inside the space since the score band contains 0
        self.space.encode(Vertex::source()).unwrap_or_default()
    }

    /// The vertices of the heaviest node at the target length carrying `score`, one
    /// per isotope error count.
    pub fn sinks(&self, score: i32) -> impl Iterator<Item = VertexId> + '_ {
        let last_index = self.space.node_count().saturating_sub(1);
        (0..=self.space.max_isotope_errors()).filter_map(move |g| {
            self.space
                .encode(Vertex::new(last_index, score, self.target_length, g))
        })
    }

    pub fn neighbors(&self, vertex: VertexId) -> &[VertexId] {
        self.adjacency
            .get(&vertex)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    pub fn is_reachable(&self, vertex: VertexId) -> bool {
        self.reachable.contains(&vertex)
    }

    /// The residue symbols explaining the gap from node `higher` down to node `lower`
    pub fn edge_residues(&self, higher: usize, lower: usize) -> Option<&[char]> {
        self.edge_residues
            .get(&(higher, lower))
            .map(|v| v.as_slice())
    }

    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (*from, *to)))
    }

    pub fn edge_kind(&self, from: VertexId, to: VertexId) -> EdgeKind {
        let from = self.space.decode(from);
        let to = self.space.decode(to);
        if to.index == 0 {
            EdgeKind::Flank
        } else if from.level == to.level + 1 {
            EdgeKind::Residue
        } else {
            EdgeKind::Sink
        }
    }
}
