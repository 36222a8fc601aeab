use std::collections::HashSet;

use identity_hash::BuildIdentityHasher;

use super::graph::TagGraph;
use super::vertex::VertexId;

/// Depth-first enumeration of the paths through a [`TagGraph`].
///
/// Paths are produced in adjacency order, so repeated runs over the same graph yield
/// the same paths in the same order.
#[derive(Debug)]
pub struct PathEnumerator<'a> {
    graph: &'a TagGraph,
    visited: HashSet<VertexId, BuildIdentityHasher<VertexId>>,
    path: Vec<VertexId>,
}

impl<'a> PathEnumerator<'a> {
    pub fn new(graph: &'a TagGraph) -> Self {
        Self {
            graph,
            visited: HashSet::default(),
            path: Vec::with_capacity(graph.target_length() + 3),
        }
    }

    /// Append every path from `start` to `destination` to `all_paths`, stopping as soon as
    /// `all_paths` holds `max_count` paths, including any it held on entry.
    ///
    /// Returns the number of paths added.
    pub fn find_all_paths(
        &mut self,
        start: VertexId,
        destination: VertexId,
        all_paths: &mut Vec<Vec<VertexId>>,
        max_count: usize,
    ) -> usize {
        let before = all_paths.len();
        self.visited.clear();
        self.path.clear();
        self.visit(start, destination, all_paths, max_count);
        all_paths.len() - before
    }

    fn visit(
        &mut self,
        current: VertexId,
        destination: VertexId,
        all_paths: &mut Vec<Vec<VertexId>>,
        max_count: usize,
    ) {
        if all_paths.len() >= max_count {
            return;
        }
        self.visited.insert(current);
        self.path.push(current);

        if current == destination {
            all_paths.push(self.path.clone());
        } else {
            let graph = self.graph;
            for next in graph.neighbors(current) {
                if !self.visited.contains(next) {
                    self.visit(*next, destination, all_paths, max_count);
                }
            }
        }

        self.visited.remove(&current);
        self.path.pop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nodes::MassNode;
    use crate::residues::{ResidueMassIndex, STANDARD_RESIDUES};
    use crate::tag_graph::{EdgeKind, VertexSpace};

    fn graph_for(scores: &[i32], residues: &str, length: usize) -> TagGraph {
        let index = ResidueMassIndex::new(&STANDARD_RESIDUES);
        let mut nodes = vec![MassNode::anchor()];
        let mut mass = 500.0;
        nodes.push(MassNode::new(mass, scores[0], 1));
        for (c, score) in residues.chars().zip(scores[1..].iter()) {
            mass += index.residue_mass(c).unwrap();
            nodes.push(MassNode::new(mass, *score, 1));
        }
        let max_score = scores.iter().max().copied().unwrap() * 7;
        let space = VertexSpace::new(nodes.len(), 5, 0, 0, max_score);
        TagGraph::build(
            &nodes,
            &index,
            space,
            length,
            index.heaviest().unwrap(),
            10.0,
        )
    }

    #[test]
    fn test_path_scores_are_conserved() {
        let graph = graph_for(&[3, 1, 4, 1, 5, 9], "WYHAT", 3);
        let space = *graph.space();
        let mut total = 0;
        for score in (space.min_score()..=space.max_score()).rev() {
            let mut all_paths = Vec::new();
            for sink in graph.sinks(score) {
                PathEnumerator::new(&graph).find_all_paths(
                    sink,
                    graph.source(),
                    &mut all_paths,
                    100,
                );
            }
            for path in all_paths.iter() {
                total += 1;
                assert_eq!(*path.last().unwrap(), graph.source());
                let spent: i32 = path
                    .windows(2)
                    .map(|w| space.decode(w[0]).score - space.decode(w[1]).score)
                    .sum();
                assert_eq!(spent, score - space.decode(*path.last().unwrap()).score);
                let residues = path
                    .windows(2)
                    .filter(|w| graph.edge_kind(w[0], w[1]) == EdgeKind::Residue)
                    .count();
                assert_eq!(residues, 3);
            }
        }
        // Three residue windows fit in a five residue ladder
        assert_eq!(total, 3);
    }

    #[test]
    fn test_max_count_bounds_enumeration() {
        let graph = graph_for(&[1, 1, 1, 1, 1, 1, 1], "GGGGGG", 2);
        let mut all_paths = Vec::new();
        let mut enumerator = PathEnumerator::new(&graph);
        // Every 2-residue window sums to the same score
        for sink in graph.sinks(4) {
            enumerator.find_all_paths(sink, graph.source(), &mut all_paths, 2);
        }
        assert_eq!(all_paths.len(), 2);

        let mut again = Vec::new();
        for sink in graph.sinks(4) {
            enumerator.find_all_paths(sink, graph.source(), &mut again, 2);
        }
        assert_eq!(all_paths, again);
    }

    #[test]
    fn test_unreachable_start() {
        let graph = graph_for(&[1, 1], "G", 3);
        let mut all_paths = Vec::new();
        for score in 0..=7 {
            for sink in graph.sinks(score) {
                PathEnumerator::new(&graph).find_all_paths(
                    sink,
                    graph.source(),
                    &mut all_paths,
                    10,
                );
            }
        }
        assert!(all_paths.is_empty());
    }
}
