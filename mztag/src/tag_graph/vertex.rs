use std::fmt::Display;

/// The dense integer identifier of a [`Vertex`] within a [`VertexSpace`]
pub type VertexId = u64;

/// A state in the tag graph: which node a path has reached, the score accumulated
/// getting there, how many residues it has spelled and how many isotope errors it
/// has absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vertex {
    pub index: usize,
    pub score: i32,
    pub level: usize,
    pub isotope_errors: usize,
}

impl Vertex {
    pub fn new(index: usize, score: i32, level: usize, isotope_errors: usize) -> Self {
        Self {
            index,
            score,
            level,
            isotope_errors,
        }
    }

    /// The universal source, the zero-mass anchor with nothing spelled
    pub const fn source() -> Self {
        Self {
            index: 0,
            score: 0,
            level: 0,
            isotope_errors: 0,
        }
    }

    pub fn is_source(&self) -> bool {
        *self == Self::source()
    }
}

impl Display for Vertex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, score={}, level={}, iso={})",
            self.index, self.score, self.level, self.isotope_errors
        )
    }
}

/// The bounded space of [`Vertex`] values for one graph, and the bijection between
/// them and [`VertexId`].
///
/// The encoding nests node index, level, isotope error count and score, with score
/// varying fastest, so every vertex of a node occupies one contiguous block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexSpace {
    node_count: usize,
    max_level: usize,
    max_isotope_errors: usize,
    min_score: i32,
    max_score: i32,
}

impl VertexSpace {
    pub fn new(
        node_count: usize,
        max_level: usize,
        max_isotope_errors: usize,
        min_score: i32,
        max_score: i32,
    ) -> Self {
        debug_assert!(
            min_score <= 0 && max_score >= 0,
            "The score band [{min_score}, {max_score}] must contain the source score 0"
        );
        Self {
            node_count,
            max_level,
            max_isotope_errors,
            min_score,
            max_score,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn max_isotope_errors(&self) -> usize {
        self.max_isotope_errors
    }

    pub fn min_score(&self) -> i32 {
        self.min_score
    }

    pub fn max_score(&self) -> i32 {
        self.max_score
    }

    fn score_width(&self) -> u64 {
        (self.max_score - self.min_score) as u64 + 1
    }

    /// The number of distinct vertices in this space
    pub fn len(&self) -> u64 {
        self.node_count as u64
            * (self.max_level as u64 + 1)
            * (self.max_isotope_errors as u64 + 1)
            * self.score_width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, vertex: &Vertex) -> bool {
        vertex.index < self.node_count
            && vertex.level <= self.max_level
            && vertex.isotope_errors <= self.max_isotope_errors
            && vertex.score >= self.min_score
            && vertex.score <= self.max_score
    }

    /// Map a vertex to its identifier, or `None` when it falls outside this space
    pub fn encode(&self, vertex: Vertex) -> Option<VertexId> {
        if !self.contains(&vertex) {
            return None;
        }
        let id = ((vertex.index as u64 * (self.max_level as u64 + 1) + vertex.level as u64)
            * (self.max_isotope_errors as u64 + 1)
            + vertex.isotope_errors as u64)
            * self.score_width()
            + (vertex.score - self.min_score) as u64;
        Some(id)
    }

    /// Recover only the node index of a vertex, all tag assembly strictly requires
    pub fn index_of(&self, id: VertexId) -> usize {
        (id / self.score_width()
            / (self.max_isotope_errors as u64 + 1)
            / (self.max_level as u64 + 1)) as usize
    }

    pub fn decode(&self, id: VertexId) -> Vertex {
        let width = self.score_width();
        let score = (id % width) as i32 + self.min_score;
        let rest = id / width;
        let isotope_errors = (rest % (self.max_isotope_errors as u64 + 1)) as usize;
        let rest = rest / (self.max_isotope_errors as u64 + 1);
        let level = (rest % (self.max_level as u64 + 1)) as usize;
        let index = (rest / (self.max_level as u64 + 1)) as usize;
        Vertex::new(index, score, level, isotope_errors)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encoding_is_dense_and_invertible() {
        let space = VertexSpace::new(4, 3, 1, -5, 7);
        assert_eq!(space.len(), 4 * 4 * 2 * 13);
        let mut seen = vec![false; space.len() as usize];
        for index in 0..4 {
            for level in 0..=3 {
                for iso in 0..=1 {
                    for score in -5..=7 {
                        let v = Vertex::new(index, score, level, iso);
                        let id = space.encode(v).unwrap();
                        assert!(!seen[id as usize]);
                        seen[id as usize] = true;
                        assert_eq!(space.decode(id), v);
                        assert_eq!(space.index_of(id), index);
                    }
                }
            }
        }
        assert!(seen.into_iter().all(|x| x));
    }

    #[test]
    fn test_out_of_range() {
        let space = VertexSpace::new(4, 3, 0, 0, 10);
        assert_eq!(space.encode(Vertex::source()), Some(0));
        assert!(space.encode(Vertex::new(4, 0, 0, 0)).is_none());
        assert!(space.encode(Vertex::new(1, 11, 0, 0)).is_none());
        assert!(space.encode(Vertex::new(1, -1, 0, 0)).is_none());
        assert!(space.encode(Vertex::new(1, 0, 4, 0)).is_none());
        assert!(space.encode(Vertex::new(1, 0, 0, 1)).is_none());
    }
}
