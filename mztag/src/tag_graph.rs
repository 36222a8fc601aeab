//! A layered directed acyclic graph over observed masses whose paths spell out
//! amino acid sequence tags.
mod graph;
mod paths;
mod vertex;

pub use graph::{EdgeKind, TagGraph};
pub use paths::PathEnumerator;
pub use vertex::{Vertex, VertexId, VertexSpace};
