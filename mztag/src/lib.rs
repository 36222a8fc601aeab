pub mod residues;
pub mod nodes;
pub mod tag_graph;
pub mod tag;
pub mod assemble;
pub mod protein;
pub mod qvalue;
pub mod matcher;
pub mod params;
pub mod api;

pub use crate::api::{generate_tags, TaggingEngine};
pub use crate::nodes::{MassNode, PeakGroup};
pub use crate::params::{ParameterError, TaggerError, TaggerParams};
pub use crate::protein::{ProteinEntry, ProteinHit};
pub use crate::residues::{Residue, ResidueMassIndex};
pub use crate::tag::Tag;
