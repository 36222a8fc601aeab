mod driver;
mod length_range;
mod mass_list;
mod write;

pub use driver::{MZTagger, MZTaggerError};
pub use length_range::{LengthRange, LengthRangeParseError};
pub use mass_list::{read_mass_list, read_mass_list_path, MassList};
pub use write::{write_json, write_protein_hits, write_tags, TaggerOutput};
