use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use mztag::{ProteinHit, Tag, TaggingEngine};

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.5}")).unwrap_or_default()
}

pub const TAG_COLUMNS: [&str; 9] = [
    "sequence",
    "length",
    "score",
    "n_term_mass",
    "c_term_mass",
    "residue_scores",
    "masses",
    "scores",
    "scans",
];

pub fn write_tags<W: Write>(mut writer: W, tags: &[Tag]) -> io::Result<()> {
    writeln!(writer, "{}", TAG_COLUMNS.join("\t"))?;
    for tag in tags {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            tag.sequence,
            tag.len(),
            tag.score,
            format_optional(tag.n_term_mass),
            format_optional(tag.c_term_mass),
            (0..tag.len()).map(|i| tag.residue_score(i)).join(","),
            tag.masses.iter().map(|m| format!("{m:.5}")).join(","),
            tag.scores.iter().join(","),
            tag.scans.iter().join(","),
        )?;
    }
    Ok(())
}

pub const PROTEIN_COLUMNS: [&str; 9] = [
    "accession",
    "description",
    "length",
    "matched_aa",
    "coverage",
    "score",
    "is_decoy",
    "q_value",
    "tags",
];

/// Write the protein hits of `engine`, naming the tags each was matched by
pub fn write_protein_hits<W: Write>(mut writer: W, engine: &TaggingEngine) -> io::Result<()> {
    writeln!(writer, "{}", PROTEIN_COLUMNS.join("\t"))?;
    for hit in engine.protein_hits() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{:.4}\t{}\t{}\t{}\t{}",
            hit.accession,
            hit.description,
            hit.sequence.len(),
            hit.matched_aa,
            hit.coverage,
            hit.score,
            hit.is_decoy,
            hit.q_value.map(|q| q.to_string()).unwrap_or_default(),
            engine
                .tags_for_hit(hit)
                .into_iter()
                .map(|t| t.sequence.as_str())
                .join(","),
        )?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct TaggerOutput<'a> {
    pub tags: &'a [Tag],
    pub protein_hits: &'a [ProteinHit],
}

impl<'a> From<&'a TaggingEngine> for TaggerOutput<'a> {
    fn from(engine: &'a TaggingEngine) -> Self {
        Self {
            tags: engine.tags(),
            protein_hits: engine.protein_hits(),
        }
    }
}

pub fn write_json<W: Write>(writer: W, engine: &TaggingEngine) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, &TaggerOutput::from(engine))?;
    Ok(())
}

pub(crate) fn create_output(path: &Path) -> io::Result<io::BufWriter<fs::File>> {
    debug!("Writing {}", path.display());
    Ok(io::BufWriter::new(fs::File::create(path)?))
}
