//! A basic demonstration of how to use [`mztag::TaggingEngine`].
//!
//! While functionally equivalent to [`mztag::generate_tags`], the [`TaggingEngine`]
//! type keeps its residue index and parameters between spectra, and remembers the
//! tags and protein hits of its last run so they can be cross-referenced.

use std::io;

use mztag::{
    protein::read_fasta, residues::STANDARD_RESIDUES, MassNode, ResidueMassIndex, TaggerParams,
    TaggingEngine,
};

const FASTA: &str = "\
>sp|P69905|HBA_HUMAN Hemoglobin subunit alpha
MVLSPADKTNVKAAWGKVGAHAGEYGAEALERMFLSFPTTKTYFPHFDLSHGSAQVKGHG
KKVADALTNAVAHVDDMPNALSALSDLHAHKLRVDPVNFKLLSHCLLVTLAAHLPAEFTP
AVHASLDKFLASVSTVLTSKYR
>DECOY_sp|P69905|HBA_HUMAN
RYKSTLVTSVSALFKDLSAHVAPTFEAPLHAALTVLLCHSLLKFNVPDVRLKHAHLDSLA
SLANPMDDVHAVANTLADAVKKGHGKVQASGHSLDFHPFYTKTTPFSLFMRELAEAGYEG
AHAGVKGWAAKVNTKDAPSLVM
";

fn main() -> io::Result<()> {
    // Build a ladder of prefix masses from the start of the sequence, as a stand-in
    // for the deconvolved fragment masses of a spectrum.
    let index = ResidueMassIndex::new(&STANDARD_RESIDUES);
    let mut mass = 0.0;
    let nodes: Vec<MassNode> = "MVLSPADKTNVKAAWGKVGAHAG"
        .chars()
        .enumerate()
        .filter_map(|(i, c)| {
            mass += index.residue_mass(c)?;
            Some(MassNode::new(mass, 5 + (i % 7) as i32, 1))
        })
        .collect();

    let params = TaggerParams {
        min_length: 4,
        max_length: 6,
        max_tag_count: 20,
        ..Default::default()
    };
    let mut engine = TaggingEngine::new(params).unwrap(); // The defaults are valid

    let tags = engine.run(&nodes, 10.0).unwrap();
    eprintln!("{} tags", tags.len());
    for tag in tags.iter().take(5) {
        eprintln!("{tag}");
    }

    let proteins = read_fasta(FASTA.as_bytes())?;
    let hits = engine.run_matching(&proteins).to_vec();
    for hit in hits.iter() {
        let tags = engine.tags_for_hit(hit);
        eprintln!(
            "{} covered {} residues ({:.2}%) with {} tags, q = {:?}",
            hit.accession,
            hit.matched_aa,
            hit.coverage * 100.0,
            tags.len(),
            hit.q_value
        );
        if let Some(tag) = tags.first() {
            eprintln!(
                "{} starts at {:?}",
                tag.sequence,
                engine.matched_positions(hit, tag)
            );
        }
    }
    Ok(())
}
