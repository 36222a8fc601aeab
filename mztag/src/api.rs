//! * High level APIs for generating sequence tags and matching them to proteins
use std::path::Path;

use itertools::Itertools;
use tracing::{debug, info};

use crate::{
    assemble::{TagAssembler, TagCollection},
    matcher::{self, ProteinMatcher},
    nodes::{merge_spectra, nodes_from_peak_groups, prepare_graph_nodes, MassNode, PeakGroup},
    params::{
        check_range, check_tolerance, ParameterError, TaggerError, TaggerParams, MAX_NODE_SCORE,
    },
    protein::{read_fasta_path, ProteinEntry, ProteinHit},
    residues::{ResidueMassIndex, NEUTRON_SHIFT},
    tag::Tag,
    tag_graph::{PathEnumerator, TagGraph, VertexSpace},
};

/// A single-shot tagging operation on the provided masses.
///
/// # Arguments
/// - `nodes`: The deconvolved masses of the spectrum, with their integer scores and scans
/// - `params`: The run configuration, validated before anything else is done
/// - `ppm`: The mass accuracy used to explain gaps between masses with residues
///
/// # See also
/// [`TaggingEngine::run`]
pub fn generate_tags(
    nodes: &[MassNode],
    params: TaggerParams,
    ppm: f64,
) -> Result<Vec<Tag>, ParameterError> {
    let mut engine = TaggingEngine::new(params)?;
    engine.run(nodes, ppm)?;
    Ok(engine.tags)
}

/// The lowest and highest path scores a tag graph over vertex scores `scores` must
/// represent.
///
/// Paths carry up to `max_length + 2` node scores, so the band spans that many copies of
/// the extreme vertex scores. Vertex scores include the anchor's 0, so the band always
/// contains 0. Scores beyond [`MAX_NODE_SCORE`] in magnitude are rejected, as is a band
/// that does not fit in an `i32`.
pub fn path_score_band(
    scores: &[i32],
    min_length: usize,
    max_length: usize,
) -> Result<(i32, i32), ParameterError> {
    let max_vertex = scores.iter().copied().max().unwrap_or_default().max(0);
    let min_vertex = scores.iter().copied().min().unwrap_or_default().min(0);
    let bound = MAX_NODE_SCORE as f64;
    check_range("node score", min_vertex as f64, -bound, bound)?;
    check_range("node score", max_vertex as f64, -bound, bound)?;

    let long = i64::try_from(max_length)
        .unwrap_or(i64::MAX)
        .saturating_add(2);
    let short = i64::try_from(min_length)
        .unwrap_or(i64::MAX)
        .saturating_sub(2);
    let (max_vertex, min_vertex) = (max_vertex as i64, min_vertex as i64);
    let max_path = max_vertex
        .saturating_mul(long)
        .max(max_vertex.saturating_mul(short));
    let min_path = min_vertex
        .saturating_mul(long)
        .min(min_vertex.saturating_mul(short));
    let to_score = |value: i64| {
        i32::try_from(value).map_err(|_| ParameterError::OutOfRange {
            name: "path score",
            value: value as f64,
            min: i32::MIN as f64,
            max: i32::MAX as f64,
        })
    };
    Ok((to_score(min_path)?, to_score(max_path)?))
}

/// A state-manager for tagging one spectrum at a time and matching the tags found to a
/// protein database, with a consistent set of parameters.
///
/// The engine keeps the results of the most recent run so they can be cross-referenced
/// with [`TaggingEngine::hits_for_tag`] and [`TaggingEngine::tags_for_hit`].
#[derive(Debug, Clone)]
pub struct TaggingEngine {
    params: TaggerParams,
    residues: ResidueMassIndex,
    /// The widest gap a single, possibly isotope shifted, residue can explain
    max_edge_mass: f64,
    score_band: (i32, i32),
    tags: Vec<Tag>,
    protein_hits: Vec<ProteinHit>,
    /// For each tag, the indices of the protein hits it matched
    tag_hits: Vec<Vec<usize>>,
}

impl TaggingEngine {
    /// Create a new [`TaggingEngine`], rejecting invalid parameters before any work is done
    pub fn new(params: TaggerParams) -> Result<Self, ParameterError> {
        params.validate()?;
        let residues = ResidueMassIndex::new(&params.residues);
        let max_edge_mass = residues.heaviest().unwrap_or_default()
            + params.max_iso_error_count as f64 * NEUTRON_SHIFT;
        Ok(Self {
            params,
            residues,
            max_edge_mass,
            score_band: (0, 0),
            tags: Vec::new(),
            protein_hits: Vec::new(),
            tag_hits: Vec::new(),
        })
    }

    pub fn params(&self) -> &TaggerParams {
        &self.params
    }

    pub fn residues(&self) -> &ResidueMassIndex {
        &self.residues
    }

    /// The path score band of the most recent run
    pub fn score_band(&self) -> (i32, i32) {
        self.score_band
    }

    fn clear(&mut self) {
        self.tags.clear();
        self.protein_hits.clear();
        self.tag_hits.clear();
        self.score_band = (0, 0);
    }

    /// Generate tags from `nodes`, replacing the results of any previous run.
    ///
    /// Each tag length from `min_length` to `max_length` gets its own graph, searched from
    /// the highest path score down until `max_tag_count` tags of that length are found.
    /// Duplicate suppression is shared across lengths. The kept tags are sorted by
    /// descending score, ties in the order they were found.
    ///
    /// # Arguments
    /// - `nodes`: The deconvolved masses of the spectrum, with their integer scores and scans
    /// - `ppm`: The mass accuracy used to explain gaps between masses with residues
    #[tracing::instrument(level = "debug", skip(self, nodes), fields(node_count = nodes.len()))]
    pub fn run(&mut self, nodes: &[MassNode], ppm: f64) -> Result<&[Tag], ParameterError> {
        check_tolerance("ppm", ppm)?;
        self.clear();
        let max_tag_count = self.params.max_tag_count;
        if max_tag_count == 0 {
            debug!("Tag generation is disabled");
            return Ok(&self.tags);
        }

        let nodes = prepare_graph_nodes(nodes, self.params.max_node_count);
        if nodes.len() < 2 {
            return Ok(&self.tags);
        }

        let scores: Vec<i32> = nodes.iter().map(|n| n.score).collect();
        let (min_score, max_score) =
            path_score_band(&scores, self.params.min_length, self.params.max_length)?;
        self.score_band = (min_score, max_score);
        debug!(
            "Searching {} masses with path scores from {min_score} to {max_score}",
            nodes.len()
        );

        let space = VertexSpace::new(
            nodes.len(),
            self.params.max_length,
            self.params.max_iso_error_count,
            min_score,
            max_score,
        );

        let mut collection = TagCollection::new();
        for length in self.params.min_length..=self.params.max_length {
            let graph = TagGraph::build(
                &nodes,
                &self.residues,
                space,
                length,
                self.max_edge_mass,
                ppm,
            );
            let assembler =
                TagAssembler::new(&graph, &nodes, self.params.max_sequence_expansion);
            let mut enumerator = PathEnumerator::new(&graph);

            let mut score = max_score;
            while score >= min_score && collection.count_with_length(length) < max_tag_count {
                let mut all_paths = Vec::new();
                for sink in graph.sinks(score) {
                    enumerator.find_all_paths(sink, graph.source(), &mut all_paths, max_tag_count);
                }
                for path in all_paths.iter() {
                    assembler.update(&mut collection, path, ppm);
                }
                score -= 1;
            }
        }

        let collected = collection.into_tags();
        let mut tags = Vec::with_capacity(collected.len());
        for length in self.params.min_length..=self.params.max_length {
            let before = tags.len();
            tags.extend(
                collected
                    .iter()
                    .filter(|t| t.len() == length)
                    .sorted_by(|a, b| b.score.cmp(&a.score))
                    .take(max_tag_count)
                    .cloned(),
            );
            info!("Tag count with length {length}: {}", tags.len() - before);
        }
        tags.sort_by(|a, b| b.score.cmp(&a.score));
        self.tags = tags;
        Ok(&self.tags)
    }

    /// Score `groups` from their qualities and generate tags from them
    pub fn run_peak_groups(
        &mut self,
        groups: &[PeakGroup],
        ppm: f64,
    ) -> Result<&[Tag], ParameterError> {
        let nodes = nodes_from_peak_groups(groups, self.params.max_node_count);
        self.run(&nodes, ppm)
    }

    /// Merge the masses of several spectra of the same analyte and generate tags from
    /// the result
    pub fn run_spectra<I: IntoIterator<Item = Vec<MassNode>>>(
        &mut self,
        spectra: I,
        ppm: f64,
    ) -> Result<&[Tag], ParameterError> {
        check_tolerance("ppm", ppm)?;
        let nodes = merge_spectra(spectra, ppm);
        self.run(&nodes, ppm)
    }

    /// Use `tags` in place of generated ones for the next matching run
    pub fn set_tags(&mut self, mut tags: Vec<Tag>) {
        self.clear();
        tags.sort_by(|a, b| b.score.cmp(&a.score));
        self.tags = tags;
    }

    /// Match the current tags against `proteins`, replacing any previous hits
    #[tracing::instrument(level = "debug", skip_all, fields(protein_count = proteins.len()))]
    pub fn run_matching(&mut self, proteins: &[ProteinEntry]) -> &[ProteinHit] {
        self.protein_hits.clear();
        self.tag_hits = vec![Vec::new(); self.tags.len()];
        if self.tags.is_empty() || proteins.is_empty() {
            return &self.protein_hits;
        }
        let matcher = ProteinMatcher::new(&self.tags, &self.residues, &self.params);
        let result = matcher.match_proteins(proteins);
        info!(
            "Matched {} protein hits ({} decoys)",
            result.hits.len(),
            result.hits.iter().filter(|h| h.is_decoy).count()
        );
        self.protein_hits = result.hits;
        self.tag_hits = result.tag_hits;
        &self.protein_hits
    }

    /// Read a FASTA database from `path` and match the current tags against it
    pub fn run_matching_fasta<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<&[ProteinHit], TaggerError> {
        let proteins = read_fasta_path(path)?;
        debug!("Read {} proteins", proteins.len());
        Ok(self.run_matching(&proteins))
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn protein_hits(&self) -> &[ProteinHit] {
        &self.protein_hits
    }

    pub fn tag_index(&self, tag: &Tag) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }

    pub fn hit_index(&self, hit: &ProteinHit) -> Option<usize> {
        self.protein_hits.iter().position(|h| h == hit)
    }

    /// The protein hits `tag` matched, best first
    pub fn hits_for_tag(&self, tag: &Tag) -> Vec<&ProteinHit> {
        self.tag_index(tag)
            .and_then(|i| self.tag_hits.get(i))
            .map(|hits| hits.iter().map(|j| &self.protein_hits[*j]).collect())
            .unwrap_or_default()
    }

    /// The tags that matched `hit`, best first
    pub fn tags_for_hit(&self, hit: &ProteinHit) -> Vec<&Tag> {
        self.hit_index(hit)
            .map(|i| {
                self.protein_hits[i]
                    .tag_indices
                    .iter()
                    .map(|j| &self.tags[*j])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every offset in `hit`'s sequence where `tag` occurs, allowing one `X`
    pub fn matched_positions(&self, hit: &ProteinHit, tag: &Tag) -> Vec<usize> {
        matcher::matched_positions(&hit.sequence, tag)
    }
}
