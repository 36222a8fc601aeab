//! Observed masses from upstream deconvolution and their preparation for graph
//! construction.
use mzpeaks::{CoordinateLike, Mass, Tolerance};
use tracing::debug;

/// One deconvolved mass from a spectrum, carrying an integer quality score and the
/// scan it was observed in.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassNode {
    pub mass: f64,
    pub score: i32,
    pub scan: i32,
}

impl MassNode {
    pub fn new(mass: f64, score: i32, scan: i32) -> Self {
        Self { mass, score, scan }
    }

    /// The synthetic zero-mass anchor every tag path starts from
    pub const fn anchor() -> Self {
        Self {
            mass: 0.0,
            score: 0,
            scan: 0,
        }
    }
}

impl CoordinateLike<Mass> for MassNode {
    fn coordinate(&self) -> f64 {
        self.mass
    }
}

/// A deconvolved mass whose quality is still a probability-like value in `[0, 1]`
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakGroup {
    pub mass: f64,
    pub quality: f64,
    pub scan: i32,
}

impl PeakGroup {
    pub fn new(mass: f64, quality: f64, scan: i32) -> Self {
        Self {
            mass,
            quality,
            scan,
        }
    }
}

/// Convert quality values into integer log-ratio scores.
///
/// The random hit probability is the mean of the `top_n` best qualities, and each
/// quality `q` becomes `round(10 * log10(q / (1 - p)))`, with both terms floored at
/// `1e-6`.
pub fn scores_from_quality(qualities: &[f64], top_n: usize) -> Vec<i32> {
    if qualities.is_empty() {
        return Vec::new();
    }
    let mut ranked = qualities.to_vec();
    ranked.sort_by(|a, b| b.total_cmp(a));
    let top = &ranked[..top_n.clamp(1, ranked.len())];
    let random_hit_prob = top.iter().sum::<f64>() / top.len() as f64;
    let denominator = (1.0 - random_hit_prob).max(1e-6);

    qualities
        .iter()
        .map(|q| (10.0 * (q / denominator).max(1e-6).log10()).round() as i32)
        .collect()
}

/// Convert [`PeakGroup`]s into [`MassNode`]s, scoring them with [`scores_from_quality`].
pub fn nodes_from_peak_groups(groups: &[PeakGroup], top_n: usize) -> Vec<MassNode> {
    let qualities: Vec<f64> = groups.iter().map(|g| g.quality).collect();
    let scores = scores_from_quality(&qualities, top_n);
    groups
        .iter()
        .zip(scores)
        .map(|(g, score)| MassNode::new(g.mass, score, g.scan))
        .collect()
}

/// Combine the masses from several spectra into one mass-sorted list, collapsing entries
/// that lie within `ppm` of one another onto the best scoring of them. Scan numbers
/// travel with the surviving entry.
pub fn merge_spectra<I: IntoIterator<Item = Vec<MassNode>>>(spectra: I, ppm: f64) -> Vec<MassNode> {
    let mut all: Vec<MassNode> = spectra.into_iter().flatten().collect();
    all.sort_by(|a, b| a.coordinate().total_cmp(&b.coordinate()));
    let tolerance = Tolerance::PPM(ppm);

    let mut acc: Vec<MassNode> = Vec::with_capacity(all.len());
    for node in all {
        match acc.last_mut() {
            Some(last) if tolerance.test(node.coordinate(), last.coordinate()) => {
                if node.score > last.score {
                    *last = node;
                }
            }
            _ => acc.push(node),
        }
    }
    debug!("Merged spectra into {} masses", acc.len());
    acc
}

/// Build the node list a tag graph is constructed over: the zero-mass anchor followed by
/// the input masses in ascending order.
///
/// Masses at or below zero are dropped, the anchor takes their place. When at least
/// `max_node_count` masses remain, only those scoring at or above the `max_node_count`-th
/// best score are kept, so ties may carry the list past the ceiling.
pub fn prepare_graph_nodes(nodes: &[MassNode], max_node_count: usize) -> Vec<MassNode> {
    let mut acc = Vec::with_capacity(nodes.len().min(max_node_count) + 1);
    acc.push(MassNode::anchor());
    let nodes: Vec<MassNode> = nodes.iter().filter(|n| n.mass > 0.0).copied().collect();
    if nodes.is_empty() {
        return acc;
    }

    let threshold = if nodes.len() >= max_node_count && max_node_count > 0 {
        let mut scores: Vec<i32> = nodes.iter().map(|n| n.score).collect();
        scores.sort_unstable_by(|a, b| b.cmp(a));
        let threshold = scores[max_node_count - 1];
        debug!(
            "Limiting {} masses to the best {max_node_count} with score threshold {threshold}",
            nodes.len()
        );
        threshold
    } else {
        nodes.iter().map(|n| n.score).min().unwrap_or_default()
    };

    acc.extend(nodes.iter().filter(|n| n.score >= threshold).copied());
    acc[1..].sort_by(|a, b| a.coordinate().total_cmp(&b.coordinate()));
    acc
}
