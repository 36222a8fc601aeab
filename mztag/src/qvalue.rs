//! Target-decoy q-value estimation for protein hits.
use crate::protein::ProteinHit;

/// The ratio of decoy to target entries in a database of `total` entries, `decoys` of
/// which are decoys. `None` when either side is empty.
pub fn decoy_multiplier(decoys: usize, total: usize) -> Option<f64> {
    if decoys == 0 || total <= decoys {
        return None;
    }
    Some(decoys as f64 / (total - decoys) as f64)
}

/// Assign q-values to `hits`, which must be sorted by descending score.
///
/// Each decoy counts `1 / decoy_multiplier` towards the running decoy total, so a database
/// with more decoys than targets is not over-penalized. The running ratio is then made
/// monotonic from the lowest scoring hit upwards, starting from 1. Without a multiplier
/// every q-value is cleared.
pub fn assign_q_values(hits: &mut [ProteinHit], decoy_multiplier: Option<f64>) {
    let Some(multiplier) = decoy_multiplier else {
        hits.iter_mut().for_each(|hit| hit.q_value = None);
        return;
    };

    let mut cumulative_target = 0.0;
    let mut cumulative_decoy = 0.0;
    for hit in hits.iter_mut() {
        if hit.is_decoy {
            cumulative_decoy += 1.0 / multiplier;
        } else {
            cumulative_target += 1.0;
        }
        hit.q_value = Some(cumulative_decoy / (cumulative_target + cumulative_decoy));
    }

    let mut min_q_value: f64 = 1.0;
    for hit in hits.iter_mut().rev() {
        if let Some(q) = hit.q_value {
            min_q_value = min_q_value.min(q);
        }
        hit.q_value = Some(min_q_value);
    }
}
