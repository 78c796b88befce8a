//! Bounding of result sets to a caller-supplied edge budget.

use crate::merge::MergedLink;
use crate::records::GeneId;
use fnv::FnvHashMap as HashMap;

/// Outcome of one trim pass. Transient, recomputed per query.
#[derive(Debug, Clone)]
pub struct TrimResult {
    pub kept: Vec<MergedLink>,
    /// The stringency consistent with what was actually returned; never
    /// below the starting stringency.
    pub effective_stringency: usize,
}

/// Trim a sorted result list down to roughly `max_edges` links.
///
/// `results` must already be sorted descending by support key. A single
/// forward pass keeps links meeting the current threshold; the moment the
/// budget fills, the threshold escalates (once) to the support level of
/// the link that filled it. Links after the crossing point at that same
/// support level are still kept, so the output may slightly exceed
/// `max_edges`. That overshoot is intended: it keeps the effective
/// stringency meaningful as "every returned link has at least this much
/// support".
pub fn trim(results: &[MergedLink], max_edges: usize, start_stringency: usize) -> TrimResult {
    let mut kept = Vec::with_capacity(results.len().min(max_edges + 1));
    let mut threshold = start_stringency;

    for r in results {
        if r.support_key() >= threshold {
            kept.push(r.clone());
        }
        if threshold == start_stringency && kept.len() >= max_edges {
            threshold = r.support_key();
        }
    }

    TrimResult {
        kept,
        effective_stringency: threshold,
    }
}

/// Sort links the way the trimmer expects: support key descending, found
/// gene id ascending on ties, so output is deterministic.
pub fn sort_for_trim(results: &mut [MergedLink]) {
    results.sort_by(|a, b| {
        b.support_key()
            .cmp(&a.support_key())
            .then(a.found_gene.cmp(&b.found_gene))
            .then(a.query_gene.cmp(&b.query_gene))
    });
}

/// Drop per-gene summaries whose gene no longer appears on either side
/// of a kept link.
pub fn prune_gene_summaries<T>(kept: &[MergedLink], summaries: &mut HashMap<GeneId, T>) {
    let mut alive = fnv::FnvHashSet::default();
    for link in kept {
        alive.insert(link.query_gene);
        alive.insert(link.found_gene);
    }
    summaries.retain(|gene, _| alive.contains(gene));
}
