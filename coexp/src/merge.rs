//! Resolution of direction collisions: the same unordered gene pair can
//! surface twice for one query gene, once per sign, because each analysis
//! direction contributes its own signed aggregate.

use crate::records::{GeneId, LinkSign};
use coexp_util::errors::CoexError;
use fnv::FnvHashMap as HashMap;

/// One stored link after query-time re-expansion against the caller's
/// dataset filter: counts only, bit-vectors already decoded and filtered.
#[derive(Debug, Clone)]
pub struct ExpandedLink {
    pub found_gene: GeneId,
    pub sign: LinkSign,
    /// Supporting datasets surviving the filter.
    pub support: usize,
    /// Supporting datasets with gene-specific probes.
    pub specific_support: usize,
    pub num_tested_in: usize,
}

/// A gene pair with both signs folded into one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedLink {
    pub query_gene: GeneId,
    pub found_gene: GeneId,
    pub pos_support: usize,
    pub neg_support: usize,
    /// Positive support that came from non-specific probes.
    pub nonspec_pos_support: usize,
    pub nonspec_neg_support: usize,
    pub num_tested_in: usize,
}

impl MergedLink {
    /// Sort/trim key: the dominant sign's support.
    pub fn support_key(&self) -> usize {
        self.pos_support.max(self.neg_support)
    }
}

fn apply_sign(merged: &mut MergedLink, link: &ExpandedLink) {
    let nonspecific = link.support.saturating_sub(link.specific_support);
    match link.sign {
        LinkSign::Positive => {
            merged.pos_support = link.support;
            merged.nonspec_pos_support = nonspecific;
        }
        LinkSign::Negative => {
            merged.neg_support = link.support;
            merged.nonspec_neg_support = nonspecific;
        }
    }
}

/// Fold a query gene's expanded links into one record per found gene.
///
/// The second occurrence of a pair must carry the opposite sign of the
/// first; its counts overwrite that sign's fields (the newer observation
/// was computed under the caller's dataset filter) and `num_tested_in`
/// becomes the max of the two. Any further occurrence, or a repeat of an
/// already-recorded sign, is an aggregation invariant violation and
/// fails with [`CoexError::InconsistentState`].
pub fn merge_opposite_signs(
    query_gene: GeneId,
    links: &[ExpandedLink],
) -> Result<Vec<MergedLink>, CoexError> {
    let mut merged: Vec<MergedLink> = Vec::with_capacity(links.len());
    let mut seen: HashMap<GeneId, (usize, Vec<LinkSign>)> = HashMap::default();

    for link in links {
        match seen.get_mut(&link.found_gene) {
            None => {
                let mut record = MergedLink {
                    query_gene,
                    found_gene: link.found_gene,
                    pos_support: 0,
                    neg_support: 0,
                    nonspec_pos_support: 0,
                    nonspec_neg_support: 0,
                    num_tested_in: link.num_tested_in,
                };
                apply_sign(&mut record, link);
                merged.push(record);
                seen.insert(link.found_gene, (merged.len() - 1, vec![link.sign]));
            }
            Some((idx, signs)) => {
                if signs.contains(&link.sign) {
                    return Err(CoexError::InconsistentState(format!(
                        "pair ({}, {}) seen again with already-recorded sign {}",
                        query_gene, link.found_gene, link.sign
                    )));
                }
                let record = &mut merged[*idx];
                apply_sign(record, link);
                record.num_tested_in = record.num_tested_in.max(link.num_tested_in);
                signs.push(link.sign);
            }
        }
    }

    Ok(merged)
}
