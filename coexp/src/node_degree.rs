//! Node-degree statistics: per-gene summaries of how many and how
//! significant a gene's coexpression links are, rank-normalized against
//! the whole gene population.

use crate::records::{GeneId, NodeDegree};
use coexp_util::stats;
use dashmap::DashMap;
use log::info;

/// Buffers per-gene intermediates until the whole population is in, then
/// applies the global rank transform.
///
/// `add_gene` may be called from parallel workers; `finalize` is the
/// single-threaded reduce and must run only after every gene is added.
#[derive(Default)]
pub struct NodeDegreeEngine {
    intermediates: DashMap<GeneId, NodeDegree>,
}

impl NodeDegreeEngine {
    pub fn new() -> Self {
        NodeDegreeEngine {
            intermediates: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.intermediates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intermediates.is_empty()
    }

    /// Record one gene's per-dataset relative expression ranks (values in
    /// (0,1]) and its stored-link count.
    ///
    /// Returns false and records nothing when `ranks` is empty: a gene
    /// with no tested datasets is excluded from node-degree output.
    pub fn add_gene(&self, gene: GeneId, ranks: &[f64], num_links: usize) -> bool {
        if ranks.is_empty() {
            return false;
        }

        // the per-dataset ranks are treated as uniform-under-null
        // observations; combined significance via Fisher's method
        let record = NodeDegree {
            gene,
            num_tests: ranks.len(),
            num_links,
            median: stats::median(ranks),
            mad: stats::mad(ranks),
            pvalue: stats::fisher_combine(ranks),
            distribution: stats::distribution_string(ranks),
            rank: 0.0,
            rank_by_num_links: 0.0,
        };

        self.intermediates.insert(gene, record);
        true
    }

    /// Global finalization barrier: rank-transform p-values and raw link
    /// counts across every buffered gene, normalized to `(0, 1]`.
    ///
    /// Smaller p-values and larger link counts receive larger normalized
    /// ranks. Ties share their fractional average rank. Output is sorted
    /// by gene id.
    pub fn finalize(self) -> Vec<NodeDegree> {
        let mut records: Vec<NodeDegree> = self
            .intermediates
            .into_iter()
            .map(|(_, record)| record)
            .collect();
        records.sort_by_key(|r| r.gene);

        if records.is_empty() {
            return records;
        }

        info!("finalizing node degree for {} genes", records.len());

        // negate so the most significant (smallest) p-value ranks highest
        let neg_pvalues: Vec<f64> = records.iter().map(|r| -r.pvalue).collect();
        let link_counts: Vec<f64> = records.iter().map(|r| r.num_links as f64).collect();

        let pvalue_ranks = stats::rank_transform(&neg_pvalues);
        let link_ranks = stats::rank_transform(&link_counts);

        let m = records.len() as f64;
        for (i, record) in records.iter_mut().enumerate() {
            record.rank = pvalue_ranks[i] / m;
            record.rank_by_num_links = link_ranks[i] / m;
        }

        records
    }
}
