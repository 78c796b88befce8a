//! Gene-pair link aggregation: turns raw per-dataset signed support into
//! canonical [`GenePairLink`] records, at most one per sign per pair.

use crate::records::{CandidateObservation, GeneId, GenePairLink, LinkSign};
use coexp_util::bitvec;
use coexp_util::dataset_order::DatasetOrder;
use coexp_util::errors::CoexError;
use dashmap::DashMap;
use fnv::FnvHashSet as HashSet;
use log::debug;
use std::sync::Arc;

/// Aggregation settings for one analysis run.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    /// Minimum number of supporting datasets for a link to be stored.
    /// Values below 1 are clamped to 1, never rejected.
    pub stringency: i64,
    /// Store each link under both genes (2x storage, one query for
    /// bidirectional lookup) instead of first-gene-wins deduplication.
    pub store_both_ways: bool,
}

impl AggregatorConfig {
    pub fn effective_stringency(&self) -> usize {
        self.stringency.max(1) as usize
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            stringency: 2,
            store_both_ways: true,
        }
    }
}

/// Aggregates one query gene's candidate observations into link records.
pub struct LinkAggregator<'a> {
    order: &'a DatasetOrder,
    config: AggregatorConfig,
    analysis_id: u64,
}

impl<'a> LinkAggregator<'a> {
    pub fn new(order: &'a DatasetOrder, config: AggregatorConfig, analysis_id: u64) -> Self {
        LinkAggregator {
            order,
            config,
            analysis_id,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Aggregate all candidates of one query gene.
    ///
    /// Candidates outside `universe` and self-pairs are skipped. In
    /// first-gene-wins mode, candidates listed in `already_processed`
    /// (genes whose own scan has committed) are skipped so the unordered
    /// pair is stored only once. A pair may legitimately yield both a
    /// positive and a negative record, but a candidate gene appearing
    /// twice would break the one-record-per-sign-per-pair invariant and
    /// fails with [`CoexError::InconsistentState`].
    pub fn aggregate(
        &self,
        query_gene: GeneId,
        candidates: &[CandidateObservation],
        universe: &HashSet<GeneId>,
        already_processed: &HashSet<GeneId>,
    ) -> Result<Vec<GenePairLink>, CoexError> {
        let stringency = self.config.effective_stringency();
        let mut links = Vec::new();
        let mut seen: HashSet<GeneId> = HashSet::default();

        for co in candidates {
            if !seen.insert(co.candidate_gene) {
                return Err(CoexError::InconsistentState(format!(
                    "candidate gene {} observed more than once for query {}",
                    co.candidate_gene, query_gene
                )));
            }

            if !universe.contains(&co.candidate_gene) {
                debug!(
                    "candidate gene {} is outside the analyzed universe, skipping (query {})",
                    co.candidate_gene, query_gene
                );
                continue;
            }

            // self-pairs can leak in from probe-level results
            if co.candidate_gene == query_gene {
                continue;
            }

            if !self.config.store_both_ways && already_processed.contains(&co.candidate_gene) {
                continue;
            }

            let tested_in = bitvec::encode(self.order, co.tested.iter().copied())?;

            // start all-specific, then clear the known-nonspecific
            // positions; only tested datasets can count as specific
            let mut specific_mask = bitvec::encode_all(self.order);
            bitvec::clear_ids(self.order, &mut specific_mask, co.nonspecific.iter().copied())?;
            let specific_mask = bitvec::intersect(&specific_mask, &tested_in)?;

            if co.negative_support.len() >= stringency {
                links.push(self.emit(
                    query_gene,
                    co,
                    LinkSign::Negative,
                    &co.negative_support,
                    &tested_in,
                    &specific_mask,
                )?);
            }

            if co.positive_support.len() >= stringency {
                links.push(self.emit(
                    query_gene,
                    co,
                    LinkSign::Positive,
                    &co.positive_support,
                    &tested_in,
                    &specific_mask,
                )?);
            }
        }

        Ok(links)
    }

    fn emit(
        &self,
        query_gene: GeneId,
        co: &CandidateObservation,
        sign: LinkSign,
        support_ids: &[u64],
        tested_in: &[u8],
        specific_mask: &[u8],
    ) -> Result<GenePairLink, CoexError> {
        let supporting = bitvec::encode(self.order, support_ids.iter().copied())?;

        // supporting ⊆ tested_in must hold on every stored record
        let supporting = bitvec::intersect(&supporting, tested_in)?;
        let specific = bitvec::intersect(specific_mask, &supporting)?;

        Ok(GenePairLink {
            query_gene,
            found_gene: co.candidate_gene,
            analysis_id: self.analysis_id,
            sign,
            support: bitvec::count_bits(&supporting),
            tested_in: tested_in.to_vec(),
            supporting,
            specific,
        })
    }
}

/// Shared, read-mostly cache of per-gene tested-in bit-vectors.
///
/// Populated lazily during a run. Writes are idempotent: recomputing a
/// gene's vector yields byte-identical bytes, so concurrent population
/// needs no locking beyond the map's own insertion.
#[derive(Default)]
pub struct TestedInCache {
    vectors: DashMap<GeneId, Arc<Vec<u8>>>,
}

impl TestedInCache {
    pub fn new() -> Self {
        TestedInCache {
            vectors: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Fetch a gene's tested-in vector, computing and caching it on miss.
    pub fn tested_vector<F>(&self, gene: GeneId, compute: F) -> anyhow::Result<Arc<Vec<u8>>>
    where
        F: FnOnce() -> anyhow::Result<Vec<u8>>,
    {
        if let Some(v) = self.vectors.get(&gene) {
            return Ok(v.clone());
        }
        let fresh = Arc::new(compute()?);
        Ok(self.vectors.entry(gene).or_insert(fresh).clone())
    }

    /// Datasets in which both genes of a pair were tested: the byte-wise
    /// AND of the two per-gene vectors.
    pub fn pair_tested_in(
        &self,
        query_vector: &[u8],
        target_vector: &[u8],
    ) -> Result<Vec<u8>, CoexError> {
        bitvec::intersect(query_vector, target_vector)
    }
}
