//! Interfaces to the external collaborators (probe-level link results,
//! expression rank lookups, gene metadata) plus in-memory
//! implementations backing the batch CLI and the tests.

use crate::aggregate::TestedInCache;
use crate::records::{CandidateObservation, DatasetId, GeneId};
use coexp_util::bitvec;
use coexp_util::dataset_order::DatasetOrder;
use fnv::FnvHashMap as HashMap;

/// Gene metadata used purely for decorating results.
#[derive(Debug, Clone)]
pub struct GeneInfo {
    pub symbol: Box<str>,
    pub official_name: Box<str>,
    pub taxon_id: u64,
}

/// Supplier of raw probe-level coexpression observations, computed
/// elsewhere, for one query gene at a time.
pub trait RawLinkSource {
    fn raw_link_observations(&self, query_gene: GeneId)
        -> anyhow::Result<Vec<CandidateObservation>>;
}

/// Supplier of per-dataset relative expression ranks, values in (0,1].
pub trait RankSource {
    fn per_dataset_rank(&self, gene: GeneId, dataset: DatasetId) -> Option<f64>;

    /// All of a gene's ranks, in dataset id order.
    fn ranks_for_gene(&self, gene: GeneId) -> Vec<f64>;
}

/// Supplier of gene metadata.
pub trait GeneInfoSource {
    fn gene_metadata(&self, gene: GeneId) -> Option<GeneInfo>;
}

/// Signed evidence for one (query, candidate) pair.
#[derive(Debug, Clone, Default)]
pub struct PairEvidence {
    pub positive: Vec<DatasetId>,
    pub negative: Vec<DatasetId>,
    /// Datasets whose probes may cross-hybridize for this pair.
    pub nonspecific: Vec<DatasetId>,
}

/// In-memory observation store.
///
/// Holds per-gene tested-dataset sets and per-pair signed evidence; the
/// pair's tested-in set is derived on demand by AND-combining the two
/// per-gene tested vectors through the shared [`TestedInCache`].
pub struct ObservationStore {
    order: DatasetOrder,
    tested: HashMap<GeneId, Vec<DatasetId>>,
    pairs: HashMap<GeneId, Vec<(GeneId, PairEvidence)>>,
    cache: TestedInCache,
}

impl ObservationStore {
    pub fn new(order: DatasetOrder) -> Self {
        ObservationStore {
            order,
            tested: HashMap::default(),
            pairs: HashMap::default(),
            cache: TestedInCache::new(),
        }
    }

    pub fn order(&self) -> &DatasetOrder {
        &self.order
    }

    /// Genes with any tested dataset, ascending.
    pub fn genes(&self) -> Vec<GeneId> {
        let mut genes: Vec<GeneId> = self.tested.keys().copied().collect();
        genes.sort_unstable();
        genes
    }

    pub fn set_tested(&mut self, gene: GeneId, datasets: Vec<DatasetId>) {
        self.tested.insert(gene, datasets);
    }

    pub fn add_pair(&mut self, query: GeneId, candidate: GeneId, evidence: PairEvidence) {
        self.pairs
            .entry(query)
            .or_default()
            .push((candidate, evidence));
    }

    fn tested_vector(&self, gene: GeneId) -> anyhow::Result<std::sync::Arc<Vec<u8>>> {
        self.cache.tested_vector(gene, || {
            let datasets = self
                .tested
                .get(&gene)
                .ok_or_else(|| anyhow::anyhow!("no tested datasets recorded for gene {}", gene))?;
            Ok(bitvec::encode(&self.order, datasets.iter().copied())?)
        })
    }
}

impl RawLinkSource for ObservationStore {
    fn raw_link_observations(
        &self,
        query_gene: GeneId,
    ) -> anyhow::Result<Vec<CandidateObservation>> {
        let Some(pairs) = self.pairs.get(&query_gene) else {
            return Ok(vec![]);
        };

        let query_vector = self.tested_vector(query_gene)?;

        let mut out = Vec::with_capacity(pairs.len());
        for (candidate, evidence) in pairs {
            let candidate_vector = self.tested_vector(*candidate)?;
            let both = self.cache.pair_tested_in(&query_vector, &candidate_vector)?;

            out.push(CandidateObservation {
                candidate_gene: *candidate,
                positive_support: evidence.positive.clone(),
                negative_support: evidence.negative.clone(),
                tested: bitvec::decode(&self.order, &both)?,
                nonspecific: evidence.nonspecific.clone(),
            });
        }
        Ok(out)
    }
}

/// In-memory rank table.
#[derive(Default)]
pub struct RankTable {
    ranks: HashMap<GeneId, Vec<(DatasetId, f64)>>,
}

impl RankTable {
    pub fn new() -> Self {
        RankTable::default()
    }

    pub fn insert(&mut self, gene: GeneId, dataset: DatasetId, rank: f64) {
        self.ranks.entry(gene).or_default().push((dataset, rank));
    }

    pub fn sort(&mut self) {
        for entries in self.ranks.values_mut() {
            entries.sort_by_key(|(dataset, _)| *dataset);
        }
    }
}

impl RankSource for RankTable {
    fn per_dataset_rank(&self, gene: GeneId, dataset: DatasetId) -> Option<f64> {
        self.ranks
            .get(&gene)?
            .iter()
            .find(|(d, _)| *d == dataset)
            .map(|(_, r)| *r)
    }

    fn ranks_for_gene(&self, gene: GeneId) -> Vec<f64> {
        self.ranks
            .get(&gene)
            .map(|entries| entries.iter().map(|(_, r)| *r).collect())
            .unwrap_or_default()
    }
}

/// In-memory gene metadata table.
#[derive(Default)]
pub struct GeneTable {
    info: HashMap<GeneId, GeneInfo>,
}

impl GeneTable {
    pub fn new() -> Self {
        GeneTable::default()
    }

    pub fn insert(&mut self, gene: GeneId, info: GeneInfo) {
        self.info.insert(gene, info);
    }
}

impl GeneInfoSource for GeneTable {
    fn gene_metadata(&self, gene: GeneId) -> Option<GeneInfo> {
        self.info.get(&gene).cloned()
    }
}
