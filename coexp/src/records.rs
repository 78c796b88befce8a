//! Canonical record types for the coexpression link index.

use coexp_util::bitvec;
use coexp_util::dataset_order::DatasetOrder;

pub type GeneId = u64;
pub type DatasetId = u64;

/// Direction of the correlation a link records.
///
/// A two-variant enum rather than a signed effect size, so per-sign
/// emission logic is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkSign {
    Positive,
    Negative,
}

impl LinkSign {
    pub fn symbol(&self) -> &'static str {
        match self {
            LinkSign::Positive => "+",
            LinkSign::Negative => "-",
        }
    }

    pub fn from_symbol(s: &str) -> anyhow::Result<Self> {
        match s {
            "+" => Ok(LinkSign::Positive),
            "-" => Ok(LinkSign::Negative),
            _ => Err(anyhow::anyhow!("unrecognized link sign: {}", s)),
        }
    }
}

impl std::fmt::Display for LinkSign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Bookkeeping for one analysis run. One analysis per taxon is active at
/// a time; a regenerated analysis supersedes (disables) the previous one.
#[derive(Debug, Clone)]
pub struct AnalysisInfo {
    pub id: u64,
    pub name: Box<str>,
    pub taxon_id: u64,
    pub stringency: usize,
    pub dataset_ids: Vec<DatasetId>,
    pub enabled: bool,
}

impl AnalysisInfo {
    pub fn new(id: u64, name: &str, taxon_id: u64, stringency: usize, dataset_ids: Vec<DatasetId>) -> Self {
        AnalysisInfo {
            id,
            name: name.into(),
            taxon_id,
            stringency,
            dataset_ids,
            enabled: false,
        }
    }

    /// The ordering every bit-vector of this analysis is addressed by.
    pub fn dataset_order(&self) -> DatasetOrder {
        DatasetOrder::new(self.dataset_ids.iter().copied())
    }
}

/// In-memory registry of analysis runs, at most one enabled per taxon.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRegistry {
    analyses: Vec<AnalysisInfo>,
}

impl AnalysisRegistry {
    pub fn new() -> Self {
        AnalysisRegistry::default()
    }

    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }

    /// Register a completed run: the new analysis becomes the enabled one
    /// for its taxon, disabling whichever analysis held that role before.
    /// Superseded analyses stay in the registry for provenance.
    pub fn register(&mut self, mut analysis: AnalysisInfo) -> &AnalysisInfo {
        for prior in self.analyses.iter_mut() {
            if prior.taxon_id == analysis.taxon_id {
                prior.enabled = false;
            }
        }
        analysis.enabled = true;
        self.analyses.push(analysis);
        &self.analyses[self.analyses.len() - 1]
    }

    /// The analysis currently answering queries for a taxon.
    pub fn enabled_for_taxon(&self, taxon_id: u64) -> Option<&AnalysisInfo> {
        self.analyses
            .iter()
            .find(|a| a.enabled && a.taxon_id == taxon_id)
    }

    pub fn get(&self, id: u64) -> Option<&AnalysisInfo> {
        self.analyses.iter().find(|a| a.id == id)
    }
}

/// One stored gene-pair coexpression record for one analysis and sign.
///
/// `support == popcount(supporting)`, and as decoded sets
/// `specific ⊆ supporting ⊆ tested_in`. At most one record per sign
/// exists per unordered gene pair per analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenePairLink {
    pub query_gene: GeneId,
    pub found_gene: GeneId,
    pub analysis_id: u64,
    pub sign: LinkSign,
    pub support: usize,
    pub tested_in: Vec<u8>,
    pub supporting: Vec<u8>,
    pub specific: Vec<u8>,
}

impl GenePairLink {
    /// Number of datasets the pair was tested in.
    pub fn num_tested_in(&self) -> usize {
        bitvec::count_bits(&self.tested_in)
    }

    /// One TSV row; bit-vectors rendered as lowercase hex.
    pub fn to_tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query_gene,
            self.found_gene,
            self.analysis_id,
            self.sign,
            self.support,
            bitvec::to_hex(&self.tested_in),
            bitvec::to_hex(&self.supporting),
            bitvec::to_hex(&self.specific),
        )
    }

    /// Parse a row produced by [`GenePairLink::to_tsv_row`].
    pub fn from_tsv_row(line: &str) -> anyhow::Result<Self> {
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if fields.len() != 8 {
            return Err(anyhow::anyhow!(
                "expected 8 fields in link row, found {}",
                fields.len()
            ));
        }
        Ok(GenePairLink {
            query_gene: fields[0].parse()?,
            found_gene: fields[1].parse()?,
            analysis_id: fields[2].parse()?,
            sign: LinkSign::from_symbol(fields[3])?,
            support: fields[4].parse()?,
            tested_in: bitvec::from_hex(fields[5])?,
            supporting: bitvec::from_hex(fields[6])?,
            specific: bitvec::from_hex(fields[7])?,
        })
    }
}

/// Raw per-candidate observation for a fixed (query, candidate) pair,
/// collected across datasets by the upstream probe-level analysis.
#[derive(Debug, Clone, Default)]
pub struct CandidateObservation {
    pub candidate_gene: GeneId,
    pub positive_support: Vec<DatasetId>,
    pub negative_support: Vec<DatasetId>,
    pub tested: Vec<DatasetId>,
    /// Subset of `tested` where probes may cross-hybridize.
    pub nonspecific: Vec<DatasetId>,
}

/// Per-gene node-degree summary. `rank` and `rank_by_num_links` are only
/// meaningful after the whole gene population has been finalized.
#[derive(Debug, Clone)]
pub struct NodeDegree {
    pub gene: GeneId,
    pub num_tests: usize,
    pub num_links: usize,
    pub median: f64,
    pub mad: f64,
    pub pvalue: f64,
    pub distribution: String,
    pub rank: f64,
    pub rank_by_num_links: f64,
}

impl NodeDegree {
    pub fn to_tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4e}\t{}\t{:.4}\t{:.4}",
            self.gene,
            self.num_tests,
            self.num_links,
            self.median,
            self.mad,
            self.pvalue,
            self.distribution,
            self.rank,
            self.rank_by_num_links,
        )
    }
}
