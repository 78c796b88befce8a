//! Query-time pipeline: re-expand stored links against the caller's
//! dataset filter and stringency, resolve direction collisions, annotate
//! node degree, and bound the result size.

use crate::merge::{merge_opposite_signs, ExpandedLink, MergedLink};
use crate::records::{DatasetId, GeneId, GenePairLink, NodeDegree};
use crate::trim::{prune_gene_summaries, sort_for_trim, trim};
use coexp_util::bitvec;
use coexp_util::dataset_order::DatasetOrder;
use coexp_util::errors::CoexError;
use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};

/// The three membership sets of one stored link, decoded.
#[derive(Debug, Clone)]
pub struct DecodedSupport {
    pub tested: Vec<DatasetId>,
    pub supporting: Vec<DatasetId>,
    pub specific: Vec<DatasetId>,
}

/// Decode a link's bit-vectors back into dataset id sets.
///
/// The stored specificity mask covers all tested datasets, so the
/// specific set is restricted to supporting datasets before reporting.
pub fn decode_support(
    order: &DatasetOrder,
    link: &GenePairLink,
) -> Result<DecodedSupport, CoexError> {
    let tested = bitvec::decode(order, &link.tested_in)?;
    let supporting = bitvec::decode(order, &link.supporting)?;

    let specific_mask = bitvec::intersect(&link.specific, &link.supporting)?;
    let specific = bitvec::decode(order, &specific_mask)?;

    Ok(DecodedSupport {
        tested,
        supporting,
        specific,
    })
}

/// Caller-supplied query constraints.
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub stringency: usize,
    pub max_edges: usize,
    /// Restrict evidence to these datasets; `None` means all datasets of
    /// the analysis.
    pub dataset_filter: Option<HashSet<DatasetId>>,
}

/// Per-query evidence summary across all returned links.
#[derive(Debug, Clone, Default)]
pub struct QuerySummary {
    /// How many returned links each dataset supported.
    pub support_count: HashMap<DatasetId, usize>,
    pub tested_datasets: HashSet<DatasetId>,
    pub datasets_with_specific_probes: HashSet<DatasetId>,
}

/// Result of one query gene's link lookup.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub links: Vec<MergedLink>,
    pub effective_stringency: usize,
    pub summary: QuerySummary,
    /// Node-degree summaries for genes still present in `links`.
    pub node_degrees: HashMap<GeneId, NodeDegree>,
}

struct ExpandedDetail {
    link: ExpandedLink,
    support: DecodedSupport,
}

fn retain_filtered(ids: &mut Vec<DatasetId>, filter: &HashSet<DatasetId>) {
    ids.retain(|id| filter.contains(id));
}

/// Re-expand one stored link under a dataset filter, recounting support.
///
/// `query_gene` orients the record: stored links may carry the pair in
/// either direction when links are stored both ways.
fn expand_link(
    order: &DatasetOrder,
    query_gene: GeneId,
    link: &GenePairLink,
    filter: Option<&HashSet<DatasetId>>,
) -> Result<ExpandedDetail, CoexError> {
    let found_gene = if link.query_gene == query_gene {
        link.found_gene
    } else {
        link.query_gene
    };

    let mut support = decode_support(order, link)?;

    if let Some(filter) = filter {
        retain_filtered(&mut support.tested, filter);
        retain_filtered(&mut support.supporting, filter);
        let supporting: HashSet<DatasetId> = support.supporting.iter().copied().collect();
        support.specific.retain(|id| supporting.contains(id));
    }

    Ok(ExpandedDetail {
        link: ExpandedLink {
            found_gene,
            sign: link.sign,
            support: support.supporting.len(),
            specific_support: support.specific.len(),
            num_tested_in: support.tested.len(),
        },
        support,
    })
}

/// Full query pipeline for one query gene over its stored links.
///
/// Empty input yields an empty result, never an error.
pub fn query_links(
    order: &DatasetOrder,
    query_gene: GeneId,
    stored: &[GenePairLink],
    params: &QueryParams,
    node_degrees: &HashMap<GeneId, NodeDegree>,
) -> Result<QueryResult, CoexError> {
    let filter = params.dataset_filter.as_ref();

    let mut details = Vec::with_capacity(stored.len());
    for link in stored {
        details.push(expand_link(order, query_gene, link, filter)?);
    }

    let expanded: Vec<ExpandedLink> = details.iter().map(|d| d.link.clone()).collect();
    let mut merged = merge_opposite_signs(query_gene, &expanded)?;

    // links can fall under stringency once datasets are filtered out
    merged.retain(|m| m.support_key() >= params.stringency);

    let surviving: HashSet<GeneId> = merged.iter().map(|m| m.found_gene).collect();

    let mut summary = QuerySummary::default();
    for d in &details {
        if !surviving.contains(&d.link.found_gene) {
            continue;
        }
        for &id in &d.support.supporting {
            *summary.support_count.entry(id).or_insert(0) += 1;
        }
        summary.tested_datasets.extend(d.support.tested.iter().copied());
        summary
            .datasets_with_specific_probes
            .extend(d.support.specific.iter().copied());
    }

    sort_for_trim(&mut merged);
    let trimmed = trim(&merged, params.max_edges, params.stringency);

    let mut kept_degrees: HashMap<GeneId, NodeDegree> = HashMap::default();
    if let Some(nd) = node_degrees.get(&query_gene) {
        kept_degrees.insert(query_gene, nd.clone());
    }
    for link in &trimmed.kept {
        if let Some(nd) = node_degrees.get(&link.found_gene) {
            kept_degrees.insert(link.found_gene, nd.clone());
        }
    }
    prune_gene_summaries(&trimmed.kept, &mut kept_degrees);

    Ok(QueryResult {
        links: trimmed.kept,
        effective_stringency: trimmed.effective_stringency,
        summary,
        node_degrees: kept_degrees,
    })
}
