use coexp::query::{decode_support, query_links, QueryParams};
use coexp::records::{GenePairLink, LinkSign, NodeDegree};
use coexp_util::bitvec;
use coexp_util::dataset_order::DatasetOrder;
use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};

fn order() -> DatasetOrder {
    DatasetOrder::new([1, 2, 3, 4, 5, 6])
}

fn stored_link(
    order: &DatasetOrder,
    query: u64,
    found: u64,
    sign: LinkSign,
    supporting: &[u64],
    tested: &[u64],
    specific: &[u64],
) -> GenePairLink {
    let supporting_v = bitvec::encode(order, supporting.iter().copied()).unwrap();
    GenePairLink {
        query_gene: query,
        found_gene: found,
        analysis_id: 1,
        sign,
        support: bitvec::count_bits(&supporting_v),
        tested_in: bitvec::encode(order, tested.iter().copied()).unwrap(),
        supporting: supporting_v,
        specific: bitvec::encode(order, specific.iter().copied()).unwrap(),
    }
}

fn degree(gene: u64) -> NodeDegree {
    NodeDegree {
        gene,
        num_tests: 6,
        num_links: 1,
        median: 0.5,
        mad: 0.1,
        pvalue: 0.5,
        distribution: "9000000000".into(),
        rank: 0.5,
        rank_by_num_links: 0.5,
    }
}

fn no_filter(stringency: usize, max_edges: usize) -> QueryParams {
    QueryParams {
        stringency,
        max_edges,
        dataset_filter: None,
    }
}

#[test]
fn decode_support_restricts_specific_to_supporting() {
    let order = order();
    // specificity mask covers tested datasets, supporting or not
    let link = stored_link(
        &order,
        1,
        2,
        LinkSign::Positive,
        &[1, 2, 3],
        &[1, 2, 3, 4, 5],
        &[2, 3, 4, 5],
    );

    let decoded = decode_support(&order, &link).unwrap();
    assert_eq!(decoded.tested, vec![1, 2, 3, 4, 5]);
    assert_eq!(decoded.supporting, vec![1, 2, 3]);
    assert_eq!(decoded.specific, vec![2, 3]);
}

#[test]
fn query_returns_merged_and_annotated_links() {
    let order = order();
    let stored = vec![
        stored_link(&order, 1, 2, LinkSign::Positive, &[1, 2, 3], &[1, 2, 3, 4], &[1, 2, 3]),
        stored_link(&order, 1, 2, LinkSign::Negative, &[5, 6], &[1, 2, 3, 4, 5, 6], &[5]),
        stored_link(&order, 1, 3, LinkSign::Negative, &[4, 5], &[4, 5, 6], &[4, 5]),
    ];

    let mut degrees: HashMap<u64, NodeDegree> = HashMap::default();
    for gene in [1, 2, 3, 4] {
        degrees.insert(gene, degree(gene));
    }

    let result = query_links(&order, 1, &stored, &no_filter(2, 100), &degrees).unwrap();

    assert_eq!(result.links.len(), 2);
    assert_eq!(result.effective_stringency, 2);

    // pair (1,2) merged across signs, sorted first by support key
    let first = &result.links[0];
    assert_eq!(first.found_gene, 2);
    assert_eq!(first.pos_support, 3);
    assert_eq!(first.neg_support, 2);
    assert_eq!(first.nonspec_neg_support, 1);
    assert_eq!(first.num_tested_in, 6);

    let second = &result.links[1];
    assert_eq!(second.found_gene, 3);
    assert_eq!(second.neg_support, 2);

    // only genes on kept links carry node-degree annotations
    assert_eq!(result.node_degrees.len(), 3);
    assert!(result.node_degrees.contains_key(&1));
    assert!(result.node_degrees.contains_key(&2));
    assert!(result.node_degrees.contains_key(&3));

    // summary counts each supporting dataset across returned links
    assert_eq!(result.summary.support_count.get(&5), Some(&2));
    assert_eq!(result.summary.support_count.get(&1), Some(&1));
    assert_eq!(result.summary.tested_datasets.len(), 6);
}

#[test]
fn dataset_filter_recounts_and_drops_weak_links() {
    let order = order();
    let stored = vec![
        stored_link(&order, 1, 2, LinkSign::Positive, &[1, 2, 3], &[1, 2, 3, 4], &[1, 2, 3]),
        stored_link(&order, 1, 3, LinkSign::Positive, &[3, 4], &[3, 4, 5], &[3, 4]),
    ];

    let filter: HashSet<u64> = [1, 2, 4].into_iter().collect();
    let params = QueryParams {
        stringency: 2,
        max_edges: 100,
        dataset_filter: Some(filter),
    };

    let result = query_links(&order, 1, &stored, &params, &HashMap::default()).unwrap();

    // (1,2) drops dataset 3 -> support 2, still kept;
    // (1,3) drops to support 1 -> below stringency
    assert_eq!(result.links.len(), 1);
    assert_eq!(result.links[0].found_gene, 2);
    assert_eq!(result.links[0].pos_support, 2);
}

#[test]
fn stored_direction_is_reoriented_to_the_query_gene() {
    let order = order();
    // stored from gene 2's perspective
    let stored = vec![stored_link(
        &order,
        2,
        1,
        LinkSign::Positive,
        &[1, 2],
        &[1, 2, 3],
        &[1, 2],
    )];

    let result = query_links(&order, 1, &stored, &no_filter(2, 10), &HashMap::default()).unwrap();
    assert_eq!(result.links.len(), 1);
    assert_eq!(result.links[0].query_gene, 1);
    assert_eq!(result.links[0].found_gene, 2);
}

#[test]
fn budget_trims_and_prunes_annotations() {
    let order = order();
    let mut stored = vec![];
    // five candidates with descending support
    for (i, support) in [5, 4, 3, 2, 2].iter().enumerate() {
        let found = 10 + i as u64;
        let ids: Vec<u64> = (1..=*support as u64).collect();
        stored.push(stored_link(
            &order,
            1,
            found,
            LinkSign::Positive,
            &ids,
            &[1, 2, 3, 4, 5, 6],
            &ids,
        ));
    }

    let mut degrees: HashMap<u64, NodeDegree> = HashMap::default();
    for gene in [1, 10, 11, 12, 13, 14] {
        degrees.insert(gene, degree(gene));
    }

    let result = query_links(&order, 1, &stored, &no_filter(1, 2), &degrees).unwrap();

    // budget of 2 escalates the threshold to support 4
    assert_eq!(result.effective_stringency, 4);
    let found: Vec<u64> = result.links.iter().map(|l| l.found_gene).collect();
    assert_eq!(found, vec![10, 11]);

    // trimmed genes lose their annotations
    assert!(result.node_degrees.contains_key(&10));
    assert!(result.node_degrees.contains_key(&11));
    assert!(!result.node_degrees.contains_key(&12));
    assert!(!result.node_degrees.contains_key(&14));
}

#[test]
fn empty_input_yields_empty_result() {
    let order = order();
    let result = query_links(&order, 1, &[], &no_filter(2, 10), &HashMap::default()).unwrap();
    assert!(result.links.is_empty());
    assert_eq!(result.effective_stringency, 2);
    assert!(result.node_degrees.is_empty());
    assert!(result.summary.support_count.is_empty());
}
