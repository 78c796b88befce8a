use approx::assert_abs_diff_eq;
use coexp::node_degree::NodeDegreeEngine;

#[test]
fn genes_without_ranks_are_excluded() {
    let engine = NodeDegreeEngine::new();
    assert!(!engine.add_gene(1, &[], 5));
    assert!(engine.is_empty());

    assert!(engine.add_gene(2, &[0.5], 5));
    assert_eq!(engine.len(), 1);
}

#[test]
fn per_gene_summaries_are_computed() {
    let engine = NodeDegreeEngine::new();
    engine.add_gene(1, &[0.1, 0.2, 0.3, 0.4], 7);

    let records = engine.finalize();
    assert_eq!(records.len(), 1);
    let r = &records[0];

    assert_eq!(r.gene, 1);
    assert_eq!(r.num_tests, 4);
    assert_eq!(r.num_links, 7);
    assert_abs_diff_eq!(r.median, 0.25);
    assert_abs_diff_eq!(r.mad, 0.1, epsilon = 1e-12);
    assert!(r.pvalue > 0.0 && r.pvalue < 1.0);
    assert_eq!(r.distribution.len(), 10);
    // sole gene gets the top normalized rank
    assert_abs_diff_eq!(r.rank, 1.0);
    assert_abs_diff_eq!(r.rank_by_num_links, 1.0);
}

#[test]
fn global_ranks_order_by_significance_and_link_count() {
    let engine = NodeDegreeEngine::new();

    // gene 1: consistently tiny ranks -> most significant p-value
    engine.add_gene(1, &[0.01, 0.01, 0.01], 5);
    // gene 2: middling
    engine.add_gene(2, &[0.5, 0.5, 0.5], 5);
    // gene 3: near-uniform-high -> least significant
    engine.add_gene(3, &[0.9, 0.9, 0.9], 1);

    let records = engine.finalize();
    assert_eq!(records.len(), 3);

    // output sorted by gene id
    let by_gene: Vec<u64> = records.iter().map(|r| r.gene).collect();
    assert_eq!(by_gene, vec![1, 2, 3]);

    assert!(records[0].pvalue < records[1].pvalue);
    assert!(records[1].pvalue < records[2].pvalue);

    // smaller p-value -> larger normalized rank
    assert_abs_diff_eq!(records[0].rank, 3.0 / 3.0);
    assert_abs_diff_eq!(records[1].rank, 2.0 / 3.0);
    assert_abs_diff_eq!(records[2].rank, 1.0 / 3.0);

    // genes 1 and 2 tie on link count, sharing ranks 2 and 3
    assert_abs_diff_eq!(records[0].rank_by_num_links, 2.5 / 3.0);
    assert_abs_diff_eq!(records[1].rank_by_num_links, 2.5 / 3.0);
    assert_abs_diff_eq!(records[2].rank_by_num_links, 1.0 / 3.0);

    // bounds: every rank in [1/M, 1]
    for r in &records {
        assert!(r.rank >= 1.0 / 3.0 && r.rank <= 1.0);
        assert!(r.rank_by_num_links >= 1.0 / 3.0 && r.rank_by_num_links <= 1.0);
    }
}

#[test]
fn finalize_on_empty_engine_is_empty() {
    let engine = NodeDegreeEngine::new();
    assert!(engine.finalize().is_empty());
}

#[test]
fn distribution_reflects_rank_concentration() {
    let engine = NodeDegreeEngine::new();
    engine.add_gene(1, &[0.05, 0.06, 0.07, 0.95], 0);
    let records = engine.finalize();

    let dist = &records[0].distribution;
    assert_eq!(dist.len(), 10);
    // all mass in the first bin except one observation in the last
    assert_eq!(&dist[..1], "9");
    assert_eq!(&dist[9..], "3");
    assert_eq!(&dist[1..9], "00000000");
}
