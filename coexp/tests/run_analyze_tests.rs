use coexp::run_analyze::{run_analyze, AnalyzeArgs};
use std::fs;
use std::path::Path;

fn path_str(dir: &Path, name: &str) -> Box<str> {
    dir.join(name).to_str().unwrap().into()
}

/// Three genes tested in datasets {1,2,3}; pairs (1,2) and (2,3) each
/// have two supporting datasets, stored both ways.
fn write_inputs(dir: &Path) {
    fs::write(
        dir.join("tested.tsv"),
        "1\t1,2,3\n2\t1,2,3\n3\t1,2,3\n",
    )
    .unwrap();
    fs::write(
        dir.join("obs.tsv"),
        "1\t2\t1,2\t.\t.\n2\t1\t1,2\t.\t.\n2\t3\t2,3\t.\t.\n3\t2\t2,3\t.\t.\n",
    )
    .unwrap();
    let mut ranks = String::new();
    for gene in 1..=3u64 {
        for dataset in 1..=3u64 {
            ranks.push_str(&format!("{}\t{}\t0.{}{}\n", gene, dataset, gene, dataset));
        }
    }
    fs::write(dir.join("ranks.tsv"), ranks).unwrap();
}

fn analyze_args(dir: &Path) -> AnalyzeArgs {
    AnalyzeArgs {
        observations: path_str(dir, "obs.tsv"),
        tested: path_str(dir, "tested.tsv"),
        ranks: path_str(dir, "ranks.tsv"),
        stringency: 2,
        store_both_ways: true,
        checkpoint: Some(path_str(dir, "checkpoint.tsv")),
        analysis_id: 1,
        analysis_name: "resume test".into(),
        taxon_id: 0,
        threads: 1,
        output: path_str(dir, "out"),
    }
}

fn data_rows(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_string())
        .collect()
}

fn degree_link_counts(path: &Path) -> Vec<(u64, usize)> {
    data_rows(path)
        .iter()
        .map(|row| {
            let fields: Vec<&str> = row.split('\t').collect();
            (fields[0].parse().unwrap(), fields[2].parse().unwrap())
        })
        .collect()
}

#[test]
fn resume_skips_committed_genes_but_reseeds_node_degree() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    // gene 1 was committed by an earlier run with 5 stored links
    fs::write(dir.path().join("checkpoint.tsv"), "1\t5\n").unwrap();

    run_analyze(&analyze_args(dir.path())).unwrap();

    // only genes 2 and 3 were scanned: two links for 2, one for 3
    let links = data_rows(&dir.path().join("out.links.tsv"));
    assert_eq!(links.len(), 3);
    for row in &links {
        let query: u64 = row.split('\t').next().unwrap().parse().unwrap();
        assert_ne!(query, 1, "committed gene rescanned: {}", row);
    }

    // the committed gene still enters the node-degree population, with
    // the link count saved in the checkpoint
    let counts = degree_link_counts(&dir.path().join("out.degree.tsv"));
    assert_eq!(counts, vec![(1, 5), (2, 2), (3, 1)]);

    // the resumed run appended its own commit rows
    assert_eq!(data_rows(&dir.path().join("checkpoint.tsv")).len(), 3);
}

#[test]
fn rerun_after_completion_adds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let args = analyze_args(dir.path());

    run_analyze(&args).unwrap();

    let links = data_rows(&dir.path().join("out.links.tsv"));
    assert_eq!(links.len(), 4);
    let counts = degree_link_counts(&dir.path().join("out.degree.tsv"));
    assert_eq!(counts, vec![(1, 1), (2, 2), (3, 1)]);

    // every gene is checkpointed, so a rerun has nothing left to scan
    run_analyze(&args).unwrap();

    assert_eq!(data_rows(&dir.path().join("out.links.tsv")).len(), 4);
    assert_eq!(data_rows(&dir.path().join("checkpoint.tsv")).len(), 3);
    let counts = degree_link_counts(&dir.path().join("out.degree.tsv"));
    assert_eq!(counts, vec![(1, 1), (2, 2), (3, 1)]);
}
