use crate::aggregate::{AggregatorConfig, LinkAggregator};
use crate::node_degree::NodeDegreeEngine;
use crate::records::{AnalysisInfo, AnalysisRegistry, GeneId};
use crate::sources::{ObservationStore, PairEvidence, RankSource, RankTable, RawLinkSource};
use clap::{ArgAction, Args};
use coexp_util::common_io::{open_buf_reader, open_buf_writer};
use coexp_util::dataset_order::DatasetOrder;
use coexp_util::errors::CoexError;
use fnv::{FnvHashMap as HashMap, FnvHashSet as HashSet};
use indicatif::ParallelProgressIterator;
use log::{error, info, warn};
use rayon::prelude::*;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Signed evidence TSV: query gene, candidate gene, positive dataset
    /// ids, negative ids, non-specific ids (comma-separated, `.` = none)
    #[arg(long, required = true)]
    pub observations: Box<str>,

    /// Per-gene tested datasets TSV: gene, comma-separated dataset ids.
    /// The union of ids defines the dataset ordering.
    #[arg(long, required = true)]
    pub tested: Box<str>,

    /// Relative expression ranks TSV: gene, dataset, rank in (0,1]
    #[arg(long, required = true)]
    pub ranks: Box<str>,

    /// Minimum number of supporting datasets to store a link
    #[arg(short, long, default_value_t = 2)]
    pub stringency: i64,

    /// Store each link under both genes (2x storage, O(1) bidirectional
    /// lookup); `false` keeps one record per unordered pair
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    pub store_both_ways: bool,

    /// Resume file of committed genes (`gene<TAB>num_links` rows);
    /// already-listed genes are skipped on restart
    #[arg(long)]
    pub checkpoint: Option<Box<str>>,

    /// Analysis id attached to every stored link
    #[arg(long, default_value_t = 1)]
    pub analysis_id: u64,

    /// Human-readable analysis name
    #[arg(long, default_value = "gene link analysis")]
    pub analysis_name: Box<str>,

    /// NCBI taxon id of the analyzed genes
    #[arg(long, default_value_t = 0)]
    pub taxon_id: u64,

    /// Number of worker threads (0 = all cores)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Output header; writes `{OUT}.links.tsv` and `{OUT}.degree.tsv`
    #[arg(short, long, required = true)]
    pub output: Box<str>,
}

fn parse_id_list(field: &str) -> anyhow::Result<Vec<u64>> {
    if field == "." || field.is_empty() {
        return Ok(vec![]);
    }
    field
        .split(',')
        .map(|tok| {
            tok.trim()
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("bad dataset id '{}': {}", tok, e))
        })
        .collect()
}

fn data_rows(file: &str) -> anyhow::Result<Vec<Box<str>>> {
    let buf = open_buf_reader(file)?;
    let mut rows = vec![];
    for line in buf.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        rows.push(line.into_boxed_str());
    }
    Ok(rows)
}

fn load_store(args: &AnalyzeArgs) -> anyhow::Result<ObservationStore> {
    let mut tested: Vec<(GeneId, Vec<u64>)> = vec![];
    let mut all_datasets: Vec<u64> = vec![];
    for row in data_rows(&args.tested)? {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() != 2 {
            return Err(anyhow::anyhow!("expected 2 fields in tested row: {}", row));
        }
        let datasets = parse_id_list(fields[1])?;
        all_datasets.extend(datasets.iter().copied());
        tested.push((fields[0].parse()?, datasets));
    }

    let order = DatasetOrder::new(all_datasets);
    info!("dataset ordering over {} datasets", order.len());

    let mut store = ObservationStore::new(order);
    for (gene, datasets) in tested {
        store.set_tested(gene, datasets);
    }

    for row in data_rows(&args.observations)? {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() != 5 {
            return Err(anyhow::anyhow!(
                "expected 5 fields in observation row: {}",
                row
            ));
        }
        store.add_pair(
            fields[0].parse()?,
            fields[1].parse()?,
            PairEvidence {
                positive: parse_id_list(fields[2])?,
                negative: parse_id_list(fields[3])?,
                nonspecific: parse_id_list(fields[4])?,
            },
        );
    }

    Ok(store)
}

fn load_ranks(file: &str) -> anyhow::Result<RankTable> {
    let mut table = RankTable::new();
    for row in data_rows(file)? {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() != 3 {
            return Err(anyhow::anyhow!("expected 3 fields in rank row: {}", row));
        }
        table.insert(fields[0].parse()?, fields[1].parse()?, fields[2].parse()?);
    }
    table.sort();
    Ok(table)
}

/// Genes committed by a previous run, with their stored link counts.
fn load_checkpoint(file: &str) -> anyhow::Result<HashMap<GeneId, usize>> {
    if !Path::new(file).exists() {
        return Ok(HashMap::default());
    }
    let mut done = HashMap::default();
    for row in data_rows(file)? {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() != 2 {
            return Err(anyhow::anyhow!("expected 2 fields in checkpoint row: {}", row));
        }
        done.insert(fields[0].parse()?, fields[1].parse()?);
    }
    Ok(done)
}

fn open_append(file: &str) -> anyhow::Result<Box<dyn Write + Send>> {
    let handle = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)?;
    Ok(Box::new(std::io::BufWriter::new(handle)))
}

fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<CoexError>(),
        Some(CoexError::InconsistentState(_))
    )
}

pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<()> {
    let nthreads = if args.threads > 0 {
        args.threads
    } else {
        num_cpus::get()
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(nthreads)
        .build_global()
        .ok();

    let store = load_store(args)?;
    let ranks = load_ranks(&args.ranks)?;

    let genes = store.genes();
    let universe: HashSet<GeneId> = genes.iter().copied().collect();

    let previously_done = match &args.checkpoint {
        Some(file) => load_checkpoint(file)?,
        None => HashMap::default(),
    };
    let resuming = !previously_done.is_empty();
    if resuming {
        info!("resuming: {} genes already committed", previously_done.len());
    }

    let config = AggregatorConfig {
        stringency: args.stringency,
        store_both_ways: args.store_both_ways,
    };
    let analysis = AnalysisInfo::new(
        args.analysis_id,
        &args.analysis_name,
        args.taxon_id,
        config.effective_stringency(),
        store.order().ids().to_vec(),
    );
    let aggregator = LinkAggregator::new(store.order(), config, analysis.id);

    info!(
        "starting '{}' on {} genes over {} datasets, stringency {}, both ways = {}",
        analysis.name,
        genes.len(),
        store.order().len(),
        analysis.stringency,
        config.store_both_ways
    );

    let links_file = format!("{}.links.tsv", args.output);
    let links_out: Mutex<Box<dyn Write + Send>> = if resuming {
        Mutex::new(open_append(&links_file)?)
    } else {
        let mut out = open_buf_writer(&links_file)?;
        writeln!(
            out,
            "#analysis {}\t{}\ttaxon {}\tstringency {}\tdatasets {}",
            analysis.id,
            analysis.name,
            analysis.taxon_id,
            analysis.stringency,
            analysis.dataset_ids.len()
        )?;
        Mutex::new(out)
    };

    let checkpoint_out: Option<Mutex<Box<dyn Write + Send>>> = match &args.checkpoint {
        Some(file) => Some(Mutex::new(open_append(file)?)),
        None => None,
    };

    let engine = NodeDegreeEngine::new();
    let total_links = AtomicUsize::new(0);

    // node degree needs the whole population, committed genes included
    for (&gene, &num_links) in previously_done.iter() {
        engine.add_gene(gene, &ranks.ranks_for_gene(gene), num_links);
    }

    // one gene's unit of work: aggregate, commit links and checkpoint
    // row atomically, then record the node-degree intermediate
    let process = |gene: GeneId, already: &HashSet<GeneId>| -> anyhow::Result<()> {
        let observations = store.raw_link_observations(gene)?;
        let links = aggregator.aggregate(gene, &observations, &universe, already)?;

        {
            let mut out = links_out.lock().expect("links writer poisoned");
            for link in &links {
                writeln!(out, "{}", link.to_tsv_row())?;
            }
            out.flush()?;

            if let Some(ck) = &checkpoint_out {
                let mut ck = ck.lock().expect("checkpoint writer poisoned");
                writeln!(ck, "{}\t{}", gene, links.len())?;
                ck.flush()?;
            }
        }

        total_links.fetch_add(links.len(), Ordering::Relaxed);
        engine.add_gene(gene, &ranks.ranks_for_gene(gene), links.len());
        Ok(())
    };

    let todo: Vec<GeneId> = genes
        .iter()
        .copied()
        .filter(|g| !previously_done.contains_key(g))
        .collect();

    if config.store_both_ways {
        let no_dedup = HashSet::default();
        let outcomes: Vec<(GeneId, anyhow::Result<()>)> = todo
            .par_iter()
            .progress_count(todo.len() as u64)
            .map(|&gene| (gene, process(gene, &no_dedup)))
            .collect();

        for (gene, outcome) in outcomes {
            if let Err(err) = outcome {
                if is_fatal(&err) {
                    return Err(err.context(format!("aggregation aborted at gene {}", gene)));
                }
                error!("gene {} failed, skipping: {:#}", gene, err);
            }
        }
    } else {
        // first-gene-wins dedup needs a stable processing order
        warn!("one-way storage: genes processed sequentially for pair dedup");
        let mut done: HashSet<GeneId> = previously_done.keys().copied().collect();
        for &gene in &todo {
            if let Err(err) = process(gene, &done) {
                if is_fatal(&err) {
                    return Err(err.context(format!("aggregation aborted at gene {}", gene)));
                }
                error!("gene {} failed, skipping: {:#}", gene, err);
            }
            done.insert(gene);
        }
    }

    // the finished run takes over as the enabled analysis for its taxon
    let mut registry = AnalysisRegistry::new();
    let analysis = registry.register(analysis);
    info!(
        "analysis '{}' complete and enabled: {} links stored across {} genes",
        analysis.name,
        total_links.load(Ordering::Relaxed),
        todo.len()
    );

    let degree_file = format!("{}.degree.tsv", args.output);
    let records = engine.finalize();
    let mut out = open_buf_writer(&degree_file)?;
    for record in &records {
        writeln!(out, "{}", record.to_tsv_row())?;
    }
    out.flush()?;
    info!("node degree written for {} genes -> {}", records.len(), degree_file);

    Ok(())
}
