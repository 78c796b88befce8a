use crate::merge::{merge_opposite_signs, ExpandedLink};
use crate::records::{GeneId, GenePairLink};
use crate::trim::{sort_for_trim, trim};
use clap::Args;
use coexp_util::bitvec;
use coexp_util::common_io::{open_buf_reader, open_buf_writer};
use fnv::FnvHashMap as HashMap;
use log::info;
use std::io::{BufRead, Write};

#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Stored link TSV produced by `coexp analyze`
    #[arg(long, required = true)]
    pub links: Box<str>,

    /// Maximum number of links to keep (the kept set may slightly
    /// overshoot at the cutoff support level)
    #[arg(long, required = true)]
    pub max_edges: usize,

    /// Starting stringency; the effective stringency only escalates
    #[arg(short, long, default_value_t = 2)]
    pub stringency: usize,

    /// Output TSV of kept pairs
    #[arg(short, long, required = true)]
    pub output: Box<str>,
}

pub fn run_trim(args: &TrimArgs) -> anyhow::Result<()> {
    let buf = open_buf_reader(&args.links)?;

    let mut by_query: HashMap<GeneId, Vec<ExpandedLink>> = HashMap::default();
    let mut total_rows = 0usize;
    for line in buf.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let link = GenePairLink::from_tsv_row(&line)?;
        total_rows += 1;

        // counts only; no ordering needed to popcount the stored vectors
        let specific = bitvec::intersect(&link.specific, &link.supporting)?;
        by_query.entry(link.query_gene).or_default().push(ExpandedLink {
            found_gene: link.found_gene,
            sign: link.sign,
            support: link.support,
            specific_support: bitvec::count_bits(&specific),
            num_tested_in: link.num_tested_in(),
        });
    }

    let mut merged = Vec::new();
    for (query_gene, links) in by_query {
        merged.extend(merge_opposite_signs(query_gene, &links)?);
    }

    sort_for_trim(&mut merged);
    let result = trim(&merged, args.max_edges, args.stringency);

    info!(
        "{} rows -> {} pairs -> kept {} at effective stringency {}",
        total_rows,
        merged.len(),
        result.kept.len(),
        result.effective_stringency
    );

    let mut out = open_buf_writer(&args.output)?;
    writeln!(
        out,
        "#query\tfound\tpos_support\tneg_support\tnum_tested_in"
    )?;
    for link in &result.kept {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            link.query_gene,
            link.found_gene,
            link.pos_support,
            link.neg_support,
            link.num_tested_in
        )?;
    }
    out.flush()?;

    Ok(())
}
