use clap::{Parser, Subcommand};
use coexp::run_analyze::*;
use coexp::run_trim::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "COEXP",
    long_about = "Gene-to-gene coexpression link index.\n\
		  `analyze` aggregates raw probe-level correlation observations\n\
		  into compact link records keyed by a stable dataset ordering;\n\
		  `trim` bounds a stored link table to an edge budget."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Aggregate raw observations into link records and node-degree summaries",
        long_about = "Aggregate per-dataset signed support into canonical link records,\n\
		      one per sign per gene pair, subject to a minimum-support\n\
		      stringency; then combine per-dataset expression ranks into\n\
		      node-degree summaries, rank-normalized over all genes.\n"
    )]
    Analyze(AnalyzeArgs),

    #[command(about = "Trim a link table to a maximum-edge budget")]
    Trim(TrimArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.commands {
        Commands::Analyze(args) => {
            run_analyze(args)?;
        }
        Commands::Trim(args) => {
            run_trim(args)?;
        }
    }

    Ok(())
}
