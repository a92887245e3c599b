mod fit_sam;
mod sim_data;

use fit_sam::*;
use lupin::sam_common::info;
use sim_data::*;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LUPIN",
    long_about = "Self-Assembling Manifolds for single-cell expression data\n\
		  Iteratively reweight genes by the dispersion of their\n\
		  nearest-neighbour averaged expression until the\n\
		  cell-cell distances stop changing."
)]
struct Cli {
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Rank genes and embed cells by self-assembling manifolds",
        long_about = "Run SAM in the four stages per iteration: \n\
		      (1) Average expression over each cell's k nearest neighbours\n\
		      (2) Weight genes by the dispersion of the averaged expression\n\
		      (3) Project cells by a weighted PCA on the top genes\n\
		      (4) Rebuild the kNN graph from the projected distances.\n"
    )]
    Run(SamArgs),

    /// simulate a cells x genes matrix with clustered signal genes
    Simulate(SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match &cli.commands {
        Commands::Run(args) => {
            fit_sam(args)?;
        }
        Commands::Simulate(args) => {
            sim_data(args)?;
        }
    }

    info!("Done");
    Ok(())
}
