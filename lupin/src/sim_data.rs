use lupin::sam_common::*;
use lupin::simulate::{generate_clustered_expression_file, SimArgs};

use clap::Args;
use matrix_util::common_io::{extension, mkdir, write_lines};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Output matrix file (`.tsv.gz` or `.csv.gz` recommended)
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// number of cells
    #[arg(long, default_value_t = 100)]
    cells: usize,

    /// number of genes
    #[arg(long, default_value_t = 500)]
    genes: usize,

    /// number of clustered genes (genes 0, 1, ...)
    #[arg(long, default_value_t = 10)]
    signal_genes: usize,

    /// number of cell groups
    #[arg(long, default_value_t = 2)]
    groups: usize,

    /// random seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

pub fn sim_data(args: &SimulateArgs) -> anyhow::Result<()> {
    if args.cells == 0 || args.genes == 0 {
        return Err(anyhow::anyhow!(
            "empty matrix: {} cells x {} genes",
            args.cells,
            args.genes
        ));
    }

    let delim = match extension(&args.out) {
        Ok(ext) if &*ext == "csv" => ",",
        _ => "\t",
    };

    mkdir(&args.out)?;

    let sim = generate_clustered_expression_file(
        &SimArgs {
            cells: args.cells,
            genes: args.genes,
            signal_genes: args.signal_genes,
            groups: args.groups,
            seed: args.seed,
        },
        &args.out,
        delim,
    )?;

    let membership_file = format!("{}.groups.tsv.gz", args.out);
    let lines: Vec<Box<str>> = sim
        .membership
        .iter()
        .map(|g| g.to_string().into_boxed_str())
        .collect();
    write_lines(&lines, &membership_file)?;
    info!("wrote {}", membership_file);

    Ok(())
}
