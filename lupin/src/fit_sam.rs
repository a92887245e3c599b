use lupin::sam_common::*;
use lupin::*;

use clap::Args;
use matrix_util::common_io::extension;
use matrix_util::traits::IoOps;

#[derive(Args, Debug)]
pub struct SamArgs {
    /// Dense cells x genes matrix (`.tsv`, `.csv`, optionally `.gz`);
    /// values should already be log-normalized
    #[arg(required = true)]
    data_file: Box<str>,

    /// Output header
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// The first line holds gene names
    #[arg(long)]
    header: bool,

    /// Field delimiter (default: `,` for `.csv`, tab otherwise)
    #[arg(long)]
    delim: Option<Box<str>>,

    /// Maximum number of reweighting iterations
    #[arg(long, default_value_t = DEFAULT_MAX_ITER)]
    max_iter: usize,

    /// Stop once the distance-matrix error falls to this value
    #[arg(long, default_value_t = DEFAULT_STOPPING_CONDITION)]
    stopping_condition: f32,

    /// Number of top-weighted genes used in the PCA
    #[arg(long, short = 'g', default_value_t = DEFAULT_NUM_GENES)]
    n_genes: usize,

    /// Use every gene in the PCA (ignore `--n-genes`)
    #[arg(long)]
    all_genes: bool,

    /// Number of principal components
    #[arg(long, short = 'p', default_value_t = DEFAULT_NPCS)]
    npcs: usize,

    /// Number of top dispersions averaged into the cap
    #[arg(long, default_value_t = DEFAULT_NUM_NORM_AVG)]
    num_norm_avg: usize,

    /// Do not scale principal components by explained variance
    #[arg(long)]
    no_weight_pcs: bool,

    /// #k-nearest neighbours (default: round(sqrt(#cells)) within [5, 100])
    #[arg(long, short = 'k')]
    knn: Option<usize>,

    /// Distance metric: correlation, cosine or euclidean
    #[arg(long, short = 'd', default_value = "correlation")]
    distance: Box<str>,

    #[arg(long, value_enum, default_value_t = Preprocessing::Normalizer)]
    preprocessing: Preprocessing,

    #[arg(long, value_enum, default_value_t = ConvergenceMetric::MeanAbsolute)]
    convergence: ConvergenceMetric,

    /// Random seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Also write the first `d` weighted PCs as `{out}.layout.tsv.gz`
    #[arg(long)]
    layout_dim: Option<usize>,

    /// Also write the final cell-cell distance matrix
    #[arg(long)]
    save_distance: bool,
}

impl SamArgs {
    fn sam_params(&self) -> SamParams {
        SamParams {
            max_iter: self.max_iter,
            stopping_condition: self.stopping_condition,
            n_genes: (!self.all_genes).then_some(self.n_genes),
            npcs: self.npcs,
            num_norm_avg: self.num_norm_avg,
            weight_pcs: !self.no_weight_pcs,
            knn: self.knn,
            distance: self.distance.clone(),
            preprocessing: self.preprocessing,
            convergence: self.convergence,
            seed: self.seed,
        }
    }

    fn delimiter(&self) -> Box<str> {
        match (&self.delim, extension(&self.data_file)) {
            (Some(delim), _) => delim.clone(),
            (None, Ok(ext)) if &*ext == "csv" => ",".into(),
            _ => "\t".into(),
        }
    }
}

pub fn fit_sam(args: &SamArgs) -> anyhow::Result<()> {
    // 1. read the expression matrix
    let delim = args.delimiter();
    let (gene_names, xx) = if args.header {
        let (names, xx) = Mat::read_file_delim_with_header(&args.data_file, &*delim)?;
        (Some(names), xx)
    } else {
        (None, Mat::read_file_delim(&args.data_file, &*delim, None)?)
    };

    info!(
        "Read {} cells x {} genes from {}",
        xx.nrows(),
        xx.ncols(),
        args.data_file
    );

    // 2. self-assembling manifolds
    let sam = run_sam(&xx, &args.sam_params())?;

    info!(
        "{:?} after {} iteration(s), error = {:.6e}",
        sam.state, sam.iterations_run, sam.final_error
    );

    // 3. results
    sam.write_all(&args.out, gene_names.as_deref(), args.save_distance)?;

    if let Some(dim) = args.layout_dim {
        let provider = LeadingComponents::new(dim)?;
        let layout = provider.embed(&sam)?;
        let layout_file = format!("{}.layout.tsv.gz", args.out);
        layout.to_tsv(&layout_file)?;
        info!("wrote {} ({})", layout_file, provider.name());
    }

    Ok(())
}
