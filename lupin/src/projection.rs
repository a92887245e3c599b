use crate::dispersion::rank_by_weight;
use crate::error::SamError;
use crate::params::Preprocessing;
use crate::sam_common::*;
use matrix_util::dmatrix_rsvd::RSVD;
use matrix_util::traits::MatOps;

/// z-scores beyond this are clipped under `Preprocessing::StandardScaler`
const MAX_ZSCORE: f32 = 10.0;

/// Components whose singular value falls below this fraction of the
/// largest one are treated as outside the matrix rank
const RANK_TOL: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct ProjectionArgs {
    /// keep this many top-weighted genes (None: all genes)
    pub n_genes: Option<usize>,
    pub npcs: usize,
    pub weight_pcs: bool,
    pub preprocessing: Preprocessing,
    /// seed of the randomized SVD sketch
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct WeightedProjection {
    /// cells x components
    pub embedding: Mat,
    /// genes used for the projection, in ascending order
    pub subset_indices: Vec<usize>,
    /// variance explained by each retained component
    pub explained_variance: DVec,
}

/// The `n_genes` highest-weighted genes (ties by ascending index),
/// returned in ascending index order
pub fn top_weighted_genes(weights: &DVec, n_genes: usize) -> Vec<usize> {
    let mut selected = rank_by_weight(weights);
    selected.truncate(n_genes.min(weights.len()));
    selected.sort_unstable();
    selected
}

/// Weighted PCA of the expression matrix.
///
/// 1. subset to the top `n_genes` genes by weight
/// 2. scale each gene (column) by its weight
/// 3. row-normalize (or z-score / leave as is, see `Preprocessing`)
/// 4. centre the genes and take up to `npcs` principal components
/// 5. optionally scale component `k` by `sqrt(var_k / var_max)`
///
/// The embedding has `min(npcs, rank)` columns.
pub fn project(
    xx: &Mat,
    weights: &DVec,
    args: &ProjectionArgs,
) -> anyhow::Result<WeightedProjection> {
    let (nn, ngenes) = xx.shape();

    if weights.len() != ngenes {
        return Err(SamError::InvalidParameter(format!(
            "{} weights for {} genes",
            weights.len(),
            ngenes
        ))
        .into());
    }

    if args.npcs == 0 {
        return Err(SamError::InvalidParameter("npcs must be >= 1".into()).into());
    }

    if nn == 0 || ngenes == 0 {
        return Err(SamError::InsufficientData(format!(
            "cannot project a {} x {} matrix",
            nn, ngenes
        ))
        .into());
    }

    let subset_indices = match args.n_genes {
        Some(n_genes) => top_weighted_genes(weights, n_genes.max(1)),
        None => (0..ngenes).collect(),
    };

    let mut xs = xx.select_columns(subset_indices.iter());

    if args.preprocessing == Preprocessing::StandardScaler {
        xs.scale_columns_inplace();
        xs.apply(|x| *x = x.clamp(-MAX_ZSCORE, MAX_ZSCORE));
    }

    for (mut x_j, &g) in xs.column_iter_mut().zip(subset_indices.iter()) {
        x_j *= weights[g];
    }

    if args.preprocessing == Preprocessing::Normalizer {
        xs.normalize_rows_inplace();
    }

    xs.centre_columns_inplace();

    let max_rank = args.npcs.min(nn).min(subset_indices.len());
    let (u, d, _v) = xs.rsvd_seeded(max_rank, args.seed)?;

    let d_max = d.iter().copied().fold(0_f32, f32::max);
    let rank = d
        .iter()
        .take_while(|&&s| s > RANK_TOL * d_max)
        .count()
        .max(1)
        .min(d.len());

    let mut embedding = u.columns(0, rank).into_owned();
    for (k, mut z_k) in embedding.column_iter_mut().enumerate() {
        let scale = if args.weight_pcs {
            // s_k * sqrt(s_k^2 / s_max^2)
            if d_max > 0.0 {
                d[k] * d[k] / d_max
            } else {
                0.0
            }
        } else {
            d[k]
        };
        z_k *= scale;
    }

    let denom = (nn.max(2) - 1) as f32;
    let explained_variance = DVec::from_iterator(rank, d.iter().take(rank).map(|&s| s * s / denom));

    debug!(
        "weighted PCA: {} cells x {} genes -> {} components",
        nn,
        subset_indices.len(),
        rank
    );

    Ok(WeightedProjection {
        embedding,
        subset_indices,
        explained_variance,
    })
}
