use crate::distance::DistanceMetric;
use crate::error::SamError;
use crate::knn::effective_knn;
use crate::sam_common::*;
use serde::Serialize;

/// How the weighted gene subset is transformed before the PCA
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preprocessing {
    /// rescale every cell (row) to unit L2 norm
    #[default]
    Normalizer,
    /// z-score every gene (column), clipped to [-10, 10], before weighting
    StandardScaler,
    /// weighted expression as is
    None,
}

/// Distance between two successive cell-cell distance matrices
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvergenceMetric {
    /// mean absolute difference over all entries
    #[default]
    MeanAbsolute,
    /// one minus the average row-wise Pearson correlation
    RowCorrelation,
}

/// User-facing parameters of a SAM run
#[derive(Debug, Clone)]
pub struct SamParams {
    /// maximum number of reweighting iterations
    pub max_iter: usize,
    /// stop once the distance-matrix error drops to this value
    pub stopping_condition: f32,
    /// number of top-weighted genes fed to the PCA (None: all genes)
    pub n_genes: Option<usize>,
    /// number of principal components
    pub npcs: usize,
    /// number of top dispersions averaged into the cap
    pub num_norm_avg: usize,
    /// scale principal components by their explained variance
    pub weight_pcs: bool,
    /// nearest neighbours per cell (None: `round(sqrt(n_cells))` in [5, 100])
    pub knn: Option<usize>,
    /// distance metric name
    pub distance: Box<str>,
    pub preprocessing: Preprocessing,
    pub convergence: ConvergenceMetric,
    /// seeds the initial random distances and the randomized SVD
    pub seed: u64,
}

impl Default for SamParams {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            stopping_condition: DEFAULT_STOPPING_CONDITION,
            n_genes: Some(DEFAULT_NUM_GENES),
            npcs: DEFAULT_NPCS,
            num_norm_avg: DEFAULT_NUM_NORM_AVG,
            weight_pcs: true,
            knn: None,
            distance: "correlation".into(),
            preprocessing: Preprocessing::default(),
            convergence: ConvergenceMetric::default(),
            seed: DEFAULT_SEED,
        }
    }
}

/// Parameters after validation against the data shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParams {
    pub max_iter: usize,
    pub stopping_condition: f32,
    pub n_genes: Option<usize>,
    pub npcs: usize,
    pub num_norm_avg: usize,
    pub weight_pcs: bool,
    pub knn: usize,
    pub metric: DistanceMetric,
    pub preprocessing: Preprocessing,
    pub convergence: ConvergenceMetric,
    pub seed: u64,
}

impl SamParams {
    /// Validate the parameters for a `n_cells x n_genes` matrix.
    ///
    /// Settings with a sane fallback are adjusted with a warning (k is
    /// clamped to `n_cells - 1`, `n_genes` is raised to
    /// `2 * num_norm_avg` and capped at the number of genes);
    /// impossible ones fail before any iteration runs.
    pub fn resolve(&self, n_cells: usize, n_genes: usize) -> anyhow::Result<ResolvedParams> {
        let metric: DistanceMetric = self.distance.parse()?;

        if self.max_iter == 0 {
            return Err(SamError::InvalidParameter("max_iter must be >= 1".into()).into());
        }

        if self.npcs == 0 {
            return Err(SamError::InvalidParameter("npcs must be >= 1".into()).into());
        }

        if self.npcs < 2 && metric != DistanceMetric::Euclidean {
            warn!(
                "npcs = {}: {} distance on a one-dimensional embedding ignores magnitudes; \
                 most kNN choices will be ties",
                self.npcs, metric
            );
        }

        if self.num_norm_avg == 0 {
            return Err(SamError::InvalidParameter("num_norm_avg must be >= 1".into()).into());
        }

        if !(self.stopping_condition >= 0.0) {
            return Err(SamError::InvalidParameter(format!(
                "stopping_condition must be a non-negative number, got {}",
                self.stopping_condition
            ))
            .into());
        }

        if let Some(0) = self.knn {
            return Err(SamError::InvalidParameter("knn must be >= 1".into()).into());
        }

        if n_cells < MIN_CELLS {
            return Err(SamError::InsufficientData(format!(
                "{} cells; at least {} are needed for a neighbourhood graph",
                n_cells, MIN_CELLS
            ))
            .into());
        }

        let min_genes = 2 * self.num_norm_avg;
        if n_genes < min_genes {
            return Err(SamError::InsufficientData(format!(
                "{} genes; at least 2 x num_norm_avg = {} are needed",
                n_genes, min_genes
            ))
            .into());
        }

        let knn = match self.knn {
            Some(k) => k,
            None => {
                let k = ((n_cells as f32).sqrt().round() as usize)
                    .clamp(AUTO_KNN_MIN, AUTO_KNN_MAX);
                info!("knn set to {} for {} cells", k, n_cells);
                k
            }
        };
        let knn = effective_knn(knn, n_cells);

        let n_genes_kept = self.n_genes.map(|ng| {
            let ng = if ng < min_genes {
                warn!(
                    "n_genes {} is below 2 x num_norm_avg; raised to {}",
                    ng, min_genes
                );
                min_genes
            } else {
                ng
            };
            ng.min(n_genes)
        });

        Ok(ResolvedParams {
            max_iter: self.max_iter,
            stopping_condition: self.stopping_condition,
            n_genes: n_genes_kept,
            npcs: self.npcs,
            num_norm_avg: self.num_norm_avg,
            weight_pcs: self.weight_pcs,
            knn,
            metric,
            preprocessing: self.preprocessing,
            convergence: self.convergence,
            seed: self.seed,
        })
    }
}
