use crate::dispersion::{rank_dispersion, DispersionRanking};
use crate::distance::{
    compute_distances, distance_matrix_error, random_distance_matrix, DistanceMetric,
};
use crate::error::SamError;
use crate::knn::{build_knn, NeighborGraph};
use crate::params::{ResolvedParams, SamParams};
use crate::projection::{project, ProjectionArgs, WeightedProjection};
use crate::sam_common::*;
use matrix_util::traits::MatOps;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Init,
    Iterating,
    Converged,
    MaxIterReached,
}

/// Everything one pass of the loop produces. A pass reads the
/// previous record and returns a new one; nothing is updated in place.
#[derive(Debug, Clone)]
pub struct IterationState {
    /// 0 for the random initial state
    pub iteration: usize,
    pub distance: Mat,
    pub graph: NeighborGraph,
    /// ranking computed on the previous graph (None at init)
    pub ranking: Option<DispersionRanking>,
    pub projection: Option<WeightedProjection>,
    /// distance-matrix change against the previous pass (None at init)
    pub error: Option<f32>,
}

/// Final snapshot of a SAM run
#[derive(Debug, Clone)]
pub struct SamOutput {
    /// gene indices by descending weight
    pub ranked_gene_indices: Vec<usize>,
    pub gene_weights: DVec,
    /// neighbour-averaged variance / mean before capping
    pub gene_dispersions: DVec,
    pub nearest_neighbor_graph: NeighborGraph,
    pub distance_matrix: Mat,
    /// cells x components
    pub embedding: Mat,
    /// genes that entered the last projection
    pub subset_indices: Vec<usize>,
    pub explained_variance: DVec,
    pub iterations_run: usize,
    pub final_error: f32,
    pub state: LoopState,
    pub params: ResolvedParams,
    /// error of every pass, in order
    pub error_trace: Vec<f32>,
}

impl SamOutput {
    pub fn nearest_neighbor_matrix(&self) -> &CsrMat {
        &self.nearest_neighbor_graph.adjacency
    }

    pub fn converged(&self) -> bool {
        self.state == LoopState::Converged
    }
}

/// Self-Assembling Manifolds on a cells x genes expression matrix
pub struct Sam<'a> {
    xx: &'a Mat,
    params: ResolvedParams,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Sam<'a> {
    /// Validate `params` against the matrix shape. Impossible
    /// configurations fail here, before any iteration.
    pub fn new(xx: &'a Mat, params: &SamParams) -> anyhow::Result<Self> {
        let params = params.resolve(xx.nrows(), xx.ncols())?;

        if xx.iter().any(|x| !x.is_finite()) {
            return Err(SamError::InvalidParameter(
                "expression matrix contains NaN or infinite values".into(),
            )
            .into());
        }

        Ok(Self {
            xx,
            params,
            cancel: None,
        })
    }

    /// Abort the run with `SamError::Cancelled` once `flag` is set.
    /// The flag is read at the start of every iteration.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn params(&self) -> &ResolvedParams {
        &self.params
    }

    /// Random symmetric distances and the kNN graph built on them
    pub fn init(&self) -> anyhow::Result<IterationState> {
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let distance = random_distance_matrix(self.xx.nrows(), &mut rng);
        let graph = build_knn(&distance, self.params.knn)?;

        Ok(IterationState {
            iteration: 0,
            distance,
            graph,
            ranking: None,
            projection: None,
            error: None,
        })
    }

    /// rank genes -> weighted PCA -> distances -> kNN graph
    pub fn step(&self, prev: &IterationState) -> anyhow::Result<IterationState> {
        let params = &self.params;
        let iteration = prev.iteration + 1;

        let ranking = rank_dispersion(self.xx, &prev.graph.adjacency, params.num_norm_avg)?;

        let projection = project(
            self.xx,
            &ranking.weights,
            &ProjectionArgs {
                n_genes: params.n_genes,
                npcs: params.npcs,
                weight_pcs: params.weight_pcs,
                preprocessing: params.preprocessing,
                seed: params.seed.wrapping_add(iteration as u64),
            },
        )?;

        let distance = match params.metric {
            DistanceMetric::Euclidean => {
                compute_distances(&projection.embedding.normalize_rows(), params.metric)
            }
            _ => compute_distances(&projection.embedding, params.metric),
        };

        let graph = build_knn(&distance, params.knn)?;
        let error = distance_matrix_error(&distance, &prev.distance, params.convergence);

        Ok(IterationState {
            iteration,
            distance,
            graph,
            ranking: Some(ranking),
            projection: Some(projection),
            error: Some(error),
        })
    }

    /// Iterate until the distance matrix settles or `max_iter` passes
    /// have run
    pub fn run(&self) -> anyhow::Result<SamOutput> {
        let params = &self.params;

        info!(
            "SAM on {} cells x {} genes: knn = {}, metric = {}, max_iter = {}",
            self.xx.nrows(),
            self.xx.ncols(),
            params.knn,
            params.metric,
            params.max_iter
        );

        let mut loop_state = LoopState::Init;
        let mut current = self.init()?;
        let mut error_trace = Vec::with_capacity(params.max_iter);

        loop_state = self.transition(loop_state, LoopState::Iterating);

        while current.iteration < params.max_iter {
            if self.is_cancelled() {
                return Err(SamError::Cancelled {
                    iteration: current.iteration + 1,
                }
                .into());
            }

            let next = self.step(&current)?;
            let err = next.error.unwrap_or(f32::INFINITY);
            error_trace.push(err);

            info!(
                "iteration {:>3} / {}: error = {:.6e}",
                next.iteration, params.max_iter, err
            );

            current = next;

            if err <= params.stopping_condition {
                loop_state = self.transition(loop_state, LoopState::Converged);
                break;
            }
        }

        if loop_state == LoopState::Iterating {
            loop_state = self.transition(loop_state, LoopState::MaxIterReached);
            warn!(
                "stopped after {} iterations without reaching {:e}",
                params.max_iter, params.stopping_condition
            );
        }

        self.finish(current, loop_state, error_trace)
    }

    fn transition(&self, from: LoopState, to: LoopState) -> LoopState {
        debug!("{:?} -> {:?}", from, to);
        to
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn finish(
        &self,
        last: IterationState,
        state: LoopState,
        error_trace: Vec<f32>,
    ) -> anyhow::Result<SamOutput> {
        let IterationState {
            iteration,
            distance,
            graph,
            ranking,
            projection,
            error,
        } = last;

        let ranking =
            ranking.ok_or_else(|| anyhow::anyhow!("SAM finished without a gene ranking"))?;
        let projection =
            projection.ok_or_else(|| anyhow::anyhow!("SAM finished without an embedding"))?;

        Ok(SamOutput {
            ranked_gene_indices: ranking.ranked_indices,
            gene_weights: ranking.weights,
            gene_dispersions: ranking.dispersions,
            nearest_neighbor_graph: graph,
            distance_matrix: distance,
            embedding: projection.embedding,
            subset_indices: projection.subset_indices,
            explained_variance: projection.explained_variance,
            iterations_run: iteration,
            final_error: error.unwrap_or(f32::INFINITY),
            state,
            params: self.params.clone(),
            error_trace,
        })
    }
}

/// Run SAM with `params` on `xx` (cells x genes)
pub fn run_sam(xx: &Mat, params: &SamParams) -> anyhow::Result<SamOutput> {
    Sam::new(xx, params)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{simulate_clustered_expression, SimArgs};

    fn small_params() -> SamParams {
        SamParams {
            n_genes: Some(40),
            npcs: 10,
            num_norm_avg: 5,
            knn: Some(5),
            ..Default::default()
        }
    }

    fn small_data() -> Mat {
        simulate_clustered_expression(&SimArgs {
            cells: 30,
            genes: 60,
            signal_genes: 6,
            groups: 3,
            seed: 11,
        })
        .expression
    }

    #[test]
    fn init_is_seeded() -> anyhow::Result<()> {
        let xx = small_data();
        let sam = Sam::new(&xx, &small_params())?;
        let s1 = sam.init()?;
        let s2 = sam.init()?;

        assert_eq!(s1.iteration, 0);
        assert!(s1.ranking.is_none() && s1.error.is_none());
        assert_eq!(s1.distance, s2.distance);
        assert_eq!(s1.graph.to_dense(), s2.graph.to_dense());
        Ok(())
    }

    #[test]
    fn step_does_not_touch_its_input() -> anyhow::Result<()> {
        let xx = small_data();
        let sam = Sam::new(&xx, &small_params())?;
        let s0 = sam.init()?;
        let before = s0.distance.clone();

        let s1 = sam.step(&s0)?;
        assert_eq!(s0.distance, before);
        assert_eq!(s1.iteration, 1);
        assert!(s1.error.is_some_and(|e| e >= 0.0));
        assert_eq!(s1.distance.shape(), (30, 30));

        let s2 = sam.step(&s1)?;
        assert_eq!(s2.iteration, 2);
        Ok(())
    }

    #[test]
    fn cancelled_before_first_iteration() -> anyhow::Result<()> {
        let xx = small_data();
        let flag = Arc::new(AtomicBool::new(true));
        let sam = Sam::new(&xx, &small_params())?.with_cancel_flag(flag);

        let err = sam.run().unwrap_err();
        assert_eq!(
            err.downcast_ref::<SamError>(),
            Some(&SamError::Cancelled { iteration: 1 })
        );
        Ok(())
    }

    #[test]
    fn trace_matches_iterations() -> anyhow::Result<()> {
        let xx = small_data();
        let out = run_sam(&xx, &small_params())?;

        assert_eq!(out.error_trace.len(), out.iterations_run);
        assert_eq!(out.error_trace.last().copied(), Some(out.final_error));
        assert!(out.iterations_run >= 1 && out.iterations_run <= out.params.max_iter);
        assert_eq!(out.converged(), out.final_error <= out.params.stopping_condition);
        Ok(())
    }

    #[test]
    fn cell_without_neighbours_aborts_the_step() -> anyhow::Result<()> {
        let xx = small_data();
        let nn = xx.nrows();
        let sam = Sam::new(&xx, &small_params())?;

        // cell i -> i + 1 (mod n), except cell 4 which has no edge
        let isolated = 4;
        let mut row_offsets = vec![0];
        let mut col_indices = vec![];
        for i in 0..nn {
            if i != isolated {
                col_indices.push((i + 1) % nn);
            }
            row_offsets.push(col_indices.len());
        }
        let values = vec![1.0; col_indices.len()];
        let adjacency = CsrMat::try_from_csr_data(nn, nn, row_offsets, col_indices, values)
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        let state = IterationState {
            iteration: 0,
            distance: Mat::zeros(nn, nn),
            graph: NeighborGraph { adjacency, knn: 1 },
            ranking: None,
            projection: None,
            error: None,
        };

        let err = sam.step(&state).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SamError>(),
            Some(&SamError::DegenerateNeighborhood { cell: isolated })
        );
        Ok(())
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let mut xx = small_data();
        xx[(2, 3)] = f32::NAN;
        let err = Sam::new(&xx, &small_params()).err();
        assert!(matches!(
            err.as_ref().and_then(|e| e.downcast_ref::<SamError>()),
            Some(SamError::InvalidParameter(_))
        ));
    }
}
