use crate::error::SamError;
use crate::sam_common::*;
use rayon::prelude::*;

/// Directed k-nearest-neighbour graph over cells.
///
/// Row `i` of `adjacency` holds weight 1 for each of the `knn`
/// closest other cells of `i`; the matrix need not be symmetric.
#[derive(Debug, Clone)]
pub struct NeighborGraph {
    pub adjacency: CsrMat,
    pub knn: usize,
}

impl NeighborGraph {
    pub fn num_cells(&self) -> usize {
        self.adjacency.nrows()
    }

    /// Neighbours of a cell, in ascending index order
    pub fn neighbors(&self, cell: usize) -> &[usize] {
        let offsets = self.adjacency.row_offsets();
        &self.adjacency.col_indices()[offsets[cell]..offsets[cell + 1]]
    }

    pub fn row_sums(&self) -> DVec {
        DVec::from_iterator(
            self.num_cells(),
            self.adjacency
                .row_iter()
                .map(|row| row.values().iter().sum::<f32>()),
        )
    }

    pub fn to_dense(&self) -> Mat {
        let mut ret = Mat::zeros(self.num_cells(), self.num_cells());
        for (i, j, &w) in self.adjacency.triplet_iter() {
            ret[(i, j)] = w;
        }
        ret
    }
}

/// Clamp `k` into `[1, n_cells - 1]`, warning when the requested value
/// is too large
pub fn effective_knn(knn: usize, n_cells: usize) -> usize {
    let max_knn = n_cells.saturating_sub(1).max(1);
    if knn > max_knn {
        warn!(
            "knn = {} exceeds n_cells - 1 = {}; using knn = {}",
            knn, max_knn, max_knn
        );
        max_knn
    } else {
        knn.max(1)
    }
}

/// Build a directed kNN graph from a square distance matrix.
///
/// For each cell, the `knn` closest other cells are selected; ties are
/// broken by the smaller index and the cell itself is never selected.
/// NaN distances sort last.
///
/// * `distance` - symmetric `n x n` distance matrix
/// * `knn` - neighbours per cell, clamped to `n - 1`
pub fn build_knn(distance: &Mat, knn: usize) -> anyhow::Result<NeighborGraph> {
    let nn = distance.nrows();

    if distance.ncols() != nn {
        return Err(SamError::InvalidParameter(format!(
            "distance matrix must be square, got {} x {}",
            nn,
            distance.ncols()
        ))
        .into());
    }

    if nn < 2 {
        return Err(SamError::InsufficientData(format!(
            "{} cell(s); a neighbourhood graph needs at least 2",
            nn
        ))
        .into());
    }

    if knn == 0 {
        return Err(SamError::InvalidParameter("knn must be >= 1".into()).into());
    }

    let knn = effective_knn(knn, nn);

    let neighbours: Vec<Vec<usize>> = (0..nn)
        .into_par_iter()
        .map(|i| {
            let mut others: Vec<(usize, f32)> = (0..nn)
                .filter(|&j| j != i)
                .map(|j| {
                    let d = distance[(i, j)];
                    (j, if d.is_nan() { f32::INFINITY } else { d })
                })
                .collect();

            // stable sort: equal distances keep ascending index order
            others.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            let mut nbrs: Vec<usize> = others.into_iter().take(knn).map(|(j, _)| j).collect();
            nbrs.sort_unstable();
            nbrs
        })
        .collect();

    let row_offsets: Vec<usize> = (0..=nn).map(|i| i * knn).collect();
    let col_indices: Vec<usize> = neighbours.into_iter().flatten().collect();
    let values = vec![1_f32; col_indices.len()];

    let adjacency = CsrMat::try_from_csr_data(nn, nn, row_offsets, col_indices, values)
        .map_err(|e| anyhow::anyhow!("failed to build kNN adjacency: {}", e))?;

    debug!("kNN graph: {} cells x {} neighbours", nn, knn);

    Ok(NeighborGraph { adjacency, knn })
}
