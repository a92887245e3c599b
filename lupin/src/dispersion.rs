use crate::error::SamError;
use crate::sam_common::*;

/// Genes ranked by the dispersion of their neighbour-averaged
/// expression
#[derive(Debug, Clone)]
pub struct DispersionRanking {
    /// gene indices by descending weight, ties by ascending index
    pub ranked_indices: Vec<usize>,
    /// min-max normalized square-root dispersions in [0, 1]
    pub weights: DVec,
    /// variance / mean of each gene before capping
    pub dispersions: DVec,
    /// kNN-averaged expression (cells x genes)
    pub averaged: Mat,
}

/// Average every cell's expression over its neighbours:
/// `A X / rowsum(A)`
pub fn knn_average(xx: &Mat, adjacency: &CsrMat) -> anyhow::Result<Mat> {
    let nn = xx.nrows();

    if adjacency.nrows() != nn || adjacency.ncols() != nn {
        return Err(SamError::InvalidParameter(format!(
            "adjacency is {} x {}, expected {} x {}",
            adjacency.nrows(),
            adjacency.ncols(),
            nn,
            nn
        ))
        .into());
    }

    let row_sums: Vec<f32> = adjacency
        .row_iter()
        .map(|row| row.values().iter().sum::<f32>())
        .collect();

    if let Some(cell) = row_sums.iter().position(|&s| !(s > 0.0)) {
        return Err(SamError::DegenerateNeighborhood { cell }.into());
    }

    let mut averaged: Mat = adjacency * xx;
    for (mut row, &denom) in averaged.row_iter_mut().zip(row_sums.iter()) {
        row /= denom;
    }
    Ok(averaged)
}

/// Per-column `variance / mean` over the rows; columns with zero mean
/// get 0
pub fn column_dispersions(xx: &Mat) -> DVec {
    let nn = xx.nrows().max(1) as f32;
    DVec::from_iterator(
        xx.ncols(),
        xx.column_iter().map(|x_j| {
            let mu = x_j.sum() / nn;
            if mu > 0.0 {
                let var = x_j.iter().map(|&x| (x - mu) * (x - mu)).sum::<f32>() / nn;
                var / mu
            } else {
                0.0
            }
        }),
    )
}

/// Cap every value at the mean of the `num_norm_avg` largest ones
pub fn cap_top_values(values: &DVec, num_norm_avg: usize) -> DVec {
    if values.is_empty() {
        return values.clone();
    }

    let mut sorted: Vec<f32> = values.iter().copied().collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let ntop = num_norm_avg.clamp(1, sorted.len());
    let cap = sorted[..ntop].iter().sum::<f32>() / ntop as f32;

    values.map(|v| v.min(cap))
}

/// Min-max normalize `sqrt(values)` into [0, 1]. If every value is the
/// same, every weight is 1.
pub fn sqrt_minmax_weights(values: &DVec) -> DVec {
    let ww = values.map(|v| v.max(0.0).sqrt());

    let lo = ww.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = ww.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if hi > lo {
        ww.map(|w| (w - lo) / (hi - lo))
    } else {
        DVec::from_element(ww.len(), 1.0)
    }
}

/// Gene indices by descending weight; ties keep the ascending index
/// order
pub fn rank_by_weight(weights: &DVec) -> Vec<usize> {
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| {
        weights[b]
            .partial_cmp(&weights[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// Rank genes by neighbour-averaged dispersion.
///
/// * `xx` - expression (cells x genes)
/// * `adjacency` - kNN adjacency (cells x cells)
/// * `num_norm_avg` - the largest dispersions are capped at the mean
///   of this many top values before the weights are normalized
pub fn rank_dispersion(
    xx: &Mat,
    adjacency: &CsrMat,
    num_norm_avg: usize,
) -> anyhow::Result<DispersionRanking> {
    let averaged = knn_average(xx, adjacency)?;
    let dispersions = column_dispersions(&averaged);
    let capped = cap_top_values(&dispersions, num_norm_avg);
    let weights = sqrt_minmax_weights(&capped);
    let ranked_indices = rank_by_weight(&weights);

    Ok(DispersionRanking {
        ranked_indices,
        weights,
        dispersions,
        averaged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn ring_adjacency(nn: usize) -> CsrMat {
        // cell i -> i + 1 (mod n)
        let row_offsets = (0..=nn).collect();
        let col_indices = (0..nn).map(|i| (i + 1) % nn).collect();
        CsrMat::try_from_csr_data(nn, nn, row_offsets, col_indices, vec![1.0; nn]).unwrap()
    }

    #[test]
    fn averaging_follows_the_graph() -> anyhow::Result<()> {
        let xx = Mat::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let avg = knn_average(&xx, &ring_adjacency(3))?;
        assert_eq!(avg.as_slice(), &[2.0, 3.0, 1.0]);
        Ok(())
    }

    #[test]
    fn isolated_cell_is_degenerate() {
        let adj = CsrMat::try_from_csr_data(
            3,
            3,
            vec![0, 1, 1, 2],
            vec![1, 0],
            vec![1.0, 1.0],
        )
        .unwrap();
        let xx = Mat::from_element(3, 2, 1.0);

        let err = knn_average(&xx, &adj).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SamError>(),
            Some(&SamError::DegenerateNeighborhood { cell: 1 })
        );
    }

    #[test]
    fn zero_mean_gene_has_zero_dispersion() {
        let xx = Mat::from_row_slice(4, 2, &[0.0, 1.0, 0.0, 3.0, 0.0, 1.0, 0.0, 3.0]);
        let disp = column_dispersions(&xx);
        assert_eq!(disp[0], 0.0);
        // mean 2, variance 1
        assert_abs_diff_eq!(disp[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn capping_and_weights() {
        let disp = DVec::from_vec(vec![0.0, 1.0, 4.0, 16.0]);

        let capped = cap_top_values(&disp, 2);
        assert_eq!(capped.as_slice(), &[0.0, 1.0, 4.0, 10.0]);

        let ww = sqrt_minmax_weights(&DVec::from_vec(vec![1.0, 4.0, 9.0]));
        assert_abs_diff_eq!(ww[0], 0.0);
        assert_abs_diff_eq!(ww[1], 0.5);
        assert_eq!(ww[2], 1.0);

        let flat = sqrt_minmax_weights(&DVec::from_element(5, 0.3));
        assert!(flat.iter().all(|&w| w == 1.0));
    }

    #[test]
    fn ranking_is_stable() {
        let ww = DVec::from_vec(vec![0.5, 1.0, 0.5, 1.0, 0.0]);
        assert_eq!(rank_by_weight(&ww), vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn variable_gene_ranks_first() -> anyhow::Result<()> {
        // gene 0 separates {0,1,2} from {3,4,5}; gene 1 flips every cell
        let xx = Mat::from_row_slice(
            6,
            2,
            &[5.0, 1.0, 5.0, 2.0, 5.0, 1.0, 0.0, 2.0, 0.0, 1.0, 0.0, 2.0],
        );
        // neighbours stay within each triple
        let adj = CsrMat::try_from_csr_data(
            6,
            6,
            vec![0, 2, 4, 6, 8, 10, 12],
            vec![1, 2, 0, 2, 0, 1, 4, 5, 3, 5, 3, 4],
            vec![1.0; 12],
        )
        .unwrap();

        let ranking = rank_dispersion(&xx, &adj, 1)?;
        assert_eq!(ranking.ranked_indices, vec![0, 1]);
        assert_eq!(ranking.weights[0], 1.0);
        assert_eq!(ranking.weights[1], 0.0);
        assert!(ranking.dispersions[0] > ranking.dispersions[1]);
        Ok(())
    }
}
