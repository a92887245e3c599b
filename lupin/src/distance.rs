use crate::error::SamError;
use crate::params::ConvergenceMetric;
use crate::sam_common::*;
use matrix_util::traits::MatOps;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Cell-to-cell distance under a named metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - pearson(x, y)`
    #[default]
    Correlation,
    /// `1 - x'y / (|x| |y|)`
    Cosine,
    /// `|x - y|`
    Euclidean,
}

impl FromStr for DistanceMetric {
    type Err = SamError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "correlation" => Ok(Self::Correlation),
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            _ => Err(SamError::UnsupportedMetric(name.to_string())),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Correlation => "correlation",
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        };
        write!(f, "{}", name)
    }
}

/// Pairwise distances between the rows of `xx` (cells x features).
///
/// The result is symmetric with a zero diagonal. Under `Correlation`
/// and `Cosine`, a row with zero norm (after centring, for
/// correlation) has similarity 0 with everything, hence distance 1.
pub fn compute_distances(xx: &Mat, metric: DistanceMetric) -> Mat {
    let nn = xx.nrows();

    let mut dist = match metric {
        DistanceMetric::Correlation => {
            let mut zz = xx.clone();
            zz.centre_rows_inplace();
            zz.normalize_rows_inplace();
            let sim = &zz * zz.transpose();
            sim.map(|s| (1.0 - s).clamp(0.0, 2.0))
        }
        DistanceMetric::Cosine => {
            let zz = xx.normalize_rows();
            let sim = &zz * zz.transpose();
            sim.map(|s| (1.0 - s).clamp(0.0, 2.0))
        }
        DistanceMetric::Euclidean => {
            let gram = xx * xx.transpose();
            Mat::from_fn(nn, nn, |i, j| {
                (gram[(i, i)] + gram[(j, j)] - 2.0 * gram[(i, j)])
                    .max(0.0)
                    .sqrt()
            })
        }
    };

    // the product is symmetric up to rounding; make it exact
    for i in 0..nn {
        dist[(i, i)] = 0.0;
        for j in (i + 1)..nn {
            dist[(j, i)] = dist[(i, j)];
        }
    }
    dist
}

/// Same as `compute_distances`, looking the metric up by name
pub fn compute_distances_by_name(xx: &Mat, metric: &str) -> anyhow::Result<Mat> {
    let metric: DistanceMetric = metric.parse()?;
    Ok(compute_distances(xx, metric))
}

/// A random symmetric matrix with `U(0,1)` off-diagonal entries and
/// a zero diagonal, used to seed the first neighbourhood graph
pub fn random_distance_matrix<R: Rng>(nn: usize, rng: &mut R) -> Mat {
    let mut dist = Mat::zeros(nn, nn);
    for i in 0..nn {
        for j in (i + 1)..nn {
            let d = rng.random::<f32>();
            dist[(i, j)] = d;
            dist[(j, i)] = d;
        }
    }
    dist
}

/// How far apart two successive distance matrices are
///
/// * `MeanAbsolute` - `mean(|new - old|)` over all entries
/// * `RowCorrelation` - `1 - mean_i corr(new[i,:], old[i,:])`
pub fn distance_matrix_error(new: &Mat, old: &Mat, metric: ConvergenceMetric) -> f32 {
    debug_assert_eq!(new.shape(), old.shape());

    if new.is_empty() {
        return 0.0;
    }

    match metric {
        ConvergenceMetric::MeanAbsolute => {
            let tot: f64 = new
                .iter()
                .zip(old.iter())
                .map(|(&a, &b)| (a - b).abs() as f64)
                .sum();
            (tot / new.len() as f64) as f32
        }
        ConvergenceMetric::RowCorrelation => {
            let nn = new.nrows();
            let tot: f64 = (0..nn)
                .map(|i| {
                    let a = new.row(i).iter().copied().collect::<Vec<_>>();
                    let b = old.row(i).iter().copied().collect::<Vec<_>>();
                    row_correlation(&a, &b)
                })
                .sum();
            (1.0 - tot / nn as f64) as f32
        }
    }
}

/// Pearson correlation; a constant row correlates 1 with an identical
/// row and 0 with anything else
fn row_correlation(a: &[f32], b: &[f32]) -> f64 {
    let nn = a.len() as f64;
    let mu_a = a.iter().map(|&x| x as f64).sum::<f64>() / nn;
    let mu_b = b.iter().map(|&x| x as f64).sum::<f64>() / nn;

    let mut sab = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mu_a;
        let dy = y as f64 - mu_b;
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }

    if saa > 0.0 && sbb > 0.0 {
        sab / (saa * sbb).sqrt()
    } else if a == b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn three_cells() -> Mat {
        Mat::from_row_slice(
            3,
            4,
            &[
                1.0, 2.0, 3.0, 4.0, //
                2.0, 4.0, 6.0, 8.0, //
                4.0, 3.0, 2.0, 1.0, //
            ],
        )
    }

    #[test]
    fn correlation_distance() {
        let dist = compute_distances(&three_cells(), DistanceMetric::Correlation);
        assert_abs_diff_eq!(dist[(0, 1)], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(dist[(0, 2)], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(dist[(2, 1)], 2.0, epsilon = 1e-5);
        for i in 0..3 {
            assert_eq!(dist[(i, i)], 0.0);
        }
    }

    #[test]
    fn constant_rows_are_at_unit_distance() {
        let xx = Mat::from_row_slice(3, 3, &[1.0, 1.0, 1.0, 0.0, 1.0, 2.0, 2.0, 1.0, 0.0]);
        let dist = compute_distances(&xx, DistanceMetric::Correlation);
        assert_abs_diff_eq!(dist[(0, 1)], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(dist[(0, 2)], 1.0, epsilon = 1e-6);
        assert!(dist.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn euclidean_and_cosine_distance() {
        let xx = Mat::from_row_slice(2, 2, &[3.0, 0.0, 0.0, 4.0]);
        let dist = compute_distances(&xx, DistanceMetric::Euclidean);
        assert_abs_diff_eq!(dist[(0, 1)], 5.0, epsilon = 1e-5);

        let dist = compute_distances(&xx, DistanceMetric::Cosine);
        assert_abs_diff_eq!(dist[(0, 1)], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn metric_names() {
        assert_eq!("Correlation".parse::<DistanceMetric>(), Ok(DistanceMetric::Correlation));
        assert_eq!(" euclidean ".parse::<DistanceMetric>(), Ok(DistanceMetric::Euclidean));
        assert_eq!(
            "manhattan".parse::<DistanceMetric>(),
            Err(SamError::UnsupportedMetric("manhattan".to_string()))
        );

        let err = compute_distances_by_name(&three_cells(), "hamming").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SamError>(),
            Some(SamError::UnsupportedMetric(_))
        ));
    }

    #[test]
    fn random_seed_matrix_is_symmetric() {
        let dist = random_distance_matrix(6, &mut StdRng::seed_from_u64(1));
        assert_eq!(dist, dist.transpose());
        for i in 0..6 {
            assert_eq!(dist[(i, i)], 0.0);
        }
        assert!(dist.iter().all(|&d| (0.0..1.0).contains(&d)));
    }

    #[test]
    fn matrix_error_metrics() {
        let a = Mat::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let b = Mat::from_row_slice(2, 2, &[0.0, 0.5, 0.5, 0.0]);

        assert_eq!(distance_matrix_error(&a, &a, ConvergenceMetric::MeanAbsolute), 0.0);
        assert_abs_diff_eq!(
            distance_matrix_error(&a, &b, ConvergenceMetric::MeanAbsolute),
            0.25,
            epsilon = 1e-7
        );

        // same shape, different scale: rows are perfectly correlated
        assert_abs_diff_eq!(
            distance_matrix_error(&a, &b, ConvergenceMetric::RowCorrelation),
            0.0,
            epsilon = 1e-6
        );
    }
}
