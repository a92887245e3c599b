use crate::traits::*;
pub use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

impl SampleOps for DMatrix<f32> {
    type Mat = Self;
    type Scalar = f32;

    fn runif(dd: usize, nn: usize) -> Self::Mat {
        let rvec = (0..(dd * nn))
            .into_par_iter()
            .map_init(rand::rng, |rng, _| rng.random::<f32>())
            .collect();

        DMatrix::<f32>::from_vec(dd, nn, rvec)
    }

    fn rnorm(dd: usize, nn: usize) -> Self::Mat {
        let rvec = (0..(dd * nn))
            .into_par_iter()
            .map_init(rand::rng, |rng, _| rng.sample::<f32, _>(StandardNormal))
            .collect();

        DMatrix::<f32>::from_vec(dd, nn, rvec)
    }

    fn runif_with<R: Rng>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        DMatrix::<f32>::from_fn(dd, nn, |_, _| rng.random::<f32>())
    }

    fn rnorm_with<R: Rng>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        DMatrix::<f32>::from_fn(dd, nn, |_, _| rng.sample::<f32, _>(StandardNormal))
    }
}

impl MatOps for DMatrix<f32> {
    type Mat = Self;
    type Scalar = f32;

    fn normalize_columns_inplace(&mut self) {
        for mut xx_j in self.column_iter_mut() {
            let denom = xx_j.norm().max(1.0);
            xx_j /= denom;
        }
    }

    fn normalize_rows_inplace(&mut self) {
        for mut xx_i in self.row_iter_mut() {
            let denom = xx_i.norm();
            if denom > 0.0 {
                xx_i /= denom;
            }
        }
    }

    fn normalize_rows(&self) -> Self::Mat {
        let mut ret = self.clone();
        ret.normalize_rows_inplace();
        ret
    }

    fn scale_columns_inplace(&mut self) {
        let nn = self.nrows() as f32;
        if nn < 1.0 {
            return;
        }
        for mut xx_j in self.column_iter_mut() {
            let mu = xx_j.sum() / nn;
            xx_j.add_scalar_mut(-mu);
            let sig = (xx_j.norm_squared() / nn).sqrt();
            if sig > 0.0 {
                xx_j /= sig;
            }
        }
    }

    fn scale_columns(&self) -> Self::Mat {
        let mut ret = self.clone();
        ret.scale_columns_inplace();
        ret
    }

    fn centre_columns_inplace(&mut self) {
        let nn = self.nrows() as f32;
        if nn < 1.0 {
            return;
        }
        for mut xx_j in self.column_iter_mut() {
            let mu = xx_j.sum() / nn;
            xx_j.add_scalar_mut(-mu);
        }
    }

    fn centre_rows_inplace(&mut self) {
        let dd = self.ncols() as f32;
        if dd < 1.0 {
            return;
        }
        for mut xx_i in self.row_iter_mut() {
            let mu = xx_i.sum() / dd;
            xx_i.add_scalar_mut(-mu);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn seeded_sampling_is_reproducible() {
        let xx = DMatrix::<f32>::rnorm_with(7, 3, &mut StdRng::seed_from_u64(11));
        let yy = DMatrix::<f32>::rnorm_with(7, 3, &mut StdRng::seed_from_u64(11));
        assert_eq!(xx, yy);

        let uu = DMatrix::<f32>::runif_with(7, 3, &mut StdRng::seed_from_u64(11));
        assert!(uu.iter().all(|&u| (0.0..1.0).contains(&u)));
    }

    #[test]
    fn rows_have_unit_norm_except_zero_rows() {
        let mut xx = DMatrix::<f32>::from_row_slice(3, 2, &[3.0, 4.0, 0.0, 0.0, 1.0, 1.0]);
        xx.normalize_rows_inplace();
        assert_abs_diff_eq!(xx.row(0).norm(), 1.0, epsilon = 1e-6);
        assert_eq!(xx.row(1).norm(), 0.0);
        assert_abs_diff_eq!(xx[(0, 0)], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(xx.row(2).norm(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn scaled_columns_are_standardized() {
        let xx = DMatrix::<f32>::runif_with(50, 4, &mut StdRng::seed_from_u64(3));
        let zz = xx.scale_columns();
        for z_j in zz.column_iter() {
            assert_abs_diff_eq!(z_j.mean(), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!((z_j.norm_squared() / 50.0).sqrt(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn centred_rows_sum_to_zero() {
        let mut xx = DMatrix::<f32>::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 5.0, 5.0, 8.0]);
        xx.centre_rows_inplace();
        for x_i in xx.row_iter() {
            assert_abs_diff_eq!(x_i.sum(), 0.0, epsilon = 1e-6);
        }
    }
}
