use crate::traits::SampleOps;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;

type Mat = DMatrix<f32>;
type Vec = DVector<f32>;

pub trait RSVD {
    fn rsvd(&self, rank: usize) -> anyhow::Result<(Mat, Vec, Mat)>;

    /// Same as `rsvd`, but the random sketch is drawn from a seeded
    /// generator, so repeated calls give identical factors
    fn rsvd_seeded(&self, rank: usize, seed: u64) -> anyhow::Result<(Mat, Vec, Mat)>;
}

impl RSVD for Mat {
    fn rsvd(&self, rank: usize) -> anyhow::Result<(Mat, Vec, Mat)> {
        let default_iter = 5;
        let mut rsvd = RandomizedSVD::new(rank, default_iter);
        rsvd.compute(self)?;
        Ok(rsvd.into_factors())
    }

    fn rsvd_seeded(&self, rank: usize, seed: u64) -> anyhow::Result<(Mat, Vec, Mat)> {
        let default_iter = 5;
        let mut rsvd = RandomizedSVD::new(rank, default_iter).with_seed(seed);
        rsvd.compute(self)?;
        Ok(rsvd.into_factors())
    }
}

/// Randomized SVD
///
/// Implement Alg 4.4 of Halko et al. (2009)
/// Modified from https://github.com/kazuotani14/RandomizedSvd
///
/// Singular values come out in descending order.
pub struct RandomizedSVD {
    max_rank: usize,
    iter: usize,
    seed: Option<u64>,
    u_vectors: Mat,
    singular_values: Vec,
    v_vectors: Mat,
    qq: Mat,
}

impl RandomizedSVD {
    pub fn new(max_rank: usize, iter: usize) -> Self {
        Self {
            max_rank,
            iter,
            seed: None,
            u_vectors: Mat::zeros(0, 0),
            singular_values: Vec::zeros(0),
            v_vectors: Mat::zeros(0, 0),
            qq: Mat::zeros(0, 0),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn singular_values(&self) -> &Vec {
        &self.singular_values
    }

    pub fn into_factors(self) -> (Mat, Vec, Mat) {
        (self.u_vectors, self.singular_values, self.v_vectors)
    }

    pub fn compute(&mut self, xx: &Mat) -> anyhow::Result<()> {
        let nr = xx.nrows();
        let nc = xx.ncols();

        let mut rank = nr.min(nc);
        let mut oversample = 0;

        if rank == 0 {
            anyhow::bail!("RandomizedSVD on an empty [{} x {}] matrix", nr, nc);
        }

        if self.max_rank > 0 && rank > self.max_rank {
            rank = self.max_rank;
            oversample = 5;
        }

        self.rand_subspace_iteration(xx, rank + oversample);

        let rank = rank.min(self.qq.ncols());
        self.qq = self.qq.columns(0, rank).into_owned();

        let bb = self.qq.transpose() * xx;

        log::debug!("Final svd on [{} x {}]", bb.nrows(), bb.ncols());

        let svd = bb.svd(true, true);

        if let (Some(svd_u), Some(svd_vt)) = (svd.u, svd.v_t) {
            // keep the leading components in descending order
            let mut order: std::vec::Vec<usize> = (0..svd.singular_values.len()).collect();
            order.sort_by(|&a, &b| {
                svd.singular_values[b]
                    .partial_cmp(&svd.singular_values[a])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            order.truncate(rank);

            let svd_u = svd_u.select_columns(order.iter());
            let svd_v = svd_vt.transpose().select_columns(order.iter());

            self.u_vectors = &self.qq * svd_u;
            self.v_vectors = svd_v;
            self.singular_values = Vec::from_iterator(
                order.len(),
                order.iter().map(|&k| svd.singular_values[k]),
            );
        } else {
            anyhow::bail!("SVD failed");
        }

        log::debug!("Done: RandomizedSVD.compute()");
        Ok(())
    }

    // Find an orthonormal matrix qq whose range approximates the range of xx
    fn rand_subspace_iteration(&mut self, xx: &Mat, rank_and_oversample: usize) {
        let nc = xx.ncols();

        let omega = match self.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                Mat::rnorm_with(nc, rank_and_oversample, &mut rng)
            }
            None => Mat::rnorm(nc, rank_and_oversample),
        };

        let mut qq = (xx * omega).qr().q();

        for i in 0..self.iter {
            log::trace!("power iteration {:>10}", i + 1);
            let zz = (xx.transpose() * &qq).qr().q();
            qq = (xx * zz).qr().q();
        }

        let kk = rank_and_oversample.min(qq.ncols());
        self.qq = qq.columns(0, kk).into_owned();

        log::debug!("Found Q [{} x {}]", self.qq.nrows(), self.qq.ncols());
    }
}
