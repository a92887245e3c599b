pub use log::{debug, info, warn};

pub type Mat = nalgebra::DMatrix<f32>;
pub type DVec = nalgebra::DVector<f32>;
pub type CsrMat = nalgebra_sparse::CsrMatrix<f32>;

/// Fewest cells for which a kNN graph with `k >= 1` leaves room for
/// `k + 2` cells
pub const MIN_CELLS: usize = 3;

pub const DEFAULT_MAX_ITER: usize = 15;
pub const DEFAULT_STOPPING_CONDITION: f32 = 1e-5;
pub const DEFAULT_NUM_GENES: usize = 2000;
pub const DEFAULT_NPCS: usize = 150;
pub const DEFAULT_NUM_NORM_AVG: usize = 50;
pub const DEFAULT_SEED: u64 = 42;

pub const AUTO_KNN_MIN: usize = 5;
pub const AUTO_KNN_MAX: usize = 100;
