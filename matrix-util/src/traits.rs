use crate::common_io::Delimiter;
use rand::Rng;

/// Normalize, scale or centre rows and columns
pub trait MatOps {
    type Mat;
    type Scalar;

    /// `X[,j] / max(1, norm(X[,j]))`
    fn normalize_columns_inplace(&mut self);

    /// Unit L2 norm for every row; all-zero rows stay zero
    fn normalize_rows_inplace(&mut self);
    fn normalize_rows(&self) -> Self::Mat;

    /// Standardize columns to zero mean and unit variance
    fn scale_columns_inplace(&mut self);
    fn scale_columns(&self) -> Self::Mat;

    fn centre_columns_inplace(&mut self);

    fn centre_rows_inplace(&mut self);
}

/// Operations to sample random matrices
pub trait SampleOps {
    type Mat;
    type Scalar;

    /// Sample a matrix from a uniform distribution `U(0,1)`
    fn runif(dd: usize, nn: usize) -> Self::Mat;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm(dd: usize, nn: usize) -> Self::Mat;

    /// `U(0,1)` matrix drawn from the given generator, so that a
    /// seeded generator reproduces the same matrix
    fn runif_with<R: Rng>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;

    /// `N(0,1)` matrix drawn from the given generator
    fn rnorm_with<R: Rng>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;
}

/// Read and write matrices from and to files
pub trait IoOps {
    type Scalar;
    type Mat;

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat>;

    /// Read a matrix whose first line holds column names
    fn read_file_delim_with_header(
        file: &str,
        delim: impl Into<Delimiter>,
    ) -> anyhow::Result<(Vec<Box<str>>, Self::Mat)>;

    fn write_file_delim(&self, file: &str, delim: &str) -> anyhow::Result<()>;

    /// Write a matrix with a first line of column names
    fn write_file_delim_with_header(
        &self,
        file: &str,
        header: &[Box<str>],
        delim: &str,
    ) -> anyhow::Result<()>;

    fn to_tsv(&self, tsv_file: &str) -> anyhow::Result<()> {
        self.write_file_delim(tsv_file, "\t")
    }
}
