use thiserror::Error;

/// Failures of the SAM core.
///
/// Every operation returns `anyhow::Result`; callers recover the
/// variant with `err.downcast_ref::<SamError>()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SamError {
    #[error("unsupported distance metric `{0}` (expected correlation, cosine or euclidean)")]
    UnsupportedMetric(String),

    #[error("cell {cell} has no neighbours in the adjacency matrix")]
    DegenerateNeighborhood { cell: usize },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("cancelled before iteration {iteration}")]
    Cancelled { iteration: usize },
}
