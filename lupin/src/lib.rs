//! Self-Assembling Manifolds (SAM)
//!
//! Iteratively reweight genes by the dispersion of their
//! nearest-neighbour averaged expression, re-embed the cells with a
//! weighted PCA, and rebuild the kNN graph until the cell-cell
//! distances stop changing.

pub mod dispersion;
pub mod distance;
pub mod error;
pub mod knn;
pub mod output;
pub mod params;
pub mod projection;
pub mod provider;
pub mod sam_common;
pub mod sam_loop;
pub mod simulate;

pub use error::SamError;
pub use params::{ConvergenceMetric, Preprocessing, ResolvedParams, SamParams};
pub use provider::{EmbeddingProvider, LeadingComponents};
pub use sam_loop::{run_sam, LoopState, Sam, SamOutput};
