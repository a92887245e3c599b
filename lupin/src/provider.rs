use crate::error::SamError;
use crate::sam_common::*;
use crate::sam_loop::SamOutput;

/// Post-hoc low-dimensional layout of the cells of a finished run.
///
/// The SAM core never calls a provider; UMAP, t-SNE or clustering
/// back-ends implement this and are handed a `SamOutput`.
pub trait EmbeddingProvider {
    fn name(&self) -> &str;

    /// cells x dimensions layout
    fn embed(&self, sam: &SamOutput) -> anyhow::Result<Mat>;
}

/// The leading `dim` weighted principal components
#[derive(Debug, Clone, Copy)]
pub struct LeadingComponents {
    pub dim: usize,
}

impl LeadingComponents {
    pub fn new(dim: usize) -> anyhow::Result<Self> {
        if dim == 0 {
            return Err(SamError::InvalidParameter("layout dimension must be >= 1".into()).into());
        }
        Ok(Self { dim })
    }
}

impl EmbeddingProvider for LeadingComponents {
    fn name(&self) -> &str {
        "leading-components"
    }

    fn embed(&self, sam: &SamOutput) -> anyhow::Result<Mat> {
        if self.dim == 0 {
            return Err(SamError::InvalidParameter("layout dimension must be >= 1".into()).into());
        }

        let ncomp = sam.embedding.ncols();
        let dim = self.dim.min(ncomp);
        if dim < self.dim {
            warn!(
                "only {} components available; layout has {} instead of {} dimensions",
                ncomp, dim, self.dim
            );
        }

        Ok(sam.embedding.columns(0, dim).into_owned())
    }
}
