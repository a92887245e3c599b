use crate::sam_common::*;
use crate::sam_loop::SamOutput;
use matrix_util::common_io::{mkdir, write_lines};
use matrix_util::traits::IoOps;

impl SamOutput {
    /// Run summary: convergence diagnostics and the parameters used
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "state": self.state,
            "iterations_run": self.iterations_run,
            "final_error": self.final_error,
            "error_trace": self.error_trace,
            "num_cells": self.distance_matrix.nrows(),
            "num_genes": self.gene_weights.len(),
            "num_subset_genes": self.subset_indices.len(),
            "num_components": self.embedding.ncols(),
            "knn": self.nearest_neighbor_graph.knn,
            "explained_variance": self.explained_variance.as_slice(),
            "params": self.params,
        })
    }

    /// Write the results under `prefix`:
    ///
    /// * `{prefix}.ranked_genes.tsv.gz` - rank, gene index, gene name
    /// * `{prefix}.gene_weights.tsv.gz` - gene, weight, dispersion
    /// * `{prefix}.embedding.tsv.gz` - cells x components
    /// * `{prefix}.knn.tsv.gz` - directed edges as `row col weight`
    /// * `{prefix}.distance.tsv.gz` - only if `save_distance`
    /// * `{prefix}.summary.json`
    ///
    /// Genes are named `g{index}` unless `gene_names` is given.
    /// Returns the files written.
    pub fn write_all(
        &self,
        prefix: &str,
        gene_names: Option<&[Box<str>]>,
        save_distance: bool,
    ) -> anyhow::Result<Vec<Box<str>>> {
        let ngenes = self.gene_weights.len();

        let names: Vec<Box<str>> = match gene_names {
            Some(names) if names.len() == ngenes => names.to_vec(),
            Some(names) => {
                return Err(anyhow::anyhow!(
                    "{} gene names for {} genes",
                    names.len(),
                    ngenes
                ));
            }
            None => (0..ngenes)
                .map(|j| format!("g{}", j).into_boxed_str())
                .collect(),
        };

        mkdir(prefix)?;
        let mut written = vec![];

        let ranked_file = format!("{}.ranked_genes.tsv.gz", prefix);
        let mut lines: Vec<Box<str>> = vec!["rank\tgene_index\tgene".into()];
        lines.extend(
            self.ranked_gene_indices
                .iter()
                .enumerate()
                .map(|(r, &j)| format!("{}\t{}\t{}", r + 1, j, names[j]).into_boxed_str()),
        );
        write_lines(&lines, &ranked_file)?;
        written.push(ranked_file.into_boxed_str());

        let weights_file = format!("{}.gene_weights.tsv.gz", prefix);
        let mut lines: Vec<Box<str>> = vec!["gene\tweight\tdispersion".into()];
        lines.extend((0..ngenes).map(|j| {
            format!(
                "{}\t{}\t{}",
                names[j], self.gene_weights[j], self.gene_dispersions[j]
            )
            .into_boxed_str()
        }));
        write_lines(&lines, &weights_file)?;
        written.push(weights_file.into_boxed_str());

        let embedding_file = format!("{}.embedding.tsv.gz", prefix);
        self.embedding.to_tsv(&embedding_file)?;
        written.push(embedding_file.into_boxed_str());

        let knn_file = format!("{}.knn.tsv.gz", prefix);
        let lines: Vec<Box<str>> = self
            .nearest_neighbor_matrix()
            .triplet_iter()
            .map(|(i, j, w)| format!("{}\t{}\t{}", i, j, w).into_boxed_str())
            .collect();
        write_lines(&lines, &knn_file)?;
        written.push(knn_file.into_boxed_str());

        if save_distance {
            let distance_file = format!("{}.distance.tsv.gz", prefix);
            self.distance_matrix.to_tsv(&distance_file)?;
            written.push(distance_file.into_boxed_str());
        }

        let summary_file = format!("{}.summary.json", prefix);
        std::fs::write(&summary_file, serde_json::to_string_pretty(&self.summary())?)?;
        written.push(summary_file.into_boxed_str());

        for file in written.iter() {
            info!("wrote {}", file);
        }
        Ok(written)
    }
}
