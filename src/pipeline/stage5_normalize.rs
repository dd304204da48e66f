use thiserror::Error;
use tracing::info;

use crate::config::NormalizeSettings;
use crate::expr::csc::CellStats;
use crate::expr::normalize::Normalization;
use crate::expr::variable::{VariableFeatures, find_variable_features};
use crate::integrate::{IntegrationInput, select_integration_features};
use crate::model::dataset::Dataset;
use crate::pipeline::stage3_filter::FilteredDataset;
use crate::pipeline::{ErrorKind, StageFailure};

#[derive(Debug, Error)]
pub enum Stage5Error {
    #[error("dataset {0} has no variable genes")]
    NoVariableFeatures(String),
}

impl StageFailure for Stage5Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::EmptyResult
    }
}

/// A filtered dataset with its own library sizes and variable genes.
/// Normalized values are computed from `stats` on demand, never jointly
/// with other datasets.
#[derive(Debug, Clone)]
pub struct NormalizedDataset {
    pub dataset: Dataset,
    pub stats: Vec<CellStats>,
    pub norm: Normalization,
    pub variable: VariableFeatures,
}

impl NormalizedDataset {
    pub fn new(dataset: Dataset, norm: Normalization, n_variable: usize) -> Self {
        let stats = dataset.counts.cell_stats();
        let variable = find_variable_features(&dataset.counts, n_variable);
        Self {
            dataset,
            stats,
            norm,
            variable,
        }
    }

    /// Normalized `(gene, value)` pairs of one cell.
    pub fn cell_values(&self, cell: usize) -> Vec<(u32, f32)> {
        self.dataset
            .counts
            .iter_cell_norm(cell, &self.norm, &self.stats[cell])
            .collect()
    }
}

pub fn run_stage5(
    datasets: Vec<FilteredDataset>,
    settings: &NormalizeSettings,
) -> Result<IntegrationInput, Stage5Error> {
    let norm = Normalization::log_normalize(settings.scale);
    let n_genes = datasets.first().map_or(0, |d| d.dataset.n_genes());

    let mut normalized = Vec::with_capacity(datasets.len());
    for f in datasets {
        let nd = NormalizedDataset::new(f.dataset, norm.clone(), settings.n_variable_features);
        if nd.variable.ranked.is_empty() {
            return Err(Stage5Error::NoVariableFeatures(nd.dataset.label().to_string()));
        }
        info!(
            dataset = nd.dataset.label(),
            variable = nd.variable.ranked.len(),
            "variable features selected"
        );
        normalized.push(nd);
    }

    let ranked: Vec<Vec<usize>> = normalized.iter().map(|d| d.variable.ranked.clone()).collect();
    let features = select_integration_features(&ranked, n_genes, settings.n_variable_features);
    info!(features = features.len(), "integration features selected");

    Ok(IntegrationInput {
        datasets: normalized,
        features,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_normalize.rs"]
mod tests;
