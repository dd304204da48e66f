use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::DatasetSpec;
use crate::model::dataset::Dataset;
use crate::model::qc::QcMetrics;
use crate::model::thresholds::FilterThresholds;
use crate::pipeline::{ErrorKind, StageFailure};

#[derive(Debug, Error)]
pub enum Stage3Error {
    #[error("dataset {label}: all {before} cells removed by the QC filter")]
    Empty { label: String, before: usize },
    #[error("dataset {0} has no QC metrics")]
    MissingQc(String),
    #[error("no filter thresholds configured for dataset {0}")]
    MissingThresholds(String),
}

impl StageFailure for Stage3Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Stage3Error::Empty { .. } => ErrorKind::EmptyResult,
            Stage3Error::MissingQc(_) | Stage3Error::MissingThresholds(_) => ErrorKind::Config,
        }
    }
}

/// A dataset reduced to the cells that passed its own thresholds.
#[derive(Debug, Clone)]
pub struct FilteredDataset {
    pub dataset: Dataset,
    pub thresholds: FilterThresholds,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellQcRecord {
    pub cell: String,
    pub qc: QcMetrics,
    pub kept: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterSummary {
    pub label: String,
    pub thresholds: FilterThresholds,
    pub cells_before: usize,
    pub cells_after: usize,
    #[serde(skip)]
    pub cells: Vec<CellQcRecord>,
}

#[derive(Debug)]
pub struct FilterOutput {
    pub datasets: Vec<FilteredDataset>,
    pub summaries: Vec<FilterSummary>,
}

pub fn filter_dataset(
    dataset: Dataset,
    thresholds: FilterThresholds,
) -> Result<(FilteredDataset, FilterSummary), Stage3Error> {
    let label = dataset.label().to_string();
    let qc = dataset
        .qc
        .as_ref()
        .ok_or_else(|| Stage3Error::MissingQc(label.clone()))?;

    let mut keep = Vec::with_capacity(qc.len());
    let mut cells = Vec::with_capacity(qc.len());
    for (idx, (metrics, id)) in qc.iter().zip(&dataset.cells).enumerate() {
        let kept = thresholds.keeps(metrics);
        if kept {
            keep.push(idx);
        }
        cells.push(CellQcRecord {
            cell: id.clone(),
            qc: *metrics,
            kept,
        });
    }

    let before = dataset.n_cells();
    if keep.is_empty() {
        return Err(Stage3Error::Empty { label, before });
    }
    info!(
        dataset = %label,
        before,
        after = keep.len(),
        "cells filtered"
    );

    let summary = FilterSummary {
        label,
        thresholds,
        cells_before: before,
        cells_after: keep.len(),
        cells,
    };
    let dataset = dataset.retain_cells(&keep);
    Ok((
        FilteredDataset {
            dataset,
            thresholds,
        },
        summary,
    ))
}

/// Applies each dataset's thresholds, matched by label.
pub fn run_stage3(
    datasets: Vec<Dataset>,
    specs: &[DatasetSpec],
) -> Result<FilterOutput, Stage3Error> {
    let mut out = FilterOutput {
        datasets: Vec::with_capacity(datasets.len()),
        summaries: Vec::with_capacity(datasets.len()),
    };
    for ds in datasets {
        let thresholds = specs
            .iter()
            .find(|s| s.label == ds.label())
            .map(|s| s.filter)
            .ok_or_else(|| Stage3Error::MissingThresholds(ds.label().to_string()))?;
        let (filtered, summary) = filter_dataset(ds, thresholds)?;
        out.datasets.push(filtered);
        out.summaries.push(summary);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_filter.rs"]
mod tests;
