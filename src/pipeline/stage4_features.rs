use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::QcSettings;
use crate::pipeline::stage2_qc::{annotate_qc, prefixes};
use crate::pipeline::stage3_filter::FilteredDataset;
use crate::pipeline::{ErrorKind, StageFailure};

/// Overlap below this fraction of a dataset's genes is logged as a warning.
pub const LOW_OVERLAP_FRACTION: f64 = 0.5;

#[derive(Debug, Error)]
pub enum Stage4Error {
    #[error("datasets share no genes")]
    NoSharedGenes,
}

impl StageFailure for Stage4Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::EmptyResult
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetOverlap {
    pub label: String,
    pub genes: usize,
    pub fraction_shared: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneOverlap {
    pub shared: usize,
    pub union: usize,
    pub jaccard: f64,
    pub datasets: Vec<DatasetOverlap>,
}

/// Genes of `a` that also occur in `b`, in `a`'s order.
pub fn intersect_genes(a: &[String], b: &[String]) -> Vec<String> {
    let other: HashSet<&str> = b.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    a.iter()
        .filter(|g| other.contains(g.as_str()) && seen.insert(g.as_str()))
        .cloned()
        .collect()
}

/// Restricts every dataset to the genes all of them share, in the first
/// dataset's order, and recomputes QC on the restricted matrices.
pub fn run_stage4(
    datasets: Vec<FilteredDataset>,
    qc: &QcSettings,
) -> Result<(Vec<FilteredDataset>, GeneOverlap), Stage4Error> {
    let Some(first) = datasets.first() else {
        return Err(Stage4Error::NoSharedGenes);
    };
    let mut shared = first.dataset.genes.clone();
    for ds in &datasets[1..] {
        shared = intersect_genes(&shared, &ds.dataset.genes);
    }
    if shared.is_empty() {
        return Err(Stage4Error::NoSharedGenes);
    }

    let mut union: HashSet<&str> = HashSet::new();
    for ds in &datasets {
        union.extend(ds.dataset.genes.iter().map(String::as_str));
    }
    let overlap = GeneOverlap {
        shared: shared.len(),
        union: union.len(),
        jaccard: shared.len() as f64 / union.len() as f64,
        datasets: datasets
            .iter()
            .map(|ds| DatasetOverlap {
                label: ds.dataset.label().to_string(),
                genes: ds.dataset.n_genes(),
                fraction_shared: shared.len() as f64 / ds.dataset.n_genes().max(1) as f64,
            })
            .collect(),
    };
    drop(union);

    for d in &overlap.datasets {
        if d.fraction_shared < LOW_OVERLAP_FRACTION {
            warn!(
                dataset = %d.label,
                fraction = d.fraction_shared,
                "low gene overlap"
            );
        }
    }
    info!(
        shared = overlap.shared,
        union = overlap.union,
        jaccard = overlap.jaccard,
        "shared gene space"
    );

    let (mito, ribo) = prefixes(qc);
    let restricted = datasets
        .into_iter()
        .map(|f| {
            let position: HashMap<&str, usize> = f
                .dataset
                .genes
                .iter()
                .enumerate()
                .map(|(i, g)| (g.as_str(), i))
                .collect();
            let keep: Vec<usize> = shared
                .iter()
                .filter_map(|g| position.get(g.as_str()).copied())
                .collect();
            drop(position);
            let dataset = annotate_qc(f.dataset.restrict_genes(&keep), &mito, &ribo);
            FilteredDataset {
                dataset,
                thresholds: f.thresholds,
            }
        })
        .collect();
    Ok((restricted, overlap))
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_features.rs"]
mod tests;
