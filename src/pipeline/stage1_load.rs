use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{DatasetSpec, RunConfig};
use crate::expr::csc::CountMatrix;
use crate::input::InputError;
use crate::input::barcodes::read_barcodes;
use crate::input::delimited::read_delimited_counts;
use crate::input::detect::{DatasetSource, TenXLayout, resolve_source};
use crate::input::features::{GENE_EXPRESSION, make_unique, read_feature_types, read_features};
use crate::input::meta::read_cell_labels;
use crate::model::dataset::Dataset;
use crate::pipeline::{ErrorKind, StageFailure};

pub const CELL_TYPE_COLUMN: &str = "cell_type";

#[derive(Debug, Error)]
pub enum Stage1Error {
    #[error("dataset {label}: {source}")]
    Input {
        label: String,
        #[source]
        source: InputError,
    },
}

impl StageFailure for Stage1Error {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Load
    }
}

pub fn run_stage1(config: &RunConfig) -> Result<Vec<Dataset>, Stage1Error> {
    config
        .datasets
        .iter()
        .map(|spec| {
            load_dataset(spec).map_err(|source| Stage1Error::Input {
                label: spec.label.clone(),
                source,
            })
        })
        .collect()
}

pub fn load_dataset(spec: &DatasetSpec) -> Result<Dataset, InputError> {
    let mut dataset = match resolve_source(&spec.path, spec.format)? {
        DatasetSource::TenX(layout) => load_10x(spec, &layout)?,
        DatasetSource::Delimited(path) => {
            let table = read_delimited_counts(&path)?;
            let counts =
                CountMatrix::from_entries(table.genes.len(), table.cells.len(), table.entries)?;
            Dataset::new(spec.label.clone(), table.genes, table.cells, counts)
        }
    };

    if let Some(path) = spec.cell_types.as_deref() {
        let (labels, stats) = read_cell_labels(path, CELL_TYPE_COLUMN, &dataset.cells)?;
        info!(
            dataset = %spec.label,
            matched = stats.matched,
            missing = stats.missing,
            repeated_rows = stats.duplicate_rows,
            cell_types = stats.label_counts.len(),
            "cell-type labels mapped"
        );
        dataset.cell_types = Some(labels);
    }

    info!(
        dataset = %spec.label,
        genes = dataset.n_genes(),
        cells = dataset.n_cells(),
        nnz = dataset.counts.nnz(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn load_10x(spec: &DatasetSpec, layout: &TenXLayout) -> Result<Dataset, InputError> {
    debug!(
        dataset = %spec.label,
        matrix = %layout.matrix.display(),
        legacy_genes = layout.legacy_genes,
        "10x layout"
    );
    let barcodes = read_barcodes(&layout.barcodes)?;
    let symbols = read_features(&layout.features)?;
    let n_genes = symbols.len();
    let counts = CountMatrix::from_mtx(&layout.matrix, n_genes, barcodes.len())?;

    let types = read_feature_types(&layout.features, n_genes)?;
    let keep = select_modality(&spec.label, spec.modality.as_deref(), &types)?;

    let kept: Vec<&str> = keep.iter().map(|&g| symbols[g].as_str()).collect();
    let genes = make_unique(kept.iter().copied());
    let renamed = genes
        .iter()
        .zip(&kept)
        .filter(|(unique, original)| unique.as_str() != **original)
        .count();
    if renamed > 0 {
        info!(
            dataset = %spec.label,
            renamed,
            "duplicate gene symbols made unique"
        );
    }

    let counts = if keep.len() == n_genes {
        counts
    } else {
        counts.select_genes(&keep)
    };
    Ok(Dataset::new(spec.label.clone(), genes, barcodes, counts))
}

/// Rows of the requested feature type. Without a request a single-type
/// table is kept whole and a mixed one falls back to gene expression.
fn select_modality(
    label: &str,
    requested: Option<&str>,
    types: &[String],
) -> Result<Vec<usize>, InputError> {
    let available: BTreeSet<&str> = types.iter().map(String::as_str).collect();
    let rows_of = |kind: &str| -> Vec<usize> {
        types
            .iter()
            .enumerate()
            .filter(|(_, t)| t.as_str() == kind)
            .map(|(i, _)| i)
            .collect()
    };

    match requested {
        Some(kind) => {
            let rows = rows_of(kind);
            if rows.is_empty() {
                return Err(InputError::MissingModality {
                    requested: kind.to_string(),
                    available: available.into_iter().collect::<Vec<_>>().join(", "),
                });
            }
            Ok(rows)
        }
        None if available.len() <= 1 => Ok((0..types.len()).collect()),
        None => {
            let rows = rows_of(GENE_EXPRESSION);
            if rows.is_empty() {
                warn!(
                    dataset = label,
                    "mixed feature types without {:?}, keeping all rows",
                    GENE_EXPRESSION
                );
                return Ok((0..types.len()).collect());
            }
            warn!(
                dataset = label,
                kept = rows.len(),
                total = types.len(),
                "no modality configured, keeping {:?} rows",
                GENE_EXPRESSION
            );
            Ok(rows)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_load.rs"]
mod tests;
