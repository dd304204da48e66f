use std::path::{Path, PathBuf};

use crate::config::InputFormat;
use crate::input::InputError;

/// Files of one 10x directory. `legacy_genes` is set when the feature table
/// is a two-column `genes.tsv` rather than `features.tsv`.
#[derive(Debug, Clone)]
pub struct TenXLayout {
    pub matrix: PathBuf,
    pub features: PathBuf,
    pub barcodes: PathBuf,
    pub legacy_genes: bool,
}

/// Where a dataset's counts come from once its format is settled.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    TenX(TenXLayout),
    Delimited(PathBuf),
}

/// Resolves a configured path. `auto` reads directories as 10x and files
/// as delimited tables.
pub fn resolve_source(path: &Path, format: InputFormat) -> Result<DatasetSource, InputError> {
    let as_10x = match format {
        InputFormat::Tenx => true,
        InputFormat::Delimited => false,
        InputFormat::Auto if path.is_dir() => true,
        InputFormat::Auto if path.is_file() => false,
        InputFormat::Auto => {
            return Err(InputError::MissingFile(path.to_string_lossy().to_string()));
        }
    };
    if as_10x {
        Ok(DatasetSource::TenX(tenx_layout(path)?))
    } else {
        Ok(DatasetSource::Delimited(path.to_path_buf()))
    }
}

/// Locates matrix, feature and barcode files, with or without a shared
/// file-name prefix.
pub fn tenx_layout(dir: &Path) -> Result<TenXLayout, InputError> {
    let found = kira_scio::discover(dir).map_err(|e| InputError::MissingFile(e.message))?;
    let barcodes = found
        .barcodes
        .ok_or_else(|| InputError::MissingFile(format!("{}: barcodes.tsv[.gz]", dir.display())))?;
    let (features, legacy_genes) = match (found.features, found.genes) {
        (Some(features), _) => (features, false),
        (None, Some(genes)) => (genes, true),
        (None, None) => {
            return Err(InputError::MissingFile(format!(
                "{}: features.tsv or genes.tsv[.gz]",
                dir.display()
            )));
        }
    };
    Ok(TenXLayout {
        matrix: found.matrix,
        features,
        barcodes,
        legacy_genes,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/detect.rs"]
mod tests;
