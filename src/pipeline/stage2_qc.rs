use tracing::info;

use crate::config::QcSettings;
use crate::model::dataset::Dataset;
use crate::model::qc::{GenePrefixes, compute_qc};

pub fn prefixes(settings: &QcSettings) -> (GenePrefixes, GenePrefixes) {
    (
        GenePrefixes::new(&settings.mito_prefixes, settings.case_insensitive),
        GenePrefixes::new(&settings.ribo_prefixes, settings.case_insensitive),
    )
}

/// Attaches fresh QC metrics to every dataset.
pub fn annotate_qc(mut dataset: Dataset, mito: &GenePrefixes, ribo: &GenePrefixes) -> Dataset {
    dataset.qc = Some(compute_qc(&dataset.counts, &dataset.genes, mito, ribo));
    dataset
}

pub fn run_stage2(datasets: Vec<Dataset>, settings: &QcSettings) -> Vec<Dataset> {
    let (mito, ribo) = prefixes(settings);
    datasets
        .into_iter()
        .map(|ds| {
            let mito_genes = ds.genes.iter().filter(|g| mito.matches(g)).count();
            let ribo_genes = ds.genes.iter().filter(|g| ribo.matches(g)).count();
            info!(
                dataset = ds.label(),
                mito_genes, ribo_genes, "qc gene families"
            );
            annotate_qc(ds, &mito, &ribo)
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_qc.rs"]
mod tests;
