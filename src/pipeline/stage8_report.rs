use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::config::RunConfig;
use crate::graph::louvain::ClusterAssignment;
use crate::integrate::StrategyKind;
use crate::model::embedding::IntegratedRepresentation;
use crate::pipeline::stage3_filter::FilterSummary;
use crate::pipeline::stage4_features::GeneOverlap;
use crate::pipeline::{ErrorKind, StageFailure};
use crate::report::ReportError;
use crate::report::composition::CrossTab;
use crate::report::json::write_summary;
use crate::report::text::render_report;
use crate::report::tsv::{write_crosstab, write_embedding, write_qc_tables};

impl StageFailure for ReportError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Io
    }
}

/// Everything the report is built from, borrowed from the earlier stages.
pub struct ReportInputs<'a> {
    pub config: &'a RunConfig,
    pub representation: &'a IntegratedRepresentation,
    pub clusters: &'a ClusterAssignment,
    pub filters: &'a [FilterSummary],
    pub overlap: &'a GeneOverlap,
    /// Genes the integration actually ran on.
    pub n_features: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tool: ToolSummary,
    pub strategy: StrategyKind,
    pub dims: usize,
    pub n_cells: usize,
    pub datasets: Vec<FilterSummary>,
    pub gene_overlap: GeneOverlap,
    pub n_features: usize,
    pub clustering: ClusteringSummary,
    pub composition: CrossTab,
    pub cell_type_composition: Option<CrossTab>,
    pub mixing: MixingSummary,
    pub diagnostics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusteringSummary {
    pub n_clusters: usize,
    pub modularity: f64,
    pub levels: usize,
    pub sizes: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MixingSummary {
    pub per_cluster: Vec<f64>,
    pub mean: f64,
}

/// Builds the in-memory summary without touching the filesystem.
pub fn summarize(inputs: &ReportInputs<'_>) -> RunSummary {
    let rep = inputs.representation;
    let clusters = inputs.clusters;
    let composition = CrossTab::by_origin(
        &clusters.labels,
        clusters.n_clusters,
        &rep.origin,
        &rep.origin_labels,
    );
    let cell_type_composition =
        CrossTab::by_cell_type(&clusters.labels, clusters.n_clusters, &rep.cell_types);
    let mixing = MixingSummary {
        per_cluster: composition.mixing_entropy(),
        mean: composition.mean_mixing_entropy(),
    };

    RunSummary {
        tool: ToolSummary {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        strategy: rep.strategy,
        dims: rep.dims,
        n_cells: rep.n_cells(),
        datasets: inputs.filters.to_vec(),
        gene_overlap: inputs.overlap.clone(),
        n_features: inputs.n_features,
        clustering: ClusteringSummary {
            n_clusters: clusters.n_clusters,
            modularity: clusters.modularity,
            levels: clusters.levels,
            sizes: clusters.sizes(),
        },
        composition,
        cell_type_composition,
        mixing,
        diagnostics: rep.diagnostics.clone(),
    }
}

pub fn run_stage8(inputs: ReportInputs<'_>, out_dir: &Path) -> Result<RunSummary, ReportError> {
    std::fs::create_dir_all(out_dir)?;
    let summary = summarize(&inputs);

    write_crosstab(&out_dir.join("composition.tsv"), &summary.composition, "cluster")?;
    if let Some(tab) = &summary.cell_type_composition {
        write_crosstab(&out_dir.join("cell_type_composition.tsv"), tab, "cluster")?;
    }
    write_embedding(
        &out_dir.join("embedding.tsv"),
        inputs.representation,
        inputs.clusters,
    )?;
    write_qc_tables(out_dir, inputs.filters)?;
    write_summary(out_dir, &summary)?;
    std::fs::write(out_dir.join("report.txt"), render_report(&summary))?;

    info!(
        clusters = summary.clustering.n_clusters,
        cells = summary.composition.total(),
        mean_mixing_entropy = summary.mixing.mean,
        "report written"
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage8_report.rs"]
mod tests;
