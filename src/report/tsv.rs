use std::fs::File;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use crate::graph::louvain::ClusterAssignment;
use crate::model::embedding::IntegratedRepresentation;
use crate::pipeline::stage3_filter::FilterSummary;
use crate::report::composition::CrossTab;
use crate::report::{ReportError, fmt6};

fn tsv_writer(path: &Path) -> Result<Writer<File>, ReportError> {
    Ok(WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Necessary)
        .from_path(path)?)
}

/// Cross-tab with a trailing `total` column and row.
pub fn write_crosstab(path: &Path, tab: &CrossTab, corner: &str) -> Result<(), ReportError> {
    let mut w = tsv_writer(path)?;
    let mut header = Vec::with_capacity(tab.columns.len() + 2);
    header.push(corner.to_string());
    header.extend(tab.columns.iter().cloned());
    header.push("total".to_string());
    w.write_record(&header)?;

    for ((name, counts), sum) in tab.rows.iter().zip(&tab.counts).zip(tab.row_sums()) {
        let mut record = Vec::with_capacity(header.len());
        record.push(name.clone());
        record.extend(counts.iter().map(usize::to_string));
        record.push(sum.to_string());
        w.write_record(&record)?;
    }

    let mut totals = Vec::with_capacity(header.len());
    totals.push("total".to_string());
    totals.extend(tab.column_sums().iter().map(usize::to_string));
    totals.push(tab.total().to_string());
    w.write_record(&totals)?;
    w.flush()?;
    Ok(())
}

pub fn write_embedding(
    path: &Path,
    rep: &IntegratedRepresentation,
    clusters: &ClusterAssignment,
) -> Result<(), ReportError> {
    let mut w = tsv_writer(path)?;
    let mut header = vec![
        "cell".to_string(),
        "origin".to_string(),
        "cluster".to_string(),
        "cell_type".to_string(),
    ];
    header.extend((1..=rep.dims).map(|d| format!("dim_{d}")));
    w.write_record(&header)?;

    for cell in 0..rep.n_cells() {
        let mut record = Vec::with_capacity(header.len());
        record.push(rep.cell_ids[cell].clone());
        record.push(rep.origin_label(cell).to_string());
        record.push(clusters.labels[cell].to_string());
        record.push(rep.cell_types[cell].clone().unwrap_or_else(|| ".".to_string()));
        record.extend(rep.row(cell).iter().map(|&v| fmt6(v as f64)));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

/// Per-cell QC of one dataset, before filtering, with the kept flag.
pub fn write_qc_table(path: &Path, summary: &FilterSummary) -> Result<(), ReportError> {
    let mut w = tsv_writer(path)?;
    w.write_record(["cell", "n_genes", "n_counts", "pct_mito", "pct_ribo", "kept"])?;
    for rec in &summary.cells {
        w.write_record([
            rec.cell.clone(),
            rec.qc.n_genes.to_string(),
            rec.qc.n_counts.to_string(),
            fmt6(rec.qc.pct_mito as f64),
            fmt6(rec.qc.pct_ribo as f64),
            u8::from(rec.kept).to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Writes `qc/<label>.tsv` for every dataset.
pub fn write_qc_tables(out_dir: &Path, summaries: &[FilterSummary]) -> Result<(), ReportError> {
    let dir = out_dir.join("qc");
    std::fs::create_dir_all(&dir)?;
    for s in summaries {
        write_qc_table(&dir.join(format!("{}.tsv", s.label)), s)?;
    }
    Ok(())
}

/// One line per dataset with its thresholds and cell counts around the
/// filter.
pub fn write_filter_summary(path: &Path, summaries: &[FilterSummary]) -> Result<(), ReportError> {
    let mut w = tsv_writer(path)?;
    w.write_record([
        "label",
        "min_genes",
        "max_genes",
        "max_mito_pct",
        "cells_before",
        "cells_after",
        "fraction_kept",
    ])?;
    for s in summaries {
        let fraction = if s.cells_before == 0 {
            0.0
        } else {
            s.cells_after as f64 / s.cells_before as f64
        };
        w.write_record([
            s.label.clone(),
            s.thresholds.min_genes.to_string(),
            s.thresholds.max_genes.to_string(),
            s.thresholds
                .max_mito_pct
                .map(|v| fmt6(v as f64))
                .unwrap_or_else(|| ".".to_string()),
            s.cells_before.to_string(),
            s.cells_after.to_string(),
            fmt6(fraction),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Outcome of one strategy in a comparison run.
#[derive(Debug, Clone)]
pub struct ComparisonRow {
    pub strategy: String,
    pub outcome: Result<ComparisonStats, String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ComparisonStats {
    pub n_clusters: usize,
    pub modularity: f64,
    pub mean_mixing_entropy: f64,
}

pub fn write_comparison(path: &Path, rows: &[ComparisonRow]) -> Result<(), ReportError> {
    let mut w = tsv_writer(path)?;
    w.write_record([
        "strategy",
        "status",
        "n_clusters",
        "modularity",
        "mean_mixing_entropy",
        "error",
    ])?;
    for row in rows {
        let record = match &row.outcome {
            Ok(stats) => [
                row.strategy.clone(),
                "ok".to_string(),
                stats.n_clusters.to_string(),
                fmt6(stats.modularity),
                fmt6(stats.mean_mixing_entropy),
                ".".to_string(),
            ],
            Err(message) => [
                row.strategy.clone(),
                "failed".to_string(),
                ".".to_string(),
                ".".to_string(),
                ".".to_string(),
                message.replace(['\t', '\n'], " "),
            ],
        };
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/tsv.rs"]
mod tests;
