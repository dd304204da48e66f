use crate::pipeline::stage8_report::RunSummary;
use crate::report::composition::CrossTab;

pub fn render_report(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str("Kira Integrate Report\n");
    out.push_str("=====================\n\n");
    out.push_str("Cluster composition after integration. Well-mixed clusters draw cells from ");
    out.push_str("every dataset in proportion to its size; a cluster dominated by one dataset ");
    out.push_str("may be a batch effect or a population unique to that dataset.\n\n");

    out.push_str(&format!(
        "Strategy: {} ({} dims, {} features)\n",
        summary.strategy, summary.dims, summary.n_features
    ));
    out.push_str(&format!("Cells: {}\n\n", summary.n_cells));

    out.push_str("Datasets:\n");
    for d in &summary.datasets {
        out.push_str(&format!(
            "- {}: {} of {} cells kept (genes {}..{}, mito {})\n",
            d.label,
            d.cells_after,
            d.cells_before,
            d.thresholds.min_genes,
            d.thresholds.max_genes,
            d.thresholds
                .max_mito_pct
                .map(|v| format!("< {v}%"))
                .unwrap_or_else(|| "unbounded".to_string()),
        ));
    }
    out.push_str(&format!(
        "\nShared genes: {} of {} (Jaccard {:.3})\n",
        summary.gene_overlap.shared, summary.gene_overlap.union, summary.gene_overlap.jaccard
    ));
    for d in &summary.gene_overlap.datasets {
        out.push_str(&format!(
            "- {}: {:.1}% of {} genes shared\n",
            d.label,
            d.fraction_shared * 100.0,
            d.genes
        ));
    }

    out.push_str(&format!(
        "\nClusters: {} (modularity {:.4}, {} levels)\n",
        summary.clustering.n_clusters, summary.clustering.modularity, summary.clustering.levels
    ));
    out.push_str(&format!("Mean mixing entropy: {:.4}\n\n", summary.mixing.mean));

    out.push_str("Composition by dataset:\n");
    render_table(&mut out, &summary.composition, Some(&summary.mixing.per_cluster));
    if let Some(tab) = &summary.cell_type_composition {
        out.push_str("\nComposition by cell type:\n");
        render_table(&mut out, tab, None);
    }

    if !summary.diagnostics.is_empty() {
        out.push_str("\nIntegration diagnostics:\n");
        for (k, v) in &summary.diagnostics {
            out.push_str(&format!("- {k}: {v}\n"));
        }
    }
    out
}

fn render_table(out: &mut String, tab: &CrossTab, entropy: Option<&[f64]>) {
    out.push_str("cluster");
    for c in &tab.columns {
        out.push_str(&format!("\t{c}"));
    }
    out.push_str("\ttotal");
    if entropy.is_some() {
        out.push_str("\tmixing");
    }
    out.push('\n');
    for (i, (row, sum)) in tab.counts.iter().zip(tab.row_sums()).enumerate() {
        out.push_str(&tab.rows[i]);
        for c in row {
            out.push_str(&format!("\t{c}"));
        }
        out.push_str(&format!("\t{sum}"));
        if let Some(h) = entropy {
            out.push_str(&format!("\t{:.3}", h[i]));
        }
        out.push('\n');
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/text.rs"]
mod tests;
