use serde::Serialize;

use crate::expr::csc::CountMatrix;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QcMetrics {
    pub n_genes: u32,
    pub n_counts: u64,
    pub pct_mito: f32,
    pub pct_ribo: f32,
}

/// Gene-name prefixes that mark a gene family, e.g. `MT-` for mitochondrial
/// genes.
#[derive(Debug, Clone)]
pub struct GenePrefixes {
    prefixes: Vec<String>,
    case_insensitive: bool,
}

impl GenePrefixes {
    pub fn new(prefixes: &[String], case_insensitive: bool) -> Self {
        let prefixes = prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| {
                if case_insensitive {
                    p.to_ascii_uppercase()
                } else {
                    p.clone()
                }
            })
            .collect();
        Self {
            prefixes,
            case_insensitive,
        }
    }

    pub fn matches(&self, gene: &str) -> bool {
        if self.case_insensitive {
            let upper = gene.to_ascii_uppercase();
            self.prefixes.iter().any(|p| upper.starts_with(p.as_str()))
        } else {
            self.prefixes.iter().any(|p| gene.starts_with(p.as_str()))
        }
    }

    pub fn mask(&self, genes: &[String]) -> Vec<bool> {
        genes.iter().map(|g| self.matches(g)).collect()
    }
}

/// Per-cell QC metrics. Percentages are `0.0` for empty cells and when no
/// gene matches the prefixes.
pub fn compute_qc(
    counts: &CountMatrix,
    genes: &[String],
    mito: &GenePrefixes,
    ribo: &GenePrefixes,
) -> Vec<QcMetrics> {
    let mito_mask = mito.mask(genes);
    let ribo_mask = ribo.mask(genes);

    (0..counts.n_cells)
        .map(|cell| {
            let mut total = 0u64;
            let mut detected = 0u32;
            let mut mito_sum = 0u64;
            let mut ribo_sum = 0u64;
            for (gene, v) in counts.iter_cell_raw(cell) {
                let v = v as u64;
                total += v;
                detected += 1;
                if mito_mask[gene as usize] {
                    mito_sum += v;
                }
                if ribo_mask[gene as usize] {
                    ribo_sum += v;
                }
            }
            QcMetrics {
                n_genes: detected,
                n_counts: total,
                pct_mito: percent(mito_sum, total),
                pct_ribo: percent(ribo_sum, total),
            }
        })
        .collect()
}

fn percent(part: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        (part as f64 * 100.0 / total as f64) as f32
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/qc.rs"]
mod tests;
