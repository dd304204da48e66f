use ndarray::Array2;

use crate::expr::csc::{CellStats, CountMatrix};
use crate::expr::normalize::Normalization;

/// Z-score clip applied before PCA.
pub const DEFAULT_SCALE_CLIP: f64 = 10.0;

/// Materializes normalized values of `genes` as a cells × genes matrix.
/// Column `j` holds gene `genes[j]`.
pub fn densify_cells(
    counts: &CountMatrix,
    stats: &[CellStats],
    norm: &Normalization,
    genes: &[usize],
) -> Array2<f64> {
    let mut column_of = vec![usize::MAX; counts.n_genes];
    for (j, &g) in genes.iter().enumerate() {
        column_of[g] = j;
    }
    let mut out = Array2::zeros((counts.n_cells, genes.len()));
    for (cell, cell_stats) in stats.iter().enumerate().take(counts.n_cells) {
        for (gene, value) in counts.iter_cell_norm(cell, norm, cell_stats) {
            let j = column_of[gene as usize];
            if j != usize::MAX {
                out[[cell, j]] = value as f64;
            }
        }
    }
    out
}

/// Centers every column and divides by its sample standard deviation.
/// Constant columns become zero. Values are clipped to `[-clip, clip]`.
pub fn scale_columns(m: &mut Array2<f64>, clip: Option<f64>) {
    let n = m.nrows();
    if n == 0 {
        return;
    }
    for mut col in m.columns_mut() {
        let mean = col.sum() / n as f64;
        let ss: f64 = col.iter().map(|v| (v - mean).powi(2)).sum();
        let sd = if n > 1 { (ss / (n - 1) as f64).sqrt() } else { 0.0 };
        col.mapv_inplace(|v| {
            let z = if sd > 0.0 { (v - mean) / sd } else { 0.0 };
            match clip {
                Some(c) => z.clamp(-c, c),
                None => z,
            }
        });
    }
}

/// Divides every column by its root mean square without centering, keeping
/// the matrix non-negative.
pub fn rms_scale_columns(m: &mut Array2<f64>) {
    let n = m.nrows();
    if n == 0 {
        return;
    }
    let denom = (n.max(2) - 1) as f64;
    for mut col in m.columns_mut() {
        let rms = (col.dot(&col) / denom).sqrt();
        if rms > 0.0 {
            col /= rms;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/expr/scale.rs"]
mod tests;
