use std::cmp::Ordering;

use crate::expr::csc::CountMatrix;

#[derive(Debug, Clone)]
pub struct VariableFeatures {
    /// Gene rows ordered by decreasing standardized variance.
    pub ranked: Vec<usize>,
    /// Standardized variance for every gene row of the matrix.
    pub scores: Vec<f64>,
}

impl VariableFeatures {
    pub fn rank_of(&self) -> Vec<Option<usize>> {
        let mut rank = vec![None; self.scores.len()];
        for (r, &g) in self.ranked.iter().enumerate() {
            rank[g] = Some(r);
        }
        rank
    }
}

/// Variance-stabilized feature ranking on raw counts.
///
/// The expected log-variance of each gene is the mean log-variance of the
/// genes around it when ordered by log-mean. Counts are standardized with
/// that expected deviation, clipped at `sqrt(n_cells)`, and the variance of
/// the standardized values ranks the genes. Constant genes are never
/// selected.
pub fn find_variable_features(counts: &CountMatrix, n_features: usize) -> VariableFeatures {
    let n_genes = counts.n_genes;
    let n_cells = counts.n_cells;
    if n_genes == 0 || n_cells < 2 {
        return VariableFeatures {
            ranked: Vec::new(),
            scores: vec![0.0; n_genes],
        };
    }

    let mut sum = vec![0f64; n_genes];
    let mut sum_sq = vec![0f64; n_genes];
    for cell in 0..n_cells {
        for (gene, v) in counts.iter_cell_raw(cell) {
            let v = v as f64;
            sum[gene as usize] += v;
            sum_sq[gene as usize] += v * v;
        }
    }
    let n = n_cells as f64;
    let means: Vec<f64> = sum.iter().map(|s| s / n).collect();
    let variances: Vec<f64> = (0..n_genes)
        .map(|g| ((sum_sq[g] - n * means[g] * means[g]) / (n - 1.0)).max(0.0))
        .collect();

    let expected_sd = expected_deviation(&means, &variances);
    let clip = n.sqrt();

    let mut z_sum = vec![0f64; n_genes];
    let mut z_sq = vec![0f64; n_genes];
    let mut nonzero = vec![0usize; n_genes];
    for cell in 0..n_cells {
        for (gene, v) in counts.iter_cell_raw(cell) {
            let g = gene as usize;
            if expected_sd[g] <= 0.0 {
                continue;
            }
            let z = ((v as f64 - means[g]) / expected_sd[g]).min(clip);
            z_sum[g] += z;
            z_sq[g] += z * z;
            nonzero[g] += 1;
        }
    }

    let scores: Vec<f64> = (0..n_genes)
        .map(|g| {
            if variances[g] <= 0.0 || expected_sd[g] <= 0.0 {
                return 0.0;
            }
            let zeros = (n_cells - nonzero[g]) as f64;
            let z0 = ((-means[g]) / expected_sd[g]).max(-clip);
            let s = z_sum[g] + zeros * z0;
            let ss = z_sq[g] + zeros * z0 * z0;
            ((ss - s * s / n) / (n - 1.0)).max(0.0)
        })
        .collect();

    let mut ranked: Vec<usize> = (0..n_genes).filter(|&g| variances[g] > 0.0).collect();
    ranked.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    ranked.truncate(n_features);

    VariableFeatures { ranked, scores }
}

fn expected_deviation(means: &[f64], variances: &[f64]) -> Vec<f64> {
    let n_genes = means.len();
    let active: Vec<usize> = (0..n_genes).filter(|&g| variances[g] > 0.0).collect();
    let mut expected = vec![0f64; n_genes];
    if active.is_empty() {
        return expected;
    }

    let log_mean: Vec<f64> = means.iter().map(|m| m.max(1e-12).log10()).collect();
    let log_var: Vec<f64> = variances.iter().map(|v| v.max(1e-12).log10()).collect();

    let mut order = active;
    order.sort_by(|&a, &b| {
        log_mean[a]
            .partial_cmp(&log_mean[b])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let len = order.len();
    let window = (len / 10).max(10).min(len);
    for (rank, &g) in order.iter().enumerate() {
        let start = rank.saturating_sub(window / 2);
        let end = (rank + window / 2 + 1).min(len);
        let fit = order[start..end].iter().map(|&j| log_var[j]).sum::<f64>()
            / (end - start) as f64;
        expected[g] = 10f64.powf(fit).sqrt();
    }
    expected
}

#[cfg(test)]
#[path = "../../tests/src_inline/expr/variable.rs"]
mod tests;
