use std::collections::BTreeSet;

use serde::Serialize;

/// Contingency table of cells, cluster ids by column labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    /// `counts[row][column]`.
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    /// Cluster by origin dataset. Every dataset gets a column, even one
    /// that no cluster contains.
    pub fn by_origin(
        labels: &[usize],
        n_clusters: usize,
        origin: &[usize],
        origin_labels: &[String],
    ) -> Self {
        let mut counts = vec![vec![0usize; origin_labels.len()]; n_clusters];
        for (&cluster, &o) in labels.iter().zip(origin) {
            counts[cluster][o] += 1;
        }
        Self {
            rows: (0..n_clusters).map(|c| c.to_string()).collect(),
            columns: origin_labels.to_vec(),
            counts,
        }
    }

    /// Cluster by external cell-type label, over labelled cells only.
    /// `None` when no cell carries a label.
    pub fn by_cell_type(
        labels: &[usize],
        n_clusters: usize,
        cell_types: &[Option<String>],
    ) -> Option<Self> {
        let columns: Vec<String> = cell_types
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if columns.is_empty() {
            return None;
        }
        let mut counts = vec![vec![0usize; columns.len()]; n_clusters];
        for (&cluster, ct) in labels.iter().zip(cell_types) {
            if let Some(ct) = ct
                && let Ok(col) = columns.binary_search(ct)
            {
                counts[cluster][col] += 1;
            }
        }
        Some(Self {
            rows: (0..n_clusters).map(|c| c.to_string()).collect(),
            columns,
            counts,
        })
    }

    pub fn row_sums(&self) -> Vec<usize> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    pub fn column_sums(&self) -> Vec<usize> {
        let mut sums = vec![0usize; self.columns.len()];
        for row in &self.counts {
            for (s, &c) in sums.iter_mut().zip(row) {
                *s += c;
            }
        }
        sums
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Normalised Shannon entropy of each row after dividing every column by
    /// its total, so that a cluster drawing evenly from datasets of unequal
    /// size still scores 1. Rows with no cells score 0.
    pub fn mixing_entropy(&self) -> Vec<f64> {
        let col_sums = self.column_sums();
        let populated = col_sums.iter().filter(|&&s| s > 0).count();
        if populated < 2 {
            return vec![0.0; self.counts.len()];
        }
        let max_entropy = (populated as f64).ln();
        self.counts
            .iter()
            .map(|row| {
                let weights: Vec<f64> = row
                    .iter()
                    .zip(&col_sums)
                    .filter(|&(_, &s)| s > 0)
                    .map(|(&c, &s)| c as f64 / s as f64)
                    .collect();
                let total: f64 = weights.iter().sum();
                if total <= 0.0 {
                    return 0.0;
                }
                let h: f64 = weights
                    .iter()
                    .filter(|&&w| w > 0.0)
                    .map(|&w| {
                        let p = w / total;
                        -p * p.ln()
                    })
                    .sum();
                (h / max_entropy).clamp(0.0, 1.0)
            })
            .collect()
    }

    /// Row entropies averaged with cluster sizes as weights.
    pub fn mean_mixing_entropy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.mixing_entropy()
            .iter()
            .zip(self.row_sums())
            .map(|(h, n)| h * n as f64)
            .sum::<f64>()
            / total as f64
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/composition.rs"]
mod tests;
