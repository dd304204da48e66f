use serde::{Deserialize, Serialize};

use crate::model::qc::QcMetrics;

/// Per-dataset cell filter. All bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterThresholds {
    pub min_genes: u32,
    pub max_genes: u32,
    #[serde(default)]
    pub max_mito_pct: Option<f32>,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            min_genes: 200,
            max_genes: 2500,
            max_mito_pct: Some(5.0),
        }
    }
}

impl FilterThresholds {
    pub fn keeps(&self, qc: &QcMetrics) -> bool {
        let genes_ok = self.min_genes < qc.n_genes && qc.n_genes < self.max_genes;
        let mito_ok = self.max_mito_pct.is_none_or(|cap| qc.pct_mito < cap);
        genes_ok && mito_ok
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/thresholds.rs"]
mod tests;
