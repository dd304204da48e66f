use std::collections::BTreeMap;

use crate::integrate::StrategyKind;

/// Cells × `dims` embedding produced by one integration strategy. Rows are
/// ordered dataset by dataset, in input order.
#[derive(Debug, Clone)]
pub struct IntegratedRepresentation {
    pub strategy: StrategyKind,
    pub dims: usize,
    /// Row-major, `n_cells * dims`.
    pub coords: Vec<f32>,
    /// `<label>_<cell id>`, unique across datasets.
    pub cell_ids: Vec<String>,
    /// Index into `origin_labels` for every row.
    pub origin: Vec<usize>,
    pub origin_labels: Vec<String>,
    pub cell_types: Vec<Option<String>>,
    /// Strategy-specific numbers (iterations, anchors, objective, ...).
    pub diagnostics: BTreeMap<String, f64>,
}

impl IntegratedRepresentation {
    pub fn n_cells(&self) -> usize {
        self.origin.len()
    }

    pub fn row(&self, cell: usize) -> &[f32] {
        &self.coords[cell * self.dims..(cell + 1) * self.dims]
    }

    pub fn origin_label(&self, cell: usize) -> &str {
        &self.origin_labels[self.origin[cell]]
    }

    pub fn has_cell_types(&self) -> bool {
        self.cell_types.iter().any(Option::is_some)
    }
}
