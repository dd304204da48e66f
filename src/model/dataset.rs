use crate::expr::csc::CountMatrix;
use crate::model::qc::QcMetrics;

/// One loaded count matrix with its per-cell annotations. `label` is the
/// origin of every cell and never changes after load.
#[derive(Debug, Clone)]
pub struct Dataset {
    label: String,
    pub genes: Vec<String>,
    pub cells: Vec<String>,
    pub counts: CountMatrix,
    pub cell_types: Option<Vec<Option<String>>>,
    pub qc: Option<Vec<QcMetrics>>,
}

impl Dataset {
    pub fn new(label: String, genes: Vec<String>, cells: Vec<String>, counts: CountMatrix) -> Self {
        Self {
            label,
            genes,
            cells,
            counts,
            cell_types: None,
            qc: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn n_cells(&self) -> usize {
        self.counts.n_cells
    }

    pub fn n_genes(&self) -> usize {
        self.counts.n_genes
    }

    pub fn cell_type(&self, cell: usize) -> Option<&str> {
        self.cell_types
            .as_ref()
            .and_then(|t| t.get(cell))
            .and_then(|t| t.as_deref())
    }

    /// Keeps the listed cells. QC values follow the cells they belong to.
    pub fn retain_cells(self, keep: &[usize]) -> Self {
        let counts = self.counts.select_cells(keep);
        let cells = keep.iter().map(|&c| self.cells[c].clone()).collect();
        let cell_types = self
            .cell_types
            .map(|t| keep.iter().map(|&c| t[c].clone()).collect());
        let qc = self.qc.map(|q| keep.iter().map(|&c| q[c]).collect());
        Self {
            label: self.label,
            genes: self.genes,
            cells,
            counts,
            cell_types,
            qc,
        }
    }

    /// Keeps the listed gene rows in the listed order. QC metrics are
    /// dropped because they no longer describe the matrix.
    pub fn restrict_genes(self, keep: &[usize]) -> Self {
        let counts = self.counts.select_genes(keep);
        let genes = keep.iter().map(|&g| self.genes[g].clone()).collect();
        Self {
            label: self.label,
            genes,
            cells: self.cells,
            counts,
            cell_types: self.cell_types,
            qc: None,
        }
    }
}
