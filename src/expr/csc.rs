use std::path::Path;

use crate::expr::normalize::Normalization;
use crate::input::InputError;
use crate::input::mtx::read_entries;
use crate::simd;

/// Sparse genes × cells count matrix, stored column-major (one column per
/// cell) with row indices sorted inside each column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMatrix {
    pub n_genes: usize,
    pub n_cells: usize,
    pub col_ptr: Vec<u64>,
    pub row_idx: Vec<u32>,
    pub values: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStats {
    pub libsize: u64,
    pub detected: u32,
}

impl CountMatrix {
    /// Builds from `(cell, gene, count)` triplets. Zero counts are dropped;
    /// repeated coordinates are rejected.
    pub fn from_entries(
        n_genes: usize,
        n_cells: usize,
        mut entries: Vec<(u32, u32, u32)>,
    ) -> Result<Self, InputError> {
        entries.retain(|e| e.2 > 0);
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut col_ptr = vec![0u64; n_cells + 1];
        let mut row_idx = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        let mut prev: Option<(u32, u32)> = None;
        for (col, row, val) in entries {
            if col as usize >= n_cells {
                return Err(InputError::InvalidMtxDimensions(
                    "column index out of bounds".to_string(),
                ));
            }
            if row as usize >= n_genes {
                return Err(InputError::InvalidMtxDimensions(
                    "row index out of bounds".to_string(),
                ));
            }
            if prev == Some((col, row)) {
                return Err(InputError::InvalidMtxDimensions(format!(
                    "duplicate entry at row {}, col {}",
                    row + 1,
                    col + 1
                )));
            }
            prev = Some((col, row));
            col_ptr[col as usize + 1] += 1;
            row_idx.push(row);
            values.push(val);
        }
        for i in 0..n_cells {
            col_ptr[i + 1] += col_ptr[i];
        }

        Ok(CountMatrix {
            n_genes,
            n_cells,
            col_ptr,
            row_idx,
            values,
        })
    }

    pub fn from_mtx(path: &Path, n_genes: usize, n_cells: usize) -> Result<Self, InputError> {
        let (header, entries) = read_entries(path)?;
        if header.n_rows != n_genes || header.n_cols != n_cells {
            return Err(InputError::InvalidMtxDimensions(format!(
                "matrix is {}x{}, features/barcodes describe {}x{}",
                header.n_rows, header.n_cols, n_genes, n_cells
            )));
        }
        Self::from_entries(n_genes, n_cells, entries)
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn cell_range(&self, cell_idx: usize) -> std::ops::Range<usize> {
        self.col_ptr[cell_idx] as usize..self.col_ptr[cell_idx + 1] as usize
    }

    pub fn cell_rows(&self, cell_idx: usize) -> &[u32] {
        &self.row_idx[self.cell_range(cell_idx)]
    }

    pub fn cell_values(&self, cell_idx: usize) -> &[u32] {
        &self.values[self.cell_range(cell_idx)]
    }

    pub fn iter_cell_raw(&self, cell_idx: usize) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.cell_rows(cell_idx)
            .iter()
            .copied()
            .zip(self.cell_values(cell_idx).iter().copied())
    }

    pub fn iter_cell_norm<'a>(
        &'a self,
        cell_idx: usize,
        norm: &'a Normalization,
        cell_stats: &'a CellStats,
    ) -> impl Iterator<Item = (u32, f32)> + 'a {
        self.iter_cell_raw(cell_idx)
            .map(move |(row, v)| (row, norm.apply(v, cell_stats.libsize)))
    }

    pub fn cell_stats(&self) -> Vec<CellStats> {
        (0..self.n_cells)
            .map(|c| {
                let values = self.cell_values(c);
                CellStats {
                    libsize: simd::sum_u32(values),
                    detected: values.iter().filter(|v| **v > 0).count() as u32,
                }
            })
            .collect()
    }

    /// Keeps the listed cells, in the listed order.
    pub fn select_cells(&self, keep: &[usize]) -> Self {
        let nnz: usize = keep.iter().map(|&c| self.cell_range(c).len()).sum();
        let mut col_ptr = Vec::with_capacity(keep.len() + 1);
        let mut row_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        col_ptr.push(0u64);
        for &c in keep {
            row_idx.extend_from_slice(self.cell_rows(c));
            values.extend_from_slice(self.cell_values(c));
            col_ptr.push(row_idx.len() as u64);
        }
        CountMatrix {
            n_genes: self.n_genes,
            n_cells: keep.len(),
            col_ptr,
            row_idx,
            values,
        }
    }

    /// Keeps the listed genes; row `i` of the result is old row `keep[i]`.
    pub fn select_genes(&self, keep: &[usize]) -> Self {
        let mut remap = vec![u32::MAX; self.n_genes];
        for (new, &old) in keep.iter().enumerate() {
            remap[old] = new as u32;
        }

        let mut col_ptr = Vec::with_capacity(self.n_cells + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        let mut column: Vec<(u32, u32)> = Vec::new();
        col_ptr.push(0u64);
        for c in 0..self.n_cells {
            column.clear();
            column.extend(
                self.iter_cell_raw(c)
                    .filter_map(|(row, v)| match remap[row as usize] {
                        u32::MAX => None,
                        new => Some((new, v)),
                    }),
            );
            column.sort_unstable_by_key(|e| e.0);
            for &(row, v) in &column {
                row_idx.push(row);
                values.push(v);
            }
            col_ptr.push(row_idx.len() as u64);
        }

        CountMatrix {
            n_genes: keep.len(),
            n_cells: self.n_cells,
            col_ptr,
            row_idx,
            values,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/expr/csc.rs"]
mod tests;
