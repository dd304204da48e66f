use std::collections::HashSet;
use std::path::Path;

use crate::input::barcodes::ensure_unique_cells;
use crate::input::{InputError, open_reader};

/// A genes × cells count table read from CSV/TSV text.
#[derive(Debug, Clone)]
pub struct DelimitedTable {
    pub genes: Vec<String>,
    pub cells: Vec<String>,
    /// `(cell, gene, count)` triplets, zero counts omitted.
    pub entries: Vec<(u32, u32, u32)>,
}

pub fn delimiter_for(path: &Path) -> u8 {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".csv") { b',' } else { b'\t' }
}

pub fn read_delimited_counts(path: &Path) -> Result<DelimitedTable, InputError> {
    let reader = open_reader(path)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => {
            return Err(InputError::InvalidTsvRow {
                line: 1,
                reason: "empty count table".to_string(),
            });
        }
    };
    let header: Vec<String> = header.iter().map(|s| s.trim().to_string()).collect();

    let mut genes = Vec::new();
    let mut seen_genes: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();
    let mut cells: Option<Vec<String>> = None;

    for (idx, record) in records.enumerate() {
        let line = idx + 2;
        let record = record?;
        if record.is_empty() || (record.len() == 1 && record[0].trim().is_empty()) {
            continue;
        }

        // Tables written without a corner cell have one header field fewer
        // than each data row.
        let cell_ids = cells.get_or_insert_with(|| {
            if record.len() == header.len() + 1 {
                header.clone()
            } else {
                header.iter().skip(1).cloned().collect()
            }
        });
        if record.len() != cell_ids.len() + 1 {
            return Err(InputError::InvalidTsvRow {
                line,
                reason: format!(
                    "expected {} fields, found {}",
                    cell_ids.len() + 1,
                    record.len()
                ),
            });
        }

        let gene = record[0].trim().to_string();
        if gene.is_empty() {
            return Err(InputError::InvalidTsvRow {
                line,
                reason: "empty gene id".to_string(),
            });
        }
        if !seen_genes.insert(gene.clone()) {
            return Err(InputError::DuplicateGene(gene));
        }
        let gene_idx = genes.len() as u32;

        for (col, field) in record.iter().skip(1).enumerate() {
            let count = parse_count(field).ok_or_else(|| InputError::InvalidCount {
                gene: gene.clone(),
                cell: cell_ids[col].clone(),
                value: field.to_string(),
            })?;
            if count > 0 {
                entries.push((col as u32, gene_idx, count));
            }
        }
        genes.push(gene);
    }

    let cells = cells.unwrap_or_else(|| header.iter().skip(1).cloned().collect());
    if genes.is_empty() || cells.is_empty() {
        return Err(InputError::InvalidTsvRow {
            line: 1,
            reason: "count table has no genes or no cells".to_string(),
        });
    }
    ensure_unique_cells(&cells)?;

    Ok(DelimitedTable {
        genes,
        cells,
        entries,
    })
}

fn parse_count(field: &str) -> Option<u32> {
    let field = field.trim();
    if field.is_empty() {
        return Some(0);
    }
    if let Ok(v) = field.parse::<u32>() {
        return Some(v);
    }
    let v = field.parse::<f64>().ok()?;
    if v < 0.0 || v.fract().abs() > 1e-6 || v > u32::MAX as f64 {
        return None;
    }
    Some(v as u32)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/delimited.rs"]
mod tests;
