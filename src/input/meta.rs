use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::input::delimited::delimiter_for;
use crate::input::{InputError, open_reader};

#[derive(Debug, Default, Clone)]
pub struct MetaStats {
    pub matched: usize,
    pub missing: usize,
    pub duplicate_rows: usize,
    pub label_counts: BTreeMap<String, usize>,
}

/// Reads a table with a `cell_id` column and a label column and maps the
/// labels onto `barcodes`. Cells absent from the table stay `None`; the
/// first row for a repeated cell wins.
pub fn read_cell_labels(
    path: &Path,
    label_column: &str,
    barcodes: &[String],
) -> Result<(Vec<Option<String>>, MetaStats), InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .flexible(true)
        .from_reader(open_reader(path)?);

    let header = reader.headers()?.clone();
    let column = |name: &str| {
        header
            .iter()
            .position(|c| c.trim() == name)
            .ok_or_else(|| InputError::MissingMetaColumn(name.to_string()))
    };
    let cell_idx = column("cell_id")?;
    let label_idx = column(label_column)?;

    let index_by_cell: HashMap<&str, usize> = barcodes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let mut labels = vec![None; barcodes.len()];
    let mut seen: HashSet<String> = HashSet::new();
    let mut stats = MetaStats::default();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        let cell_id = record.get(cell_idx).map(str::trim).unwrap_or_default();
        if cell_id.is_empty() {
            return Err(InputError::MissingMetaCellId(line));
        }
        if !seen.insert(cell_id.to_string()) {
            stats.duplicate_rows += 1;
            continue;
        }
        let Some(&idx) = index_by_cell.get(cell_id) else {
            stats.missing += 1;
            continue;
        };
        stats.matched += 1;
        if let Some(label) = record.get(label_idx).map(str::trim).filter(|l| !l.is_empty()) {
            labels[idx] = Some(label.to_string());
            *stats.label_counts.entry(label.to_string()).or_insert(0) += 1;
        }
    }

    Ok((labels, stats))
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/meta.rs"]
mod tests;
