use std::collections::HashMap;
use std::path::Path;

use kira_scio::api::{Reader, ReaderOptions};
use kira_scio::detect::DetectedFormat;

use crate::input::{InputError, open_reader};

/// Feature type assumed for `genes.tsv` files and two-column `features.tsv`.
pub const GENE_EXPRESSION: &str = "Gene Expression";

/// Gene symbols of a 10x features (or legacy genes) table, one per row.
pub fn read_features(path: &Path) -> Result<Vec<String>, InputError> {
    let md = Reader::with_options(
        path,
        ReaderOptions {
            force_format: Some(DetectedFormat::Mtx10x),
            strict: true,
        },
    )
    .read_metadata()
    .map_err(|e| InputError::InvalidTsvRow {
        line: 0,
        reason: e.message,
    })?;

    if md.gene_symbols.is_empty() {
        return Err(InputError::InvalidTsvRow {
            line: 0,
            reason: "no feature rows found".to_string(),
        });
    }
    Ok(md.gene_symbols)
}

/// Later duplicates get `.1`, `.2`, ... suffixes, skipping names already in
/// use, so that every row has a distinct name.
pub fn make_unique<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let names: Vec<&str> = names.collect();
    let mut taken: HashMap<String, usize> = HashMap::with_capacity(names.len());
    for name in &names {
        taken.entry((*name).to_string()).or_insert(0);
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let count = seen.entry(name).or_insert(0);
        if *count == 0 {
            out.push(name.to_string());
        } else {
            let mut suffix = *count;
            let mut candidate = format!("{name}.{suffix}");
            while taken.contains_key(&candidate) {
                suffix += 1;
                candidate = format!("{name}.{suffix}");
            }
            taken.insert(candidate.clone(), 0);
            out.push(candidate);
            *count = suffix;
        }
        *count += 1;
    }
    out
}

/// Third column of a 10x features table, one entry per row. Rows without it
/// (v2 `genes.tsv`) are gene expression.
pub fn read_feature_types(path: &Path, n_rows: usize) -> Result<Vec<String>, InputError> {
    let mut reader = open_reader(path)?;
    let mut types = Vec::with_capacity(n_rows);
    let mut line = String::new();
    let mut line_no = 0usize;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;
        let value = line.trim_end_matches(['\n', '\r']);
        if value.is_empty() {
            continue;
        }
        let kind = value
            .split('\t')
            .nth(2)
            .filter(|s| !s.is_empty())
            .unwrap_or(GENE_EXPRESSION);
        types.push(kind.to_string());
    }

    if types.len() != n_rows {
        return Err(InputError::InvalidTsvRow {
            line: line_no,
            reason: format!(
                "feature table has {} rows, matrix has {}",
                types.len(),
                n_rows
            ),
        });
    }
    Ok(types)
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/features.rs"]
mod tests;
