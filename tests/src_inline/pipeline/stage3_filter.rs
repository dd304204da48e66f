use super::*;
use crate::expr::csc::CountMatrix;

/// Cell `c` detects `detected[c]` genes with one count each.
fn dataset_with_detected(label: &str, detected: &[u32]) -> Dataset {
    let n_genes = detected.iter().copied().max().unwrap_or(0) as usize + 1;
    let mut entries = Vec::new();
    for (c, &d) in detected.iter().enumerate() {
        for g in 0..d {
            entries.push((c as u32, g, 1));
        }
    }
    let counts = CountMatrix::from_entries(n_genes, detected.len(), entries).expect("matrix");
    let mut ds = Dataset::new(
        label.to_string(),
        (0..n_genes).map(|g| format!("G{g}")).collect(),
        (0..detected.len()).map(|c| format!("c{c}")).collect(),
        counts,
    );
    ds.qc = Some(
        detected
            .iter()
            .map(|&d| QcMetrics {
                n_genes: d,
                n_counts: d as u64,
                pct_mito: 0.0,
                pct_ribo: 0.0,
            })
            .collect(),
    );
    ds
}

#[test]
fn keeps_only_cells_strictly_inside_bounds() {
    let ds = dataset_with_detected("a", &[2, 3, 4, 5, 6]);
    let t = FilterThresholds {
        min_genes: 3,
        max_genes: 6,
        max_mito_pct: None,
    };
    let (filtered, summary) = filter_dataset(ds, t).expect("filter");
    assert_eq!(filtered.dataset.cells, vec!["c2", "c3"]);
    assert_eq!(summary.cells_before, 5);
    assert_eq!(summary.cells_after, 2);
    let kept: Vec<bool> = summary.cells.iter().map(|c| c.kept).collect();
    assert_eq!(kept, vec![false, false, true, true, false]);
    let qc = filtered.dataset.qc.as_ref().expect("qc");
    assert!(qc.iter().all(|m| 3 < m.n_genes && m.n_genes < 6));
}

#[test]
fn removing_every_cell_is_empty_result() {
    let ds = dataset_with_detected("tiny", &[1, 1]);
    let t = FilterThresholds {
        min_genes: 1,
        max_genes: 10,
        max_mito_pct: None,
    };
    let err = filter_dataset(ds, t).expect_err("empty");
    assert_eq!(err.kind(), ErrorKind::EmptyResult);
    assert!(err.to_string().contains("tiny"));
}

#[test]
fn thresholds_are_per_dataset() {
    let a = dataset_with_detected("a", &[5, 50]);
    let b = dataset_with_detected("b", &[5, 50]);
    let spec = |label: &str, min, max| DatasetSpec {
        label: label.to_string(),
        path: "x".into(),
        format: Default::default(),
        modality: None,
        cell_types: None,
        filter: FilterThresholds {
            min_genes: min,
            max_genes: max,
            max_mito_pct: None,
        },
    };
    let out = run_stage3(vec![a, b], &[spec("b", 10, 100), spec("a", 1, 10)]).expect("filter");
    assert_eq!(out.datasets[0].dataset.cells, vec!["c0"]);
    assert_eq!(out.datasets[1].dataset.cells, vec!["c1"]);
}
