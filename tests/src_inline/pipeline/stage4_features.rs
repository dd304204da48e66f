use super::*;
use crate::expr::csc::CountMatrix;
use crate::model::dataset::Dataset;
use crate::model::thresholds::FilterThresholds;
use std::collections::BTreeSet;

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn as_set(v: &[String]) -> BTreeSet<String> {
    v.iter().cloned().collect()
}

fn filtered(label: &str, genes: &[&str], entries: Vec<(u32, u32, u32)>) -> FilteredDataset {
    let counts = CountMatrix::from_entries(genes.len(), 2, entries).expect("matrix");
    FilteredDataset {
        dataset: Dataset::new(
            label.to_string(),
            names(genes),
            vec!["c0".to_string(), "c1".to_string()],
            counts,
        ),
        thresholds: FilterThresholds::default(),
    }
}

#[test]
fn intersection_is_commutative_and_idempotent() {
    let a = names(&["CD3E", "MS4A1", "LYZ", "MT-CO1", "NKG7"]);
    let b = names(&["NKG7", "GNLY", "CD3E", "LYZ"]);
    let ab = intersect_genes(&a, &b);
    let ba = intersect_genes(&b, &a);
    assert_eq!(as_set(&ab), as_set(&ba));
    assert_eq!(ab, names(&["CD3E", "LYZ", "NKG7"]));
    assert_eq!(intersect_genes(&ab, &a), ab);
    assert_eq!(intersect_genes(&ab, &b), ab);
    assert_eq!(intersect_genes(&ab, &ab), ab);
}

#[test]
fn restricts_to_first_dataset_order_and_recomputes_qc() {
    let a = filtered(
        "a",
        &["MT-CO1", "CD3E", "ONLY_A"],
        vec![(0, 0, 5), (0, 1, 5), (0, 2, 90), (1, 1, 1)],
    );
    let b = filtered("b", &["CD3E", "MT-CO1"], vec![(0, 0, 2), (1, 1, 2)]);
    let (out, overlap) = run_stage4(vec![a, b], &QcSettings::default()).expect("stage4");

    assert_eq!(overlap.shared, 2);
    assert_eq!(overlap.union, 3);
    assert!((overlap.jaccard - 2.0 / 3.0).abs() < 1e-12);
    assert!((overlap.datasets[0].fraction_shared - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(overlap.datasets[1].fraction_shared, 1.0);

    assert_eq!(out[0].dataset.genes, names(&["MT-CO1", "CD3E"]));
    assert_eq!(out[1].dataset.genes, names(&["MT-CO1", "CD3E"]));
    // b's rows were reordered with its genes
    assert_eq!(out[1].dataset.counts.cell_rows(0), &[1]);

    let qc = out[0].dataset.qc.as_ref().expect("qc");
    assert_eq!(qc[0].n_counts, 10);
    assert!((qc[0].pct_mito - 50.0).abs() < 1e-6);
}

#[test]
fn disjoint_gene_sets_are_empty_result() {
    let a = filtered("a", &["G1"], vec![(0, 0, 1)]);
    let b = filtered("b", &["G2"], vec![(0, 0, 1)]);
    let err = run_stage4(vec![a, b], &QcSettings::default()).expect_err("disjoint");
    assert_eq!(err.kind(), ErrorKind::EmptyResult);
}
