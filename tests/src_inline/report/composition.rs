use super::*;

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn marginals_match_cluster_sizes_and_dataset_sizes() {
    let clusters = [0, 0, 1, 2, 2, 2, 1, 0];
    let origin = [0, 1, 1, 0, 0, 1, 1, 1];
    let tab = CrossTab::by_origin(&clusters, 3, &origin, &labels(&["a", "b"]));
    assert_eq!(tab.counts, vec![vec![1, 2], vec![0, 2], vec![2, 1]]);
    assert_eq!(tab.row_sums(), vec![3, 2, 3]);
    assert_eq!(tab.column_sums(), vec![3, 5]);
    assert_eq!(tab.total(), 8);
    assert_eq!(tab.rows, labels(&["0", "1", "2"]));
}

#[test]
fn empty_dataset_still_gets_a_column() {
    let tab = CrossTab::by_origin(&[0, 0], 1, &[0, 0], &labels(&["a", "b"]));
    assert_eq!(tab.columns.len(), 2);
    assert_eq!(tab.column_sums(), vec![2, 0]);
}

#[test]
fn cell_type_table_counts_labelled_cells_only() {
    let types = vec![
        Some("T".to_string()),
        None,
        Some("B".to_string()),
        Some("T".to_string()),
    ];
    let tab = CrossTab::by_cell_type(&[0, 0, 1, 1], 2, &types).expect("labelled");
    assert_eq!(tab.columns, labels(&["B", "T"]));
    assert_eq!(tab.counts, vec![vec![0, 1], vec![1, 1]]);
    assert_eq!(tab.total(), 3);

    assert!(CrossTab::by_cell_type(&[0, 1], 2, &[None, None]).is_none());
}

#[test]
fn mixing_entropy_reweights_by_dataset_size() {
    // cluster 0 holds 10% of each dataset despite unequal sizes.
    let tab = CrossTab {
        rows: labels(&["0", "1"]),
        columns: labels(&["small", "large"]),
        counts: vec![vec![10, 100], vec![90, 900]],
    };
    let h = tab.mixing_entropy();
    assert!((h[0] - 1.0).abs() < 1e-12);
    assert!((h[1] - 1.0).abs() < 1e-12);

    let pure = CrossTab {
        rows: labels(&["0", "1"]),
        columns: labels(&["a", "b"]),
        counts: vec![vec![50, 0], vec![0, 30]],
    };
    assert_eq!(pure.mixing_entropy(), vec![0.0, 0.0]);
    assert_eq!(pure.mean_mixing_entropy(), 0.0);
}

#[test]
fn mean_entropy_is_weighted_by_cluster_size() {
    let tab = CrossTab {
        rows: labels(&["0", "1"]),
        columns: labels(&["a", "b"]),
        counts: vec![vec![10, 10], vec![30, 0]],
    };
    let h = tab.mixing_entropy();
    assert_eq!(h[1], 0.0);
    let expected = h[0] * 20.0 / 50.0;
    assert!((tab.mean_mixing_entropy() - expected).abs() < 1e-12);
}

#[test]
fn single_dataset_has_no_mixing() {
    let tab = CrossTab::by_origin(&[0, 1, 1], 2, &[0, 0, 0], &labels(&["only"]));
    assert_eq!(tab.mixing_entropy(), vec![0.0, 0.0]);
}
