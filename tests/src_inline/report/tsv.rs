use super::*;
use crate::model::qc::QcMetrics;
use crate::model::thresholds::FilterThresholds;
use crate::pipeline::stage3_filter::CellQcRecord;

#[test]
fn crosstab_has_total_row_and_column() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("composition.tsv");
    let tab = CrossTab {
        rows: vec!["0".to_string(), "1".to_string()],
        columns: vec!["a".to_string(), "b".to_string()],
        counts: vec![vec![3, 1], vec![0, 2]],
    };
    write_crosstab(&path, &tab, "cluster").expect("write");
    let text = std::fs::read_to_string(&path).expect("read");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec!["cluster\ta\tb\ttotal", "0\t3\t1\t4", "1\t0\t2\t2", "total\t3\t3\t6"]
    );
}

#[test]
fn qc_table_lists_every_cell_with_kept_flag() {
    let dir = tempfile::tempdir().expect("tempdir");
    let summary = FilterSummary {
        label: "pbmc".to_string(),
        thresholds: FilterThresholds::default(),
        cells_before: 2,
        cells_after: 1,
        cells: vec![
            CellQcRecord {
                cell: "AAAC".to_string(),
                qc: QcMetrics {
                    n_genes: 300,
                    n_counts: 1000,
                    pct_mito: 2.5,
                    pct_ribo: 10.0,
                },
                kept: true,
            },
            CellQcRecord {
                cell: "AAAG".to_string(),
                qc: QcMetrics::default(),
                kept: false,
            },
        ],
    };
    write_qc_tables(dir.path(), std::slice::from_ref(&summary)).expect("write");
    let text = std::fs::read_to_string(dir.path().join("qc/pbmc.tsv")).expect("read");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "cell\tn_genes\tn_counts\tpct_mito\tpct_ribo\tkept");
    assert_eq!(lines[1], "AAAC\t300\t1000\t2.500000\t10.000000\t1");
    assert_eq!(lines[2], "AAAG\t0\t0\t0.000000\t0.000000\t0");

    let path = dir.path().join("validate.tsv");
    write_filter_summary(&path, &[summary]).expect("write");
    let text = std::fs::read_to_string(&path).expect("read");
    assert_eq!(
        text.lines().nth(1),
        Some("pbmc\t200\t2500\t5.000000\t2\t1\t0.500000")
    );
}

#[test]
fn comparison_marks_failed_strategies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("comparison.tsv");
    let rows = vec![
        ComparisonRow {
            strategy: "anchor".to_string(),
            outcome: Ok(ComparisonStats {
                n_clusters: 4,
                modularity: 0.5,
                mean_mixing_entropy: 0.25,
            }),
        },
        ComparisonRow {
            strategy: "factorization".to_string(),
            outcome: Err("did not converge\nafter 3".to_string()),
        },
    ];
    write_comparison(&path, &rows).expect("write");
    let text = std::fs::read_to_string(&path).expect("read");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "anchor\tok\t4\t0.500000\t0.250000\t.");
    assert!(lines[2].starts_with("factorization\tfailed\t.\t.\t.\t"));
    assert!(lines[2].ends_with("did not converge after 3"));
}
