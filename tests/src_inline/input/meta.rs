use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn maps_labels_onto_barcodes() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("labels.tsv");
    fs::write(
        &path,
        "cell_id\tdonor\tcell_type\nc2\td1\tB cell\nc1\td1\tT cell\nc9\td2\tNK\nc1\td1\tMono\nc3\td1\t\n",
    )
    .expect("write");

    let barcodes = vec!["c1".to_string(), "c2".to_string(), "c3".to_string()];
    let (labels, stats) = read_cell_labels(&path, "cell_type", &barcodes).expect("labels");
    assert_eq!(
        labels,
        vec![Some("T cell".to_string()), Some("B cell".to_string()), None]
    );
    assert_eq!(stats.matched, 3);
    assert_eq!(stats.missing, 1);
    assert_eq!(stats.duplicate_rows, 1);
    assert_eq!(stats.label_counts.get("T cell"), Some(&1));
}

#[test]
fn missing_label_column_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("labels.tsv");
    fs::write(&path, "cell_id\tdonor\nc1\td1\n").expect("write");

    let err = read_cell_labels(&path, "cell_type", &["c1".to_string()]).unwrap_err();
    assert!(matches!(err, InputError::MissingMetaColumn(c) if c == "cell_type"));
}

#[test]
fn csv_label_tables_are_accepted() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("labels.csv");
    fs::write(&path, "cell_type,cell_id\nT,c2\n").expect("write");

    let barcodes = vec!["c1".to_string(), "c2".to_string()];
    let (labels, stats) = read_cell_labels(&path, "cell_type", &barcodes).expect("labels");
    assert_eq!(labels, vec![None, Some("T".to_string())]);
    assert_eq!(stats.matched, 1);
}
