use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn reads_entries_column_major() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("matrix.mtx");
    fs::write(
        &path,
        "%%MatrixMarket matrix coordinate integer general\n% comment\n3 2 3\n1 1 4\n3 1 1\n2 2 7\n",
    )
    .expect("write file");

    let (header, mut entries) = read_entries(&path).expect("read entries");
    entries.sort();
    assert_eq!(header.n_rows, 3);
    assert_eq!(header.n_cols, 2);
    assert_eq!(header.nnz, 3);
    assert_eq!(entries, vec![(0, 0, 4), (0, 2, 1), (1, 1, 7)]);
}

#[test]
fn rejects_fractional_counts() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("matrix.mtx");
    fs::write(
        &path,
        "%%MatrixMarket matrix coordinate real general\n2 1 1\n1 1 0.5\n",
    )
    .expect("write file");

    assert!(read_entries(&path).is_err());
}
