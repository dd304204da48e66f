use super::*;
use std::fs;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn reads_tab_table_with_corner_cell() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("counts.tsv");
    fs::write(&path, "gene\tc1\tc2\nG1\t0\t3\nG2\t5\t1.0\n").expect("write");

    let table = read_delimited_counts(&path).expect("table");
    assert_eq!(table.genes, vec!["G1", "G2"]);
    assert_eq!(table.cells, vec!["c1", "c2"]);
    assert_eq!(table.entries, vec![(1, 0, 3), (0, 1, 5), (1, 1, 1)]);
}

#[test]
fn reads_csv_without_corner_cell() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("counts.csv");
    fs::write(&path, "c1,c2\nG1,2,0\n").expect("write");

    let table = read_delimited_counts(&path).expect("table");
    assert_eq!(table.cells, vec!["c1", "c2"]);
    assert_eq!(table.entries, vec![(0, 0, 2)]);
}

#[test]
fn reads_gzipped_table() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("counts.txt.gz");
    let file = fs::File::create(&path).expect("create");
    let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    enc.write_all(b"gene\tc1\nG1\t4\n").expect("write");
    enc.finish().expect("finish");

    let table = read_delimited_counts(&path).expect("table");
    assert_eq!(table.entries, vec![(0, 0, 4)]);
}

#[test]
fn rejects_malformed_tables() {
    let dir = tempdir().expect("tempdir");

    let negative = dir.path().join("neg.tsv");
    fs::write(&negative, "gene\tc1\nG1\t-2\n").expect("write");
    assert!(matches!(
        read_delimited_counts(&negative),
        Err(InputError::InvalidCount { .. })
    ));

    let dup_gene = dir.path().join("dup_gene.tsv");
    fs::write(&dup_gene, "gene\tc1\nG1\t1\nG1\t2\n").expect("write");
    assert!(matches!(
        read_delimited_counts(&dup_gene),
        Err(InputError::DuplicateGene(g)) if g == "G1"
    ));

    let dup_cell = dir.path().join("dup_cell.tsv");
    fs::write(&dup_cell, "gene\tc1\tc1\nG1\t1\t2\n").expect("write");
    assert!(matches!(
        read_delimited_counts(&dup_cell),
        Err(InputError::DuplicateCell(c)) if c == "c1"
    ));

    let ragged = dir.path().join("ragged.tsv");
    fs::write(&ragged, "gene\tc1\tc2\nG1\t1\t2\nG2\t1\n").expect("write");
    assert!(matches!(
        read_delimited_counts(&ragged),
        Err(InputError::InvalidTsvRow { line: 3, .. })
    ));
}

#[test]
fn delimiter_from_extension() {
    assert_eq!(delimiter_for(Path::new("a.csv")), b',');
    assert_eq!(delimiter_for(Path::new("a.CSV.gz")), b',');
    assert_eq!(delimiter_for(Path::new("a.tsv")), b'\t');
    assert_eq!(delimiter_for(Path::new("a.txt.gz")), b'\t');
}
