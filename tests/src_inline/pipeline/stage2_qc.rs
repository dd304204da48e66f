use super::*;
use crate::expr::csc::CountMatrix;

fn dataset(genes: &[&str], entries: Vec<(u32, u32, u32)>, n_cells: usize) -> Dataset {
    let counts = CountMatrix::from_entries(genes.len(), n_cells, entries).expect("matrix");
    Dataset::new(
        "d".to_string(),
        genes.iter().map(|s| s.to_string()).collect(),
        (0..n_cells).map(|c| format!("c{c}")).collect(),
        counts,
    )
}

#[test]
fn configured_prefixes_drive_percentages() {
    let ds = dataset(&["mt-Nd1", "Rpl3", "Cd3e"], vec![(0, 0, 5), (0, 1, 5), (0, 2, 10)], 1);
    let settings = QcSettings {
        mito_prefixes: vec!["MT-".to_string()],
        ribo_prefixes: vec!["RPL".to_string()],
        case_insensitive: true,
    };
    let out = run_stage2(vec![ds], &settings);
    let qc = out[0].qc.as_ref().expect("qc");
    assert!((qc[0].pct_mito - 25.0).abs() < 1e-6);
    assert!((qc[0].pct_ribo - 25.0).abs() < 1e-6);
}

#[test]
fn default_prefixes_miss_mouse_names() {
    let ds = dataset(&["mt-Nd1", "Cd3e"], vec![(0, 0, 5), (0, 1, 5)], 1);
    let out = run_stage2(vec![ds], &QcSettings::default());
    let qc = out[0].qc.as_ref().expect("qc");
    assert_eq!(qc[0].pct_mito, 0.0);
}
