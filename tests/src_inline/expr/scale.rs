use ndarray::{Array1, array};

use super::*;

#[test]
fn scaled_columns_have_zero_mean_unit_variance() {
    let mut m = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
    scale_columns(&mut m, None);
    assert_eq!(m.column(0), Array1::from(vec![-1.0, 0.0, 1.0]));
    assert_eq!(m.column(1), Array1::from(vec![0.0, 0.0, 0.0]));
}

#[test]
fn scale_clips_outliers() {
    let mut m = Array2::zeros((200, 1));
    m[[0, 0]] = 1000.0;
    scale_columns(&mut m, Some(DEFAULT_SCALE_CLIP));
    assert_eq!(m[[0, 0]], DEFAULT_SCALE_CLIP);
}

#[test]
fn rms_scaling_keeps_sign() {
    let mut m = array![[0.0, 2.0], [3.0, 0.0], [4.0, 0.0]];
    rms_scale_columns(&mut m);
    assert!(m.iter().all(|v| *v >= 0.0));
    let ss = m.column(0).dot(&m.column(0));
    assert!((ss / 2.0 - 1.0).abs() < 1e-12);
}

#[test]
fn densify_reads_selected_genes_only() {
    let counts = CountMatrix::from_entries(3, 2, vec![(0, 0, 1), (0, 2, 3), (1, 1, 4)])
        .expect("matrix");
    let stats = counts.cell_stats();
    let norm = Normalization {
        scale: 1.0,
        epsilon: 0.0,
        log1p: false,
    };
    let dense = densify_cells(&counts, &stats, &norm, &[2, 0]);
    assert_eq!(dense, array![[0.75, 0.25], [0.0, 0.0]]);
}
