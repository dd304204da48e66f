use super::*;

fn matrix_with_one_variable_gene() -> CountMatrix {
    // 30 genes; gene 7 alternates between 0 and 50, the rest are flat-ish
    let n_cells = 40u32;
    let mut entries = Vec::new();
    for c in 0..n_cells {
        for g in 0..30u32 {
            if g == 7 {
                if c % 2 == 0 {
                    entries.push((c, g, 50));
                }
            } else if g == 29 {
                // constant gene
                entries.push((c, g, 3));
            } else {
                entries.push((c, g, 2 + (c + g) % 2));
            }
        }
    }
    CountMatrix::from_entries(30, n_cells as usize, entries).expect("matrix")
}

#[test]
fn bimodal_gene_ranks_first() {
    let m = matrix_with_one_variable_gene();
    let vf = find_variable_features(&m, 5);
    assert_eq!(vf.ranked.len(), 5);
    assert_eq!(vf.ranked[0], 7);
    assert_eq!(vf.scores.len(), 30);
}

#[test]
fn constant_genes_are_never_selected() {
    let m = matrix_with_one_variable_gene();
    let vf = find_variable_features(&m, 100);
    assert!(!vf.ranked.contains(&29));
    assert_eq!(vf.ranked.len(), 29);
    assert_eq!(vf.scores[29], 0.0);
    let ranks = vf.rank_of();
    assert_eq!(ranks[7], Some(0));
    assert_eq!(ranks[29], None);
}

#[test]
fn too_few_cells_selects_nothing() {
    let m = CountMatrix::from_entries(2, 1, vec![(0, 0, 1)]).expect("matrix");
    assert!(find_variable_features(&m, 10).ranked.is_empty());
}
