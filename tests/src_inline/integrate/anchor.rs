use super::*;
use crate::expr::csc::CountMatrix;
use crate::expr::normalize::Normalization;
use crate::integrate::tests::{CELLS_PER_DATASET, GENES, synthetic_input, type_purity};
use crate::model::dataset::Dataset;
use crate::pipeline::{ErrorKind, StageFailure};
use crate::pipeline::stage5_normalize::NormalizedDataset;

fn strategy() -> AnchorIntegration {
    AnchorIntegration {
        params: AnchorParams::default(),
        seed: 42,
    }
}

#[test]
fn anchors_pair_cells_of_the_same_type() {
    let input = synthetic_input();
    let reference = input.normalized(0);
    let query = input.normalized(1);
    let set = strategy().find_anchors(&reference, &query, 5).expect("anchors");
    assert!(!set.anchors.is_empty());
    assert!(set.anchors.len() <= set.mutual);
    let matched = set
        .anchors
        .iter()
        .filter(|a| a.reference % 3 == a.query % 3)
        .count();
    assert!(matched as f64 / set.anchors.len() as f64 > 0.9);
    assert!(set.anchors.iter().all(|a| (0.0..=1.0).contains(&a.score)));
    assert_eq!(set.query_space.nrows(), CELLS_PER_DATASET);
}

#[test]
fn integration_keeps_every_cell_and_separates_types() {
    let input = synthetic_input();
    let rep = strategy().integrate(&input, 5).expect("integrated");
    assert_eq!(rep.strategy, StrategyKind::Anchor);
    assert_eq!(rep.n_cells(), 2 * CELLS_PER_DATASET);
    assert_eq!(rep.dims, 5);
    assert!(rep.coords.iter().all(|v| v.is_finite()));
    assert!(rep.diagnostics["anchors"] > 0.0);
    assert!(type_purity(&rep, 10) > 0.8);
}

#[test]
fn integration_is_deterministic() {
    let input = synthetic_input();
    let a = strategy().integrate(&input, 5).expect("first");
    let b = strategy().integrate(&input, 5).expect("second");
    assert_eq!(a.coords, b.coords);
}

#[test]
fn single_dataset_is_too_small() {
    let mut input = synthetic_input();
    input.datasets.truncate(1);
    let err = strategy().integrate(&input, 5).expect_err("one dataset");
    assert!(matches!(err, IntegrateError::TooSmall { what: "datasets", .. }));
}

/// Euclidean distance between the column means of two matrices.
fn mean_gap(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let axis = ndarray::Axis(0);
    let diff = a.mean_axis(axis).expect("rows") - b.mean_axis(axis).expect("rows");
    diff.dot(&diff).sqrt()
}

#[test]
fn correction_pulls_query_onto_reference() {
    let input = synthetic_input();
    let reference = input.normalized(0);
    let query = input.normalized(1);
    let s = strategy();
    let set = s.find_anchors(&reference, &query, 5).expect("anchors");
    let corrected = s.correct(&reference, &query, &set);
    assert_eq!(corrected.dim(), query.dim());
    let before = mean_gap(&reference, &query);
    let after = mean_gap(&reference, &corrected);
    assert!(after < before * 0.5, "gap {before} -> {after}");
}

/// Two datasets expressing disjoint halves of the gene space.
fn disjoint_input() -> IntegrationInput {
    let half = GENES as u32 / 2;
    let datasets = (0..2u32)
        .map(|d| {
            let mut entries = Vec::new();
            for c in 0..CELLS_PER_DATASET as u32 {
                for g in 0..half {
                    let mut v = 2 + (g * c + c * c) % 3;
                    if g % 3 == c % 3 {
                        v += 15;
                    }
                    entries.push((c, g + d * half, v));
                }
            }
            let counts =
                CountMatrix::from_entries(GENES, CELLS_PER_DATASET, entries).expect("matrix");
            let dataset = Dataset::new(
                format!("d{d}"),
                (0..GENES).map(|g| format!("G{g}")).collect(),
                (0..CELLS_PER_DATASET).map(|c| format!("c{c}")).collect(),
                counts,
            );
            NormalizedDataset::new(dataset, Normalization::log_normalize(10_000.0), GENES)
        })
        .collect();
    IntegrationInput {
        datasets,
        features: (0..GENES).collect(),
    }
}

#[test]
fn disjoint_datasets_have_no_anchors() {
    let input = disjoint_input();
    let s = AnchorIntegration {
        params: AnchorParams {
            k_filter: 1,
            ..AnchorParams::default()
        },
        seed: 42,
    };
    let set = s
        .find_anchors(&input.normalized(0), &input.normalized(1), 5)
        .expect("search");
    assert!(set.anchors.is_empty());
    assert_eq!(set.mutual, 0);

    let err = s.integrate(&input, 5).expect_err("no anchors");
    assert!(matches!(
        err,
        IntegrateError::NoAnchors { ref reference, ref query } if reference == "d0" && query == "d1"
    ));
    assert_eq!(err.kind(), ErrorKind::EmptyResult);
}
