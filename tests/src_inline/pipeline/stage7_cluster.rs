use super::*;
use crate::integrate::StrategyKind;
use std::collections::BTreeMap;

fn representation(points: &[[f32; 2]]) -> IntegratedRepresentation {
    IntegratedRepresentation {
        strategy: StrategyKind::Alignment,
        dims: 2,
        coords: points.iter().flatten().copied().collect(),
        cell_ids: (0..points.len()).map(|i| format!("c{i}")).collect(),
        origin: (0..points.len()).map(|i| i % 2).collect(),
        origin_labels: vec!["a".to_string(), "b".to_string()],
        cell_types: vec![None; points.len()],
        diagnostics: BTreeMap::new(),
    }
}

fn three_blobs() -> Vec<[f32; 2]> {
    let centers = [[0.0f32, 0.0], [50.0, 0.0], [0.0, 50.0]];
    let mut pts = Vec::new();
    for c in centers {
        for i in 0..12 {
            let dx = (i % 4) as f32 * 0.3;
            let dy = (i / 4) as f32 * 0.3;
            pts.push([c[0] + dx, c[1] + dy]);
        }
    }
    pts
}

#[test]
fn finds_well_separated_groups() {
    let rep = representation(&three_blobs());
    for graph in [GraphKind::Snn, GraphKind::Knn] {
        let params = ClusteringParams {
            n_neighbors: 5,
            graph,
            ..ClusteringParams::default()
        };
        let result = run_stage7(&rep, &params).expect("clusters");
        assert_eq!(result.n_clusters, 3, "{graph:?}");
        for blob in 0..3 {
            let first = result.labels[blob * 12];
            assert!(result.labels[blob * 12..(blob + 1) * 12].iter().all(|&l| l == first));
        }
        assert_eq!(result.sizes(), vec![12, 12, 12]);
    }
}

#[test]
fn single_cell_cannot_be_clustered() {
    let rep = representation(&[[0.0, 0.0]]);
    let err = run_stage7(&rep, &ClusteringParams::default()).expect_err("too few");
    assert!(matches!(err, ClusterError::TooFewCells { found: 1, .. }));
}
