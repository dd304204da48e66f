use super::*;
use crate::model::thresholds::FilterThresholds;
use crate::pipeline::stage4_features::DatasetOverlap;

fn config() -> RunConfig {
    toml::from_str(
        r#"
[[dataset]]
label = "a"
path = "a.tsv"

[[dataset]]
label = "b"
path = "b.tsv"
"#,
    )
    .expect("toml")
}

fn filter(label: &str, before: usize, after: usize) -> FilterSummary {
    FilterSummary {
        label: label.to_string(),
        thresholds: FilterThresholds::default(),
        cells_before: before,
        cells_after: after,
        cells: Vec::new(),
    }
}

fn overlap() -> GeneOverlap {
    GeneOverlap {
        shared: 900,
        union: 1000,
        jaccard: 0.9,
        datasets: vec![
            DatasetOverlap {
                label: "a".to_string(),
                genes: 950,
                fraction_shared: 900.0 / 950.0,
            },
            DatasetOverlap {
                label: "b".to_string(),
                genes: 950,
                fraction_shared: 900.0 / 950.0,
            },
        ],
    }
}

/// 80 cells from `a` and 90 from `b` spread over five clusters.
fn scenario() -> (IntegratedRepresentation, ClusterAssignment) {
    let n = 170;
    let origin: Vec<usize> = (0..n).map(|i| usize::from(i >= 80)).collect();
    let labels: Vec<usize> = (0..n).map(|i| i % 5).collect();
    let rep = IntegratedRepresentation {
        strategy: StrategyKind::Anchor,
        dims: 2,
        coords: (0..n * 2).map(|v| v as f32 * 0.01).collect(),
        cell_ids: (0..n).map(|i| format!("c{i}")).collect(),
        origin,
        origin_labels: vec!["a".to_string(), "b".to_string()],
        cell_types: (0..n)
            .map(|i| (i % 3 == 0).then(|| "T".to_string()))
            .collect(),
        diagnostics: BTreeMap::from([("anchors".to_string(), 42.0)]),
    };
    let clusters = ClusterAssignment {
        labels,
        n_clusters: 5,
        modularity: 0.4,
        levels: 2,
    };
    (rep, clusters)
}

#[test]
fn composition_table_covers_every_filtered_cell() {
    let cfg = config();
    let (rep, clusters) = scenario();
    let filters = vec![filter("a", 100, 80), filter("b", 120, 90)];
    let ov = overlap();
    let summary = summarize(&ReportInputs {
        config: &cfg,
        representation: &rep,
        clusters: &clusters,
        filters: &filters,
        overlap: &ov,
        n_features: 17,
    });

    let tab = &summary.composition;
    assert_eq!(tab.rows.len(), 5);
    assert_eq!(tab.columns, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(tab.total(), 170);
    assert_eq!(tab.column_sums(), vec![80, 90]);
    assert_eq!(tab.row_sums(), clusters.sizes());
    assert_eq!(summary.clustering.sizes.iter().sum::<usize>(), 170);
    assert_eq!(summary.n_cells, 170);
    assert_eq!(summary.n_features, 17);

    let ct = summary.cell_type_composition.as_ref().expect("cell types");
    assert_eq!(ct.total(), (0..170).filter(|i| i % 3 == 0).count());
    assert!(summary.mixing.mean > 0.9);
}

#[test]
fn writes_every_output_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config();
    let (rep, clusters) = scenario();
    let filters = vec![filter("a", 100, 80), filter("b", 120, 90)];
    let ov = overlap();
    let summary = run_stage8(
        ReportInputs {
            config: &cfg,
            representation: &rep,
            clusters: &clusters,
            filters: &filters,
            overlap: &ov,
            n_features: 17,
        },
        dir.path(),
    )
    .expect("report");

    for name in [
        "composition.tsv",
        "cell_type_composition.tsv",
        "embedding.tsv",
        "qc/a.tsv",
        "qc/b.tsv",
        "summary.json",
        "report.txt",
    ] {
        assert!(dir.path().join(name).is_file(), "{name}");
    }

    let embedding = std::fs::read_to_string(dir.path().join("embedding.tsv")).expect("read");
    assert_eq!(embedding.lines().count(), 171);
    assert!(embedding.starts_with("cell\torigin\tcluster\tcell_type\tdim_1\tdim_2\n"));

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("summary.json")).expect("read"),
    )
    .expect("json");
    assert_eq!(json["strategy"], "anchor");
    assert_eq!(json["clustering"]["n_clusters"], 5);
    assert_eq!(json["datasets"][1]["cells_after"], 90);
    assert_eq!(summary.diagnostics["anchors"], 42.0);

    let report = std::fs::read_to_string(dir.path().join("report.txt")).expect("read");
    assert!(report.contains("Clusters: 5"));
    assert!(report.contains("- b: 90 of 120 cells kept"));
    assert!(report.contains("Strategy: anchor (2 dims, 17 features)"));
}
