use super::*;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Genes × cells TSV: three cell types with marker genes, two
/// mitochondrial genes and an optional shift on every fourth gene.
fn count_table(shift: u32, seed: u32) -> String {
    let n_cells = 60u32;
    let mut out = String::from("gene");
    for c in 0..n_cells {
        let _ = write!(out, "\tcell{c}");
    }
    out.push('\n');
    for g in 0..42u32 {
        let name = if g >= 40 { format!("MT-G{g}") } else { format!("G{g}") };
        out.push_str(&name);
        for c in 0..n_cells {
            let mut v = 2 + (g * c + seed + c * c) % 3;
            if g < 30 && g % 3 == c % 3 {
                v += 15;
            }
            if g % 4 == 0 {
                v += shift;
            }
            let _ = write!(out, "\t{v}");
        }
        out.push('\n');
    }
    out
}

fn labels_table() -> String {
    let mut out = String::from("cell_id\tcell_type\n");
    for c in 0..60 {
        let _ = writeln!(out, "cell{c}\ttype{}", c % 3);
    }
    out
}

fn write_run(dir: &Path, strategy: &str) -> PathBuf {
    std::fs::write(dir.join("a.tsv"), count_table(0, 0)).expect("a");
    std::fs::write(dir.join("b.tsv"), count_table(5, 13)).expect("b");
    std::fs::write(dir.join("labels.tsv"), labels_table()).expect("labels");
    let config = format!(
        r#"
[[dataset]]
label = "a"
path = "a.tsv"
cell_types = "labels.tsv"
[dataset.filter]
min_genes = 5
max_genes = 1000
max_mito_pct = 50.0

[[dataset]]
label = "b"
path = "b.tsv"
[dataset.filter]
min_genes = 5
max_genes = 1000
max_mito_pct = 50.0

[normalize]
n_variable_features = 30

[integration]
strategy = "{strategy}"
dims = 5

[integration.alignment]
max_iter = 100
epsilon = 0.05

[clustering]
n_neighbors = 10
"#
    );
    let path = dir.join("run.toml");
    std::fs::write(&path, config).expect("config");
    path
}

#[test]
fn unknown_strategy_fails_before_loading() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config: RunConfig = toml::from_str(
        r#"
[[dataset]]
label = "a"
path = "/does/not/exist/a.tsv"

[[dataset]]
label = "b"
path = "/does/not/exist/b.tsv"

[integration]
strategy = "harmony"
"#,
    )
    .expect("toml");
    let err = run_pipeline(&config, dir.path()).expect_err("unknown strategy");
    assert_eq!(err.stage, Stage::Configure);
    assert_eq!(err.kind, ErrorKind::Config);
    assert!(err.to_string().contains("harmony"));

    config.integration.strategy = "anchor".to_string();
    let err = run_pipeline(&config, dir.path()).expect_err("missing input");
    assert_eq!(err.stage, Stage::Load);
    assert_eq!(err.kind, ErrorKind::Load);
    assert!(std::fs::read_dir(dir.path()).expect("dir").next().is_none());
}

#[test]
fn full_run_writes_composition() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_run(dir.path(), "anchor");
    let config = crate::config::load_config(&path).expect("config");
    let out = dir.path().join("out");
    let summary = run_pipeline(&config, &out).expect("run");

    assert_eq!(summary.strategy, StrategyKind::Anchor);
    assert_eq!(summary.n_cells, 120);
    assert_eq!(summary.composition.total(), 120);
    assert_eq!(summary.composition.column_sums(), vec![60, 60]);
    assert_eq!(summary.composition.row_sums(), summary.clustering.sizes);
    assert_eq!(summary.gene_overlap.shared, 42);
    let ct = summary.cell_type_composition.as_ref().expect("labels");
    assert_eq!(ct.total(), 60);
    for name in ["composition.tsv", "embedding.tsv", "summary.json", "report.txt", "qc/a.tsv"] {
        assert!(out.join(name).is_file(), "{name}");
    }
}

#[test]
fn every_strategy_runs_on_shared_preparation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_run(dir.path(), "anchor");
    let config = crate::config::load_config(&path).expect("config");
    let prepared = prepare(&config).expect("prepared");
    assert_eq!(prepared.filters.len(), 2);
    assert!(prepared.filters.iter().all(|f| f.cells_after == 60));

    for kind in StrategyKind::ALL {
        let out = dir.path().join(kind.as_str());
        let summary = integrate_and_report(&config, kind, &prepared, &out)
            .unwrap_or_else(|e| panic!("{kind}: {e}"));
        assert_eq!(summary.strategy, kind);
        assert_eq!(summary.n_features, prepared.input.features.len());
        assert_eq!(summary.composition.total(), 120);
        assert!(summary.clustering.n_clusters >= 1);
    }
}

#[test]
fn screening_stops_after_filtering() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_run(dir.path(), "alignment");
    let config = crate::config::load_config(&path).expect("config");
    let summaries = screen(&config).expect("screen");
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].cells.len(), 60);
    assert!(summaries[1].cells.iter().all(|c| c.kept));
}

#[test]
fn integration_failures_map_to_error_kinds() {
    use crate::linalg::LinalgError;

    let shape = IntegrateError::Linalg(LinalgError::Dimension("3x2".to_string()));
    assert_eq!(shape.kind(), ErrorKind::Config);
    let degenerate = IntegrateError::Linalg(LinalgError::NoVectors);
    assert_eq!(degenerate.kind(), ErrorKind::EmptyResult);
    let no_anchors = IntegrateError::NoAnchors {
        reference: "a".to_string(),
        query: "b".to_string(),
    };
    assert_eq!(no_anchors.kind(), ErrorKind::EmptyResult);
    let stalled = IntegrateError::Convergence {
        strategy: StrategyKind::Alignment,
        iterations: 10,
        delta: 0.5,
    };
    assert_eq!(stalled.kind(), ErrorKind::Convergence);
}
