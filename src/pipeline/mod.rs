pub mod stage1_load;
pub mod stage2_qc;
pub mod stage3_filter;
pub mod stage4_features;
pub mod stage5_normalize;
pub mod stage6_integrate;
pub mod stage7_cluster;
pub mod stage8_report;

use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, RunConfig};
use crate::graph::ClusterError;
use crate::integrate::{IntegrateError, IntegrationInput, StrategyKind, build_strategy};
use crate::pipeline::stage1_load::run_stage1;
use crate::pipeline::stage2_qc::run_stage2;
use crate::pipeline::stage3_filter::{FilterSummary, run_stage3};
use crate::pipeline::stage4_features::{GeneOverlap, run_stage4};
use crate::pipeline::stage5_normalize::run_stage5;
use crate::pipeline::stage6_integrate::run_stage6;
use crate::pipeline::stage7_cluster::run_stage7;
use crate::pipeline::stage8_report::{ReportInputs, RunSummary, run_stage8};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configure,
    Load,
    Qc,
    Filter,
    SharedFeatures,
    Normalize,
    Integrate,
    Cluster,
    Report,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Configure => "stage0_configure",
            Stage::Load => "stage1_load",
            Stage::Qc => "stage2_qc",
            Stage::Filter => "stage3_filter",
            Stage::SharedFeatures => "stage4_features",
            Stage::Normalize => "stage5_normalize",
            Stage::Integrate => "stage6_integrate",
            Stage::Cluster => "stage7_cluster",
            Stage::Report => "stage8_report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Load,
    Config,
    Convergence,
    EmptyResult,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Load => "load error",
            ErrorKind::Config => "config error",
            ErrorKind::Convergence => "convergence error",
            ErrorKind::EmptyResult => "empty result",
            ErrorKind::Io => "io error",
        })
    }
}

/// A stage failure classified into one of the run-level error kinds.
pub trait StageFailure: std::error::Error + Send + Sync + 'static {
    fn kind(&self) -> ErrorKind;
}

impl StageFailure for Infallible {
    fn kind(&self) -> ErrorKind {
        match *self {}
    }
}

impl StageFailure for ConfigError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Config,
        }
    }
}

impl StageFailure for IntegrateError {
    fn kind(&self) -> ErrorKind {
        match self {
            IntegrateError::Convergence { .. } => ErrorKind::Convergence,
            IntegrateError::Linalg(e) if e.is_shape() => ErrorKind::Config,
            // a decomposition that fails on well-shaped input means the
            // data carry no usable signal
            IntegrateError::Linalg(_) => ErrorKind::EmptyResult,
            IntegrateError::NoAnchors { .. } => ErrorKind::EmptyResult,
            IntegrateError::TooSmall { .. } => ErrorKind::Config,
        }
    }
}

impl StageFailure for ClusterError {
    fn kind(&self) -> ErrorKind {
        match self {
            ClusterError::TooFewCells { .. } => ErrorKind::EmptyResult,
            ClusterError::Shape { .. } => ErrorKind::Config,
        }
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed ({kind}): {source}")]
pub struct PipelineError {
    pub stage: Stage,
    pub kind: ErrorKind,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl PipelineError {
    pub fn new<E: StageFailure>(stage: Stage, err: E) -> Self {
        Self {
            stage,
            kind: err.kind(),
            source: Box::new(err),
        }
    }
}

/// Runs one stage with start/finish logging and tags any failure with the
/// stage.
pub fn timed<T, E: StageFailure>(
    stage: Stage,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, PipelineError> {
    let start = Instant::now();
    info!(stage = stage.as_str(), "starting stage");
    let out = f().map_err(|e| PipelineError::new(stage, e))?;
    info!(
        stage = stage.as_str(),
        elapsed_ms = start.elapsed().as_millis(),
        "finished stage"
    );
    Ok(out)
}

/// Output of stages 1 to 5, shared by every strategy.
#[derive(Debug)]
pub struct Prepared {
    pub input: IntegrationInput,
    pub filters: Vec<FilterSummary>,
    pub overlap: GeneOverlap,
}

pub fn prepare(config: &RunConfig) -> Result<Prepared, PipelineError> {
    timed(Stage::Configure, || config.validate())?;

    let datasets = timed(Stage::Load, || run_stage1(config))?;
    let datasets = timed(Stage::Qc, || {
        Ok::<_, Infallible>(run_stage2(datasets, &config.qc))
    })?;
    let filtered = timed(Stage::Filter, || run_stage3(datasets, &config.datasets))?;
    let filters = filtered.summaries;
    let (shared, overlap) = timed(Stage::SharedFeatures, || {
        run_stage4(filtered.datasets, &config.qc)
    })?;
    let input = timed(Stage::Normalize, || run_stage5(shared, &config.normalize))?;

    Ok(Prepared {
        input,
        filters,
        overlap,
    })
}

/// Stages 1 to 3 only, for checking inputs and thresholds before a full
/// run.
pub fn screen(config: &RunConfig) -> Result<Vec<FilterSummary>, PipelineError> {
    timed(Stage::Configure, || config.validate())?;
    let datasets = timed(Stage::Load, || run_stage1(config))?;
    let datasets = timed(Stage::Qc, || {
        Ok::<_, Infallible>(run_stage2(datasets, &config.qc))
    })?;
    let filtered = timed(Stage::Filter, || run_stage3(datasets, &config.datasets))?;
    Ok(filtered.summaries)
}

/// Stages 6 to 8 for one strategy over prepared data.
pub fn integrate_and_report(
    config: &RunConfig,
    kind: StrategyKind,
    prepared: &Prepared,
    out_dir: &Path,
) -> Result<RunSummary, PipelineError> {
    let strategy = build_strategy(kind, &config.integration);
    let representation = timed(Stage::Integrate, || {
        run_stage6(&prepared.input, strategy.as_ref(), config.integration.dims)
    })?;
    let clusters = timed(Stage::Cluster, || {
        run_stage7(&representation, &config.clustering)
    })?;
    timed(Stage::Report, || {
        run_stage8(
            ReportInputs {
                config,
                representation: &representation,
                clusters: &clusters,
                filters: &prepared.filters,
                overlap: &prepared.overlap,
                n_features: prepared.input.features.len(),
            },
            out_dir,
        )
    })
}

/// Full run for the configured strategy. The strategy name is checked
/// before any input is read.
pub fn run_pipeline(config: &RunConfig, out_dir: &Path) -> Result<RunSummary, PipelineError> {
    let kind = timed(Stage::Configure, || config.strategy())?;
    let prepared = prepare(config)?;
    integrate_and_report(config, kind, &prepared, out_dir)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/mod.rs"]
mod tests;
