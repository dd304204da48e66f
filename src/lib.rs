pub mod cli;
pub mod config;
pub mod expr;
pub mod graph;
pub mod input;
pub mod integrate;
pub mod linalg;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod simd;

pub mod prelude {
    pub use crate::config::{RunConfig, load_config};
    pub use crate::integrate::{IntegrationStrategy, StrategyKind};
    pub use crate::model::embedding::IntegratedRepresentation;
    pub use crate::pipeline::{ErrorKind, PipelineError, Stage};
}
