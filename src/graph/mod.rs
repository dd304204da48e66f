pub mod knn;
pub mod louvain;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("need at least {needed} cells to cluster, found {found}")]
    TooFewCells { needed: usize, found: usize },
    #[error("embedding has {len} values, not a multiple of {dims} dims")]
    Shape { len: usize, dims: usize },
}
